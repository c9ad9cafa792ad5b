//! Physical write targets.
//!
//! Every logger writes its records into a [`Sink`]. The process-wide
//! default sink is the real standard output; there is exactly one of it no
//! matter how many loggers exist.

pub mod memory;
pub mod stdout;

use std::io;
use std::sync::Arc;

use lazy_static::lazy_static;

pub use memory::MemorySink;
pub use stdout::StdoutSink;

/// Completion callback for writes and flushes.
pub type WriteCallback = Box<dyn FnOnce(io::Result<()>) + Send + 'static>;

/// A destination for formatted record lines.
pub trait Sink: Send + Sync {
    /// Write `text` exactly as given, then report completion to `cb`.
    fn write(&self, text: &str, cb: Option<WriteCallback>);

    /// Drain writes issued so far, then invoke `cb`. Must be safe to call
    /// with nothing pending.
    fn flush(&self, cb: WriteCallback);
}

lazy_static! {
    static ref DEFAULT_SINK: Arc<dyn Sink> = Arc::new(StdoutSink::new());
}

/// The process-wide sink shared by every logger built without an explicit one.
pub fn default_sink() -> Arc<dyn Sink> {
    Arc::clone(&DEFAULT_SINK)
}

/// Write directly to the default sink, bypassing any logger.
pub fn write(text: &str, cb: Option<WriteCallback>) {
    DEFAULT_SINK.write(text, cb);
}

/// Flush the default sink.
pub fn flush(cb: WriteCallback) {
    DEFAULT_SINK.flush(cb);
}
