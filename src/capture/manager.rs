//! Installing and removing captures.
//!
//! A stream is captured by at most one shim at a time. Capturing an
//! already-captured stream restores the old shim first, so the newest
//! capture always wins and shims never stack.

use std::sync::Arc;

use crate::fatal::FatalErrorCoordinator;
use crate::logging::{diag_debug, CaptureContext};
use crate::sink::{default_sink, Sink};
use crate::stream::OutputStream;

use super::shim::{CaptureShim, OnWrite};

/// Redirect every write on `stream` to `on_write`.
///
/// Capturing an error stream also installs a fatal-error observer that
/// writes uncaught errors through `on_write` and then flushes the default
/// sink. Use [`capture_with_sink`] when `on_write` feeds another sink.
pub fn capture(stream: &Arc<OutputStream>, on_write: OnWrite) -> Arc<CaptureShim> {
    capture_with_sink(stream, on_write, default_sink())
}

/// Like [`capture`], with `sink` as the sink that `on_write` writes to.
/// Fatal errors are decided once `sink` has been flushed.
pub fn capture_with_sink(
    stream: &Arc<OutputStream>,
    on_write: OnWrite,
    sink: Arc<dyn Sink>,
) -> Arc<CaptureShim> {
    let ctx = CaptureContext::new(stream);

    let current = stream.write_entry();
    if let Some(displaced) = current.as_capture() {
        diag_debug!(ctx, "CAPTURE_DISPLACED");
        displaced.restore();
    }

    let original = stream.write_entry();
    let shim = Arc::new_cyclic(|this| {
        CaptureShim::new(stream, original, Arc::clone(&on_write), this.clone())
    });

    if stream.is_error_stream() {
        shim.attach_coordinator(FatalErrorCoordinator::install(on_write, sink, ctx.clone()));
    }

    stream.set_write_entry(shim.clone());
    diag_debug!(ctx, "CAPTURE_INSTALLED", observes_fatal = shim.observes_fatal());
    shim
}

/// End the capture on `stream`, if there is one.
///
/// Entry points installed by anything other than [`capture`] are left
/// alone. Returns whether a capture was restored.
pub fn restore(stream: &OutputStream) -> bool {
    let current = stream.write_entry();
    match current.as_capture() {
        Some(shim) => shim.restore(),
        None => false,
    }
}

/// Whether `stream` is currently captured.
pub fn is_captured(stream: &OutputStream) -> bool {
    stream.write_entry().as_capture().is_some()
}

/// The capture currently installed on `stream`.
pub fn current_capture(stream: &OutputStream) -> Option<Arc<CaptureShim>> {
    stream.write_entry().as_capture().and_then(CaptureShim::handle)
}
