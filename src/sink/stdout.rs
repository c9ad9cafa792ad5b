//! Standard output sink.

use std::io::{self, Write};

use parking_lot::Mutex;

use super::{Sink, WriteCallback};

/// Writes records to the real process stdout.
///
/// This goes straight to [`std::io::stdout`], never through the capturable
/// [`crate::stream::stdout`] stream, so a captured stdout cannot loop back
/// into itself.
#[derive(Debug, Default)]
pub struct StdoutSink {
    // serializes write and flush so a flush observes every earlier write
    order: Mutex<()>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for StdoutSink {
    fn write(&self, text: &str, cb: Option<WriteCallback>) {
        let result = {
            let _order = self.order.lock();
            io::stdout().lock().write_all(text.as_bytes())
        };
        if let Err(e) = &result {
            log::debug!(target: crate::logging::INTERNAL_TARGET, "SINK_WRITE_FAILED error={}", e);
        }
        if let Some(cb) = cb {
            cb(result);
        }
    }

    fn flush(&self, cb: WriteCallback) {
        let result = {
            let _order = self.order.lock();
            io::stdout().lock().flush()
        };
        cb(result);
    }
}
