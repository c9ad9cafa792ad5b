//! In-memory sink.

use parking_lot::Mutex;

use super::{Sink, WriteCallback};

/// Keeps every written line in memory. Callbacks complete immediately.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
    flushes: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, in submission order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn flush_count(&self) -> usize {
        *self.flushes.lock()
    }

    /// Remove and return everything written so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

impl Sink for MemorySink {
    fn write(&self, text: &str, cb: Option<WriteCallback>) {
        self.lines.lock().push(text.to_string());
        if let Some(cb) = cb {
            cb(Ok(()));
        }
    }

    fn flush(&self, cb: WriteCallback) {
        *self.flushes.lock() += 1;
        cb(Ok(()));
    }
}
