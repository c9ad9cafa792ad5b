//! Original (uncaptured) stream entry points.

use std::io::{self, Write};

use parking_lot::Mutex;

use crate::error::StreamError;
use crate::sink::WriteCallback;

use super::chunk::Chunk;
use super::output::StreamWrite;

/// Writes straight to the process stdout or stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioWriter {
    Stdout,
    Stderr,
}

impl StdioWriter {
    fn write_bytes(&self, bytes: &[u8]) -> io::Result<()> {
        match self {
            StdioWriter::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(bytes)?;
                out.flush()
            }
            StdioWriter::Stderr => io::stderr().lock().write_all(bytes),
        }
    }
}

impl StreamWrite for StdioWriter {
    fn write(&self, chunk: Chunk, cb: Option<WriteCallback>) -> Result<(), StreamError> {
        let bytes = chunk.into_bytes()?;
        let result = self.write_bytes(&bytes);
        match cb {
            Some(cb) => {
                cb(result);
                Ok(())
            }
            None => result.map_err(StreamError::from),
        }
    }
}

/// Collects everything written into memory.
#[derive(Debug, Default)]
pub struct BufferWriter {
    data: Mutex<Vec<u8>>,
    writes: Mutex<usize>,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.data.lock()).into_owned()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }

    pub fn clear(&self) {
        self.data.lock().clear();
        *self.writes.lock() = 0;
    }
}

impl StreamWrite for BufferWriter {
    fn write(&self, chunk: Chunk, cb: Option<WriteCallback>) -> Result<(), StreamError> {
        let bytes = chunk.into_bytes()?;
        self.data.lock().extend_from_slice(&bytes);
        *self.writes.lock() += 1;
        if let Some(cb) = cb {
            cb(Ok(()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_buffer_rejects_values() {
        let buffer = BufferWriter::new();
        let err = buffer.write(Chunk::from(json!([1, 2])), None).unwrap_err();
        assert!(err.is_invalid_chunk());
        assert_eq!(buffer.write_count(), 0);
    }

    #[test]
    fn test_buffer_clear() {
        let buffer = BufferWriter::new();
        buffer.write(Chunk::from("abc"), None).unwrap();
        buffer.clear();
        assert_eq!(buffer.contents(), "");
        assert_eq!(buffer.write_count(), 0);
    }

    #[test]
    fn test_stdio_writer_callback() {
        let (tx, rx) = std::sync::mpsc::channel();
        StdioWriter::Stderr
            .write(Chunk::from(""), Some(Box::new(move |res| tx.send(res.is_ok()).unwrap())))
            .unwrap();
        assert!(rx.recv().unwrap());
    }
}
