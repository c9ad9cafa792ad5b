//! Output streams with a swappable write entry point.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::capture::CaptureShim;
use crate::error::StreamError;
use crate::sink::WriteCallback;

use super::chunk::Chunk;
use super::writers::{BufferWriter, StdioWriter};

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique stream identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u64);

impl StreamId {
    fn next() -> Self {
        StreamId(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a stream carries. Capturing an `Error` stream also hooks fatal
/// error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Output,
    Error,
}

/// A stream's write entry point.
pub trait StreamWrite: Send + Sync {
    /// Accept one chunk. Invalid payloads are rejected synchronously.
    fn write(&self, chunk: Chunk, cb: Option<WriteCallback>) -> Result<(), StreamError>;

    /// `Some` only for entry points installed by [`crate::capture`].
    fn as_capture(&self) -> Option<&CaptureShim> {
        None
    }
}

/// Whether two entry points are the same object.
pub fn same_entry(a: &Arc<dyn StreamWrite>, b: &Arc<dyn StreamWrite>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// A writable stream.
pub struct OutputStream {
    id: StreamId,
    name: String,
    kind: StreamKind,
    entry: RwLock<Arc<dyn StreamWrite>>,
}

impl fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputStream")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("captured", &self.entry.read().as_capture().is_some())
            .finish()
    }
}

impl OutputStream {
    pub fn new(name: &str, kind: StreamKind, writer: Arc<dyn StreamWrite>) -> Arc<Self> {
        Arc::new(Self {
            id: StreamId::next(),
            name: name.to_string(),
            kind,
            entry: RwLock::new(writer),
        })
    }

    /// An in-memory stream, plus the buffer its original entry point fills.
    pub fn buffered(name: &str, kind: StreamKind) -> (Arc<Self>, Arc<BufferWriter>) {
        let buffer = Arc::new(BufferWriter::new());
        let stream = Self::new(name, kind, buffer.clone());
        (stream, buffer)
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn is_error_stream(&self) -> bool {
        self.kind == StreamKind::Error
    }

    /// Write through the current entry point.
    pub fn write(
        &self,
        chunk: impl Into<Chunk>,
        cb: Option<WriteCallback>,
    ) -> Result<(), StreamError> {
        let entry = self.write_entry();
        entry.write(chunk.into(), cb)
    }

    /// The entry point currently answering writes.
    pub fn write_entry(&self) -> Arc<dyn StreamWrite> {
        Arc::clone(&self.entry.read())
    }

    /// Replace the entry point, returning the previous one.
    pub fn set_write_entry(&self, entry: Arc<dyn StreamWrite>) -> Arc<dyn StreamWrite> {
        std::mem::replace(&mut *self.entry.write(), entry)
    }

    /// Put `original` back, but only while `shim` is still the entry point.
    pub(crate) fn reinstate_if_current(
        &self,
        shim: &CaptureShim,
        original: Arc<dyn StreamWrite>,
    ) -> bool {
        let mut entry = self.entry.write();
        let current = entry.as_capture().map_or(false, |s| std::ptr::eq(s, shim));
        if current {
            *entry = original;
        }
        current
    }
}

/// `write!`/`writeln!` support. A formatted write is delivered as a single
/// chunk so one `writeln!` produces one captured message.
impl io::Write for &OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        OutputStream::write(self, buf, None)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        OutputStream::write(self, fmt::format(args), None)?;
        Ok(())
    }
}

lazy_static! {
    static ref STDOUT: Arc<OutputStream> =
        OutputStream::new("stdout", StreamKind::Output, Arc::new(StdioWriter::Stdout));
    static ref STDERR: Arc<OutputStream> =
        OutputStream::new("stderr", StreamKind::Error, Arc::new(StdioWriter::Stderr));
}

/// The process standard-output stream.
pub fn stdout() -> Arc<OutputStream> {
    Arc::clone(&STDOUT)
}

/// The process standard-error stream, the error-reporting stream.
pub fn stderr() -> Arc<OutputStream> {
    Arc::clone(&STDERR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct Noop;

    impl StreamWrite for Noop {
        fn write(&self, _chunk: Chunk, _cb: Option<WriteCallback>) -> Result<(), StreamError> {
            Ok(())
        }
    }

    #[test]
    fn test_buffered_stream_writes() {
        let (stream, buffer) = OutputStream::buffered("buf", StreamKind::Output);
        stream.write("hello ", None).unwrap();
        stream.write(&b"world"[..], None).unwrap();
        assert_eq!(buffer.contents(), "hello world");
        assert_eq!(buffer.write_count(), 2);
    }

    #[test]
    fn test_writeln_is_one_chunk() {
        let (stream, buffer) = OutputStream::buffered("buf", StreamKind::Output);
        writeln!(&*stream, "{} + {} = {}", 1, 2, 3).unwrap();
        assert_eq!(buffer.write_count(), 1);
        assert_eq!(buffer.contents(), "1 + 2 = 3\n");
    }

    #[test]
    fn test_set_write_entry_returns_previous() {
        let (stream, _buffer) = OutputStream::buffered("buf", StreamKind::Output);
        let before = stream.write_entry();
        let noop: Arc<dyn StreamWrite> = Arc::new(Noop);
        let previous = stream.set_write_entry(Arc::clone(&noop));
        assert!(same_entry(&before, &previous));
        assert!(same_entry(&stream.write_entry(), &noop));
    }

    #[test]
    fn test_ids_are_unique() {
        let (a, _) = OutputStream::buffered("a", StreamKind::Output);
        let (b, _) = OutputStream::buffered("b", StreamKind::Output);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_process_streams() {
        assert_eq!(stdout().kind(), StreamKind::Output);
        assert!(stderr().is_error_stream());
        assert!(Arc::ptr_eq(&stdout(), &stdout()));
    }
}
