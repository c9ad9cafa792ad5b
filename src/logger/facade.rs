//! The JSON logger.
//!
//! Wraps a [`LeveledLogger`] whose last step is the record formatter and
//! whose writer is a [`Sink`], and redirects captured streams into it.

use std::fmt;
use std::sync::{Arc, Weak};

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::capture::{self, OnWrite};
use crate::logging::{diag_debug, CaptureContext};
use crate::record::{now_iso, RecordFormatter, UNSERIALIZABLE};
use crate::sink::{default_sink, Sink, WriteCallback};
use crate::stream::{OutputStream, StreamId};

use super::config::LoggerConfig;
use super::leveled::LeveledLogger;

/// `log` records from this crate are never turned into JSON records.
const SELF_TARGET: &str = "kubelog";

/// Structured JSON-line logger.
///
/// Cloning gives another handle to the same logger. Captures end when the
/// last handle is dropped, or earlier with [`Logger::close`].
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    base: LeveledLogger,
    formatter: RecordFormatter,
    sink: Arc<dyn Sink>,
    captured: Mutex<Vec<Arc<OutputStream>>>,
}

impl LoggerInner {
    fn untrack(&self, id: StreamId) {
        self.captured.lock().retain(|s| s.id() != id);
    }

    fn is_tracking(&self, id: StreamId) -> bool {
        self.captured.lock().iter().any(|s| s.id() == id)
    }
}

impl Drop for LoggerInner {
    fn drop(&mut self) {
        let streams = std::mem::take(self.captured.get_mut());
        for stream in streams {
            capture::restore(&stream);
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("type", &self.tag())
            .field("level", &self.loglevel())
            .field("filters", &self.filter_count())
            .field("captured", &self.captured_count())
            .finish()
    }
}

/// Convert a message to JSON, substituting the unserializable marker.
fn to_message<T: Serialize + ?Sized>(message: &T) -> Value {
    serde_json::to_value(message).unwrap_or_else(|e| {
        log::debug!(target: crate::logging::INTERNAL_TARGET, "RECORD_UNSERIALIZABLE error={}", e);
        Value::String(UNSERIALIZABLE.to_string())
    })
}

impl Logger {
    /// A logger writing to the process-wide default sink.
    #[must_use]
    pub fn new(level: LevelFilter, tag: &str) -> Self {
        Self::with_sink(level, tag, default_sink())
    }

    /// A logger writing to `sink`.
    #[must_use]
    pub fn with_sink(level: LevelFilter, tag: &str, sink: Arc<dyn Sink>) -> Self {
        let base = LeveledLogger::new(level);
        base.add_writer(Arc::clone(&sink));

        let formatter = RecordFormatter::new(tag);
        let terminal = formatter.clone();
        base.set_terminal(Arc::new(move |message: &Value, _level: Level| {
            terminal.format(&now_iso(), message)
        }));

        Self {
            inner: Arc::new(LoggerInner {
                base,
                formatter,
                sink,
                captured: Mutex::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::new(config.level, &config.tag)
    }

    /// The `type` written into every record.
    pub fn tag(&self) -> &str {
        self.inner.formatter.tag()
    }

    pub fn sink(&self) -> Arc<dyn Sink> {
        Arc::clone(&self.inner.sink)
    }

    pub fn loglevel(&self) -> LevelFilter {
        self.inner.base.loglevel()
    }

    pub fn set_loglevel(&self, level: LevelFilter) -> &Self {
        self.inner.base.set_loglevel(level);
        self
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        self.inner.base.is_enabled(level)
    }

    /// Add a message filter. Filters see the raw message and always run
    /// before the record formatter.
    pub fn add_filter<F>(&self, filter: F) -> &Self
    where
        F: Fn(Value, Level) -> Option<Value> + Send + Sync + 'static,
    {
        self.inner.base.add_filter(Arc::new(filter));
        self
    }

    /// Filters plus the record formatter.
    pub fn filter_count(&self) -> usize {
        self.inner.base.filter_count()
    }

    /// Log regardless of the level threshold.
    pub fn log<T: Serialize + ?Sized>(&self, message: &T) {
        self.inner.base.log(to_message(message));
    }

    pub fn log_at<T: Serialize + ?Sized>(&self, level: Level, message: &T) {
        if self.is_enabled(level) {
            self.inner.base.log_at(level, to_message(message));
        }
    }

    pub fn error<T: Serialize + ?Sized>(&self, message: &T) {
        self.log_at(Level::Error, message);
    }

    pub fn warn<T: Serialize + ?Sized>(&self, message: &T) {
        self.log_at(Level::Warn, message);
    }

    pub fn info<T: Serialize + ?Sized>(&self, message: &T) {
        self.log_at(Level::Info, message);
    }

    pub fn debug<T: Serialize + ?Sized>(&self, message: &T) {
        self.log_at(Level::Debug, message);
    }

    pub fn trace<T: Serialize + ?Sized>(&self, message: &T) {
        self.log_at(Level::Trace, message);
    }

    /// Flush the sink.
    pub fn flush(&self, cb: WriteCallback) {
        self.inner.base.flush(cb);
    }

    /// Redirect writes on `stream` into this logger.
    ///
    /// Each write becomes one record. A write that passes a completion
    /// callback gets it once the sink has flushed. Capturing an error stream
    /// also logs uncaught fatal errors. Another logger capturing the same
    /// stream later takes it over.
    ///
    /// The capture lasts only as long as the logger. Calling this on a
    /// temporary, as in `new_logger("info", "api")?.capture_writes(&stderr())`,
    /// restores the stream again at the end of the statement. Keep the
    /// logger bound to a variable for as long as the capture should run.
    pub fn capture_writes(&self, stream: &Arc<OutputStream>) -> &Self {
        let logger = Arc::downgrade(&self.inner);
        let sink = Arc::clone(&self.inner.sink);
        let on_write: OnWrite = Arc::new(move |text: String, cb: Option<WriteCallback>| {
            if let Some(logger) = logger.upgrade() {
                logger.base.log(Value::String(text));
            }
            if let Some(cb) = cb {
                sink.flush(cb);
            }
        });

        let shim = capture::capture_with_sink(stream, on_write, Arc::clone(&self.inner.sink));
        let owner: Weak<LoggerInner> = Arc::downgrade(&self.inner);
        shim.set_release_hook(Box::new(move |id| {
            if let Some(owner) = owner.upgrade() {
                owner.untrack(id);
            }
        }));

        {
            let mut captured = self.inner.captured.lock();
            if !captured.iter().any(|s| s.id() == stream.id()) {
                captured.push(Arc::clone(stream));
            }
        }

        diag_debug!(CaptureContext::new(stream).with_tag(self.tag()), "LOGGER_CAPTURE");
        self
    }

    /// Stop capturing `stream`. A no-op for streams this logger does not
    /// hold.
    pub fn restore_writes(&self, stream: &OutputStream) -> &Self {
        if self.inner.is_tracking(stream.id()) {
            capture::restore(stream);
            self.inner.untrack(stream.id());
            diag_debug!(CaptureContext::new(stream).with_tag(self.tag()), "LOGGER_RESTORE");
        }
        self
    }

    /// Streams this logger is capturing, in capture order.
    pub fn captured_streams(&self) -> Vec<Arc<OutputStream>> {
        self.inner.captured.lock().clone()
    }

    pub fn captured_count(&self) -> usize {
        self.inner.captured.lock().len()
    }

    pub fn is_capturing(&self, stream: &OutputStream) -> bool {
        self.inner.is_tracking(stream.id())
    }

    /// Restore every captured stream, flush, then call `cb`.
    pub fn close(&self, cb: WriteCallback) {
        let streams = std::mem::take(&mut *self.inner.captured.lock());
        for stream in &streams {
            capture::restore(stream);
        }
        self.flush(cb);
    }

    /// Make this logger the `log` crate backend, so `log::info!` and friends
    /// emit records.
    pub fn install(&self) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(self.clone()))?;
        log::set_max_level(self.loglevel());
        Ok(())
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        !metadata.target().starts_with(SELF_TARGET) && self.is_enabled(metadata.level())
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            self.inner
                .base
                .log_at(record.level(), Value::String(record.args().to_string()));
        }
    }

    fn flush(&self) {
        self.inner.base.flush(Box::new(|_| {}));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogRecord;
    use crate::sink::MemorySink;
    use crate::stream::StreamKind;
    use serde_json::json;

    fn memory_logger(tag: &str) -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::with_sink(LevelFilter::Info, tag, sink.clone());
        (logger, sink)
    }

    fn records(sink: &MemorySink) -> Vec<LogRecord> {
        sink.lines().iter().map(|l| LogRecord::parse(l).unwrap()).collect()
    }

    #[test]
    fn test_info_writes_one_record() {
        let (logger, sink) = memory_logger("svc");
        logger.info("hello");
        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(",\"type\":\"svc\",\"message\":\"hello\"}\n"));
        let record = LogRecord::parse(&lines[0]).unwrap();
        assert_eq!(record.time.len(), 24);
        assert_eq!(record.message, json!("hello"));
    }

    #[test]
    fn test_debug_below_threshold() {
        let (logger, sink) = memory_logger("svc");
        logger.debug("quiet");
        assert!(sink.is_empty());
        logger.set_loglevel(LevelFilter::Debug).debug("loud");
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_unserializable_message() {
        let (logger, sink) = memory_logger("svc");
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], 2);
        logger.info(&map);
        assert_eq!(records(&sink)[0].message, json!(UNSERIALIZABLE));
    }

    #[test]
    fn test_add_filter_keeps_formatter_last() {
        let (logger, sink) = memory_logger("filtered");
        logger.add_filter(|mut msg, _| {
            msg["filtered"] = json!(true);
            Some(msg)
        });
        assert_eq!(logger.filter_count(), 2);

        logger.info(&json!({"test": 12345}));
        let record = &records(&sink)[0];
        assert_eq!(record.tag, "filtered");
        assert_eq!(record.message["test"], json!(12345));
        assert_eq!(record.message["filtered"], json!(true));
    }

    #[test]
    fn test_capture_tracks_without_duplicates() {
        let (logger, sink) = memory_logger("STDOUT");
        let (stream, buffer) = OutputStream::buffered("out", StreamKind::Output);

        logger.capture_writes(&stream).capture_writes(&stream);
        assert_eq!(logger.captured_count(), 1);

        stream.write("Hello again", None).unwrap();
        assert_eq!(buffer.write_count(), 0);
        assert_eq!(records(&sink)[0].message, json!("Hello again"));

        logger.restore_writes(&stream);
        assert_eq!(logger.captured_count(), 0);
        assert!(!capture::is_captured(&stream));
    }

    #[test]
    fn test_write_callback_flushes_sink() {
        let (logger, sink) = memory_logger("svc");
        let (stream, _buffer) = OutputStream::buffered("out", StreamKind::Output);
        logger.capture_writes(&stream);

        let (tx, rx) = std::sync::mpsc::channel();
        stream
            .write("ping", Some(Box::new(move |res| tx.send(res.is_ok()).unwrap())))
            .unwrap();
        assert!(rx.recv().unwrap());
        assert_eq!(sink.flush_count(), 1);
        logger.restore_writes(&stream);
    }

    #[test]
    fn test_drop_restores_captures() {
        let (stream, buffer) = OutputStream::buffered("out", StreamKind::Output);
        {
            let (logger, _sink) = memory_logger("scoped");
            logger.capture_writes(&stream);
            assert!(capture::is_captured(&stream));
        }
        assert!(!capture::is_captured(&stream));
        stream.write("direct", None).unwrap();
        assert_eq!(buffer.contents(), "direct");
    }

    #[test]
    fn test_log_backend_skips_own_target() {
        let (logger, sink) = memory_logger("svc");
        let own = Metadata::builder().target("kubelog::internal").level(Level::Error).build();
        let other = Metadata::builder().target("app").level(Level::Error).build();
        assert!(!log::Log::enabled(&logger, &own));
        assert!(log::Log::enabled(&logger, &other));

        log::Log::log(
            &logger,
            &Record::builder()
                .args(format_args!("from {}", "app"))
                .level(Level::Warn)
                .target("app")
                .build(),
        );
        assert_eq!(records(&sink)[0].message, json!("from app"));
    }

    #[test]
    fn test_capture_lives_as_long_as_the_logger() {
        let (stream, _buffer) = OutputStream::buffered("out", StreamKind::Output);
        let sink = Arc::new(MemorySink::new());

        Logger::with_sink(LevelFilter::Info, "temp", sink.clone()).capture_writes(&stream);
        assert!(!capture::is_captured(&stream));

        let logger = Logger::with_sink(LevelFilter::Info, "bound", sink.clone());
        logger.capture_writes(&stream);
        assert!(capture::is_captured(&stream));
        logger.restore_writes(&stream);
    }
}
