//! Shared helpers for the integration tests.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use kubelog::sink::MemorySink;
use kubelog::{LogRecord, Logger, WriteCallback};
use lazy_static::lazy_static;
use log::LevelFilter;
use parking_lot::{Mutex, MutexGuard};

lazy_static! {
    static ref SERIAL: Mutex<()> = Mutex::new(());
}

/// Serializes tests that touch process-wide state (observers, stdio).
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock()
}

/// Crate diagnostics to the test output, `RUST_LOG=kubelog=debug` to see them.
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .format_timestamp_millis()
        .try_init();
}

/// A logger writing into a fresh in-memory sink.
pub fn memory_logger(level: LevelFilter, tag: &str) -> (Logger, Arc<MemorySink>) {
    init_logging();
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::with_sink(level, tag, sink.clone());
    (logger, sink)
}

/// Every line the sink received, parsed.
pub fn records(sink: &MemorySink) -> Vec<LogRecord> {
    sink.lines()
        .iter()
        .map(|line| LogRecord::parse(line).expect("record line"))
        .collect()
}

/// A completion callback and the receiver that observes it.
#[allow(dead_code)]
pub fn completion() -> (WriteCallback, mpsc::Receiver<bool>) {
    let (tx, rx) = mpsc::channel();
    let cb: WriteCallback = Box::new(move |res| {
        let _ = tx.send(res.is_ok());
    });
    (cb, rx)
}

#[allow(dead_code)]
pub fn wait(rx: &mpsc::Receiver<bool>) -> bool {
    rx.recv_timeout(Duration::from_secs(5)).expect("callback never ran")
}
