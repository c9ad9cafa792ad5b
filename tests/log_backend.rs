//! A logger installed as the `log` backend. Its own binary, since the
//! backend can be set once per process.

use std::sync::Arc;

use kubelog::sink::MemorySink;
use kubelog::{LogRecord, Logger};
use log::LevelFilter;
use serde_json::json;

#[test]
fn log_macros_emit_records() {
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::with_sink(LevelFilter::Info, "app", sink.clone());
    logger.install().unwrap();
    assert!(logger.install().is_err());

    log::info!("listening on {}", 8080);
    log::debug!("below the threshold");
    log::warn!(target: "kubelog::internal", "not turned into a record");
    log::error!(target: "worker", "job {} failed", 7);

    let records: Vec<LogRecord> = sink
        .lines()
        .iter()
        .map(|line| LogRecord::parse(line).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.tag == "app"));
    assert_eq!(records[0].message, json!("listening on 8080"));
    assert_eq!(records[1].message, json!("job 7 failed"));

    log::logger().flush();
    assert_eq!(sink.flush_count(), 1);
}
