//! kubelog - structured JSON-line logging for containerized processes
//!
//! Every record is one line of JSON, `{"time":..,"type":..,"message":..}`,
//! ready for a cluster log collector. A [`Logger`] can also capture any
//! output stream, so plain writes to stdout or stderr (and uncaught fatal
//! errors reported on stderr) come out as records too, without the writer
//! knowing.
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `record` - the record line format
//! - `sink` - where record lines are physically written
//! - `stream` - capturable output streams, including the process stdio
//! - `capture` - installing and restoring stream captures
//! - `fatal` - uncaught error observers and the coordinator captures use
//! - `logger` - the leveled logger, the JSON facade and its configuration
//! - `logging` - diagnostics the crate emits about itself
//! - `error` - error types
//!
//! ```no_run
//! let logger = kubelog::new_logger("info", "api").unwrap();
//! logger.info("starting");
//! logger.capture_writes(&kubelog::stdout());
//! ```

pub mod capture;
pub mod error;
pub mod fatal;
pub mod logger;
pub mod logging;
pub mod record;
pub mod sink;
pub mod stream;

pub use error::{ConfigError, StreamError};
pub use logger::{Logger, LoggerConfig};
pub use record::{format_record, LogRecord};
pub use sink::{flush, write, Sink, WriteCallback};
pub use stream::{stderr, stdout, Chunk, OutputStream, StreamKind};

/// Build a logger writing to the default sink.
///
/// `level` is a level name (`error`, `warn`, `info`, `debug`, `trace` or
/// `off`, any case); an empty string means `info`.
pub fn new_logger(level: &str, tag: &str) -> Result<Logger, ConfigError> {
    let level = LoggerConfig::parse_level(level)?;
    Ok(Logger::new(level, tag))
}
