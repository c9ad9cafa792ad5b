//! Error types.
//!
//! Serialization failures never show up here: they are recovered inside the
//! record formatter. Misuse such as restoring a stream that was never
//! captured is a no-op rather than an error.

use std::io;

use thiserror::Error;

/// Errors returned synchronously from a stream write.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The payload was neither text nor bytes. Nothing was forwarded.
    #[error("invalid data, chunk must be text or bytes (got {kind})")]
    InvalidChunk { kind: &'static str },

    /// The underlying channel refused the write.
    #[error("stream write failed: {0}")]
    Io(#[from] io::Error),
}

impl StreamError {
    pub fn is_invalid_chunk(&self) -> bool {
        matches!(self, StreamError::InvalidChunk { .. })
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidInput, other),
        }
    }
}

/// Errors building a logger from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level {0:?} (expected off, error, warn, info, debug or trace)")]
    InvalidLevel(String),

    #[error("invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_chunk_message() {
        let err = StreamError::InvalidChunk { kind: "number" };
        let text = err.to_string();
        assert!(text.to_lowercase().contains("invalid data"));
        assert!(text.contains("number"));
        assert!(err.is_invalid_chunk());
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let err: io::Error = StreamError::InvalidChunk { kind: "object" }.into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let inner = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        let err: io::Error = StreamError::Io(inner).into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
