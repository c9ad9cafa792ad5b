//! Stream write payloads.

use serde_json::Value;

use crate::error::StreamError;

/// A payload handed to a stream write.
///
/// Streams accept text and bytes. `Value` carries anything else a producer
/// might try to write (numbers, objects, ...); a capture rejects it.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Text(String),
    Bytes(Vec<u8>),
    Value(Value),
}

impl Chunk {
    /// Short name of the payload kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Chunk::Text(_) => "text",
            Chunk::Bytes(_) => "bytes",
            Chunk::Value(Value::String(_)) => "text",
            Chunk::Value(Value::Null) => "null",
            Chunk::Value(Value::Bool(_)) => "boolean",
            Chunk::Value(Value::Number(_)) => "number",
            Chunk::Value(Value::Array(_)) => "array",
            Chunk::Value(Value::Object(_)) => "object",
        }
    }

    /// Normalize the payload to text.
    ///
    /// Bytes are decoded as UTF-8 on their own. A multi-byte character split
    /// across two writes decodes to replacement characters; line-oriented
    /// console output never splits characters, so this is accepted.
    pub fn into_text(self) -> Result<String, StreamError> {
        match self {
            Chunk::Text(text) => Ok(text),
            Chunk::Bytes(bytes) => Ok(match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            }),
            Chunk::Value(Value::String(text)) => Ok(text),
            other => Err(StreamError::InvalidChunk { kind: other.kind() }),
        }
    }

    /// The raw bytes of a text or byte payload.
    pub fn into_bytes(self) -> Result<Vec<u8>, StreamError> {
        match self {
            Chunk::Bytes(bytes) => Ok(bytes),
            other => other.into_text().map(String::into_bytes),
        }
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Chunk::Text(text.to_string())
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Chunk::Text(text)
    }
}

impl From<&[u8]> for Chunk {
    fn from(bytes: &[u8]) -> Self {
        Chunk::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self {
        Chunk::Bytes(bytes)
    }
}

impl From<Value> for Chunk {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Chunk::Text(text),
            other => Chunk::Value(other),
        }
    }
}
