//! One-line JSON record formatting.
//!
//! The tag is JSON-encoded once per logger, so formatting a record only
//! encodes the message and concatenates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Substituted for any message that cannot be encoded as JSON.
pub const UNSERIALIZABLE: &str = "[unserializable object]";

/// Encode a message as JSON, falling back to the `"[unserializable object]"`
/// string literal instead of failing.
pub fn encode_message<T: Serialize + ?Sized>(message: &T) -> String {
    match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            log::debug!(target: crate::logging::INTERNAL_TARGET, "RECORD_UNSERIALIZABLE error={}", e);
            format!("\"{}\"", UNSERIALIZABLE)
        }
    }
}

/// Encode a tag as a quoted JSON string.
pub fn encode_tag(tag: &str) -> String {
    // a str always encodes; escape quotes by hand if it ever did not
    serde_json::to_string(tag).unwrap_or_else(|_| format!("\"{}\"", tag.replace('"', "\\\"")))
}

/// Build a newline-terminated `{time, type, message}` line.
///
/// `time` is written verbatim and should already be ISO-8601 text.
pub fn format_record<T: Serialize + ?Sized>(time: &str, tag: &str, message: &T) -> String {
    assemble(time, &encode_tag(tag), &encode_message(message))
}

fn assemble(time: &str, tag_json: &str, message_json: &str) -> String {
    let mut line = String::with_capacity(40 + time.len() + tag_json.len() + message_json.len());
    line.push_str("{\"time\":\"");
    line.push_str(time);
    line.push_str("\",\"type\":");
    line.push_str(tag_json);
    line.push_str(",\"message\":");
    line.push_str(message_json);
    line.push_str("}\n");
    line
}

/// Record formatter bound to one tag.
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    tag: String,
    tag_json: String,
}

impl RecordFormatter {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            tag_json: encode_tag(tag),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn format<T: Serialize + ?Sized>(&self, time: &str, message: &T) -> String {
        assemble(time, &self.tag_json, &encode_message(message))
    }
}

/// A parsed record line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub time: String,
    #[serde(rename = "type")]
    pub tag: String,
    pub message: Value,
}

impl LogRecord {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end_matches('\n'))
    }
}
