//! Record timestamps.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC time as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_iso(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The current time, formatted for the `time` field.
pub fn now_iso() -> String {
    format_iso(&Utc::now())
}
