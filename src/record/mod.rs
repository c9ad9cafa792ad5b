//! Record envelope.
//!
//! Every emitted line has the shape `{"time":..,"type":..,"message":..}`:
//! - `format` - the pure line builder
//! - `timestamp` - ISO-8601 time strings for the `time` field

pub mod format;
pub mod timestamp;

pub use format::*;
pub use timestamp::*;
