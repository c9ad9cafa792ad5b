//! Capturable output streams.
//!
//! A stream's writes all go through a single, swappable write entry point
//! ([`StreamWrite`]). Capturing a stream means replacing that entry point;
//! restoring means putting the original back.
//!
//! - `chunk` - the payloads a stream accepts
//! - `output` - the stream type and the process stdout/stderr streams
//! - `writers` - original entry points (real stdio, in-memory buffer)

pub mod chunk;
pub mod output;
pub mod writers;

pub use chunk::*;
pub use output::*;
pub use writers::*;
