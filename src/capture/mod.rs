//! Stream write capture.
//!
//! Redirects the writes of any [`crate::stream::OutputStream`] into a
//! callback without the writer's cooperation:
//! - `shim` - the entry point installed on a captured stream
//! - `manager` - installing, displacing and restoring captures

pub mod manager;
pub mod shim;

pub use manager::*;
pub use shim::*;
