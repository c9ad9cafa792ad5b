//! Fatal (uncaught) error handling.
//!
//! - `error` - the fatal error value
//! - `observers` - the process-wide observer registry, dispatch and rethrow
//! - `coordinator` - the observer a captured error stream installs
//! - `panic` - turning panics into fatal errors

pub mod coordinator;
pub mod error;
pub mod observers;
pub mod panic;

pub use coordinator::*;
pub use error::*;
pub use observers::*;
pub use panic::*;
