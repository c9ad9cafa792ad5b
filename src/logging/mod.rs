//! Crate diagnostics.
//!
//! Context and macros used when the crate logs about itself through the
//! `log` facade.

pub mod structured;

pub use structured::*;
pub(crate) use structured::{diag_debug, diag_warn};
