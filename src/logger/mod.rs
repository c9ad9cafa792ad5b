//! Loggers.
//!
//! - `leveled` - level threshold, filter chain and writers
//! - `facade` - the JSON [`Logger`] built on top of it
//! - `config` - level and tag settings, from code or the environment

pub mod config;
pub mod facade;
pub mod leveled;

pub use config::*;
pub use facade::*;
pub use leveled::*;
