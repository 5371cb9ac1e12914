//! Recast Common Utilities
//!
//! Shared infrastructure for all Recast crates:
//! - Export error taxonomy and result aliases
//! - Tracing/logging initialization
//! - Configuration loading (engine, encoder defaults, filter tuning)

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
