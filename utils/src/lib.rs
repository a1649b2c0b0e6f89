//! Shared utilities for soldash.

pub mod format;
pub mod logging;

pub use format::{abbreviate, abbreviate_address};
pub use logging::{init_logging, LogFormat};
