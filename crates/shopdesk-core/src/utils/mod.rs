//! Utility functions for table output.

pub mod format;

pub use format::{format_optional, pad, truncate_string};
