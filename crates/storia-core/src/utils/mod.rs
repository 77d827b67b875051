//! Utility functions for display formatting.

pub mod format;

pub use format::{format_date, format_location, single_line, truncate_string};
