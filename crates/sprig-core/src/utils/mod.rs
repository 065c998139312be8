//! Utility functions and helpers.
//!
//! Common functionality used across multiple sprig crates.

pub mod json;
pub mod path;

// Re-export commonly used utilities
pub use json::{flatten, to_pretty_json};
pub use path::{is_safe_path, module_path, normalize_path, safe_join};
