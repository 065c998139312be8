//! Configuration for the sprig package resolver
//!
//! This crate loads the target description (`target.json`) and the user
//! settings (`sprig.toml`), layers them with environment and command-line
//! overrides, and freezes the result into one immutable value that a
//! resolution session receives explicitly.

pub mod merge;
pub mod settings;
pub mod target;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, SessionConfig};
pub use settings::{PackagesSection, RemoteSection, UserSettings};
pub use target::{CompileTarget, PackagesConfig, TargetConfig, TargetVersionInfo};

use sprig_core::error::SprigError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, SprigError>;
