//! # sprig-core
//!
//! Core types and utilities shared across all sprig crates.
//!
//! This crate provides:
//! - `PackageConfig`, the parsed package manifest
//! - `VersionSpec` for protocol-prefixed version references
//! - `Version` for comparing target versions
//! - `UpgradeRules` for rewriting package references and source text
//! - `SprigError` enum for unified error handling
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (manifest, version specs, upgrade rules)
//! - `error`: Error types and result aliases
//! - `utils`: JSON and path helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{SprigError, SprigResult};
pub use types::{
    FileMap, NativeBuild, PackageConfig, PackageRef, RepoRef, RuleKind, TargetVersions,
    UpgradeRule, UpgradeRules, Version, VersionSpec,
};

/// File name of the package manifest
pub const CONFIG_NAME: &str = "sprig.json";

/// Id of the root package of every resolution session
pub const ROOT_ID: &str = "this";

/// Directory (relative to the project) that holds installed dependencies
pub const MODULES_DIR: &str = "sprig_modules";
