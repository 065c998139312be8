//! Core data types for sprig package resolution.
//!
//! This module provides the fundamental types used throughout sprig:
//! - Package manifests and the handle hosts use to address a package
//! - Version specifiers with their protocols
//! - Target versions
//! - Upgrade rules

pub mod manifest;
pub mod spec;
pub mod upgrade;
pub mod version;

use indexmap::IndexMap;

// Re-export all public types
pub use manifest::{NativeBuild, PackageConfig, PackageRef, TargetVersions};
pub use spec::{is_file_ref, RepoRef, VersionSpec};
pub use upgrade::{RuleKind, UpgradeRule, UpgradeRules};
pub use version::{compare_target_versions, Version, VersionError};

/// File name -> file contents
pub type FileMap = IndexMap<String, String>;
