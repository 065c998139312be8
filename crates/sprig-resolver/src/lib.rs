//! Package graph resolution for sprig
//!
//! This crate expands a root manifest into a deduplicated graph of packages,
//! detects setting and version conflicts, and orders the graph for building.
//! All file and network access goes through a [`sprig_host::Host`].

pub mod conflict;
pub mod graph;
pub mod project;
pub mod version;

// Re-export main types
pub use conflict::{Candidate, Conflict, ConflictKind};
pub use graph::{DependencyEntry, PackageGraph, PackageNode};
pub use project::Project;
pub use version::VersionResolver;

use sprig_core::error::SprigError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, SprigError>;
