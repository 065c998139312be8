//! Host contract and package sources for sprig
//!
//! The resolver never touches the network or the disk itself. It talks to a
//! [`Host`], which reads and writes package files and stages downloads.
//! Downloads are dispatched on the version protocol by [`PackageSources`],
//! which reaches remote repositories through [`RepoClient`].

pub mod api;
pub mod cache;
pub mod client;
pub mod fs;
pub mod host;
pub mod memory;
pub mod sources;

// Re-export main types
pub use api::{ExtensionInfo, HexInfo, RepoInfo};
pub use cache::{CacheEntry, CacheStats, ManifestCache};
pub use client::{AuthConfig, Endpoints, RepoClient, RetryConfig};
pub use fs::FsHost;
pub use host::Host;
pub use memory::{MemoryHost, WriteRecord};
pub use sources::PackageSources;

use sprig_core::error::SprigError;

/// Result type for host operations
pub type HostResult<T> = Result<T, SprigError>;
