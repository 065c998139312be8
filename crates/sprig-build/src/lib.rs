//! Build inputs and publishing for sprig
//!
//! Everything here runs over a loaded [`sprig_resolver::Project`]:
//! - `assemble`: compile options for a downstream compiler
//! - `jres`: embedded resource declarations
//! - `localize`: translated strings
//! - `publish`: the publishable file set and compressed project archives

pub mod assemble;
pub mod jres;
pub mod localize;
pub mod options;
pub mod publish;

// Re-export main types
pub use assemble::BuildAssembler;
pub use jres::{merge_jres, JRes};
pub use localize::{localization_strings, package_localization_strings};
pub use options::{CompileOptions, EmbedMeta};
pub use publish::{compress_to_file, files_to_be_published, read_archive, ProjectArchive};

use sprig_core::error::SprigError;

/// Result type for build operations
pub type BuildResult<T> = Result<T, SprigError>;

/// Editor name recorded for block-based projects
pub const BLOCKS_PROJECT_NAME: &str = "blocksprj";

/// Editor name recorded for text-only projects
pub const JAVASCRIPT_PROJECT_NAME: &str = "tsprj";
