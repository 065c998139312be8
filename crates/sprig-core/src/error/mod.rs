//! Error types and result aliases for sprig operations.
//!
//! Every fatal condition of a resolution session maps to one variant here.
//! Package conflicts are not errors; they are reported as data by the
//! resolver.

use thiserror::Error;

/// Unified error type for all sprig operations
#[derive(Error, Debug)]
pub enum SprigError {
    // Manifest errors
    #[error("Failed to parse manifest of {package}: {message}")]
    ManifestParse { package: String, message: String },

    #[error("Missing {field} in config of: {package}")]
    MissingField { package: String, field: String },

    #[error("Invalid package name: {name}")]
    InvalidPackageName { name: String },

    #[error("Package {package} requires target version {required} (you are running {running})")]
    TargetVersionTooOld {
        package: String,
        required: String,
        running: String,
    },

    // Resolution errors
    #[error("Package not installed: {package}, did you forget to run `sprig install`?")]
    PackageNotInstalled { package: String },

    #[error("version not specified for {package}")]
    UnspecifiedVersion { package: String },

    #[error("Version spec mismatch on {package} (requested {existing} and {requested})")]
    VersionSpecMismatch {
        package: String,
        existing: String,
        requested: String,
    },

    #[error("Package '{name}' not found")]
    PackageNotFound { name: String },

    #[error("Repository {repo} is not approved for this target")]
    RepositoryNotAllowed { repo: String },

    // Publishing and build errors
    #[error("Only packages with \"public\":true can be published")]
    NotPublic,

    #[error("referenced file missing: {file}")]
    MissingFile { file: String },

    #[error("please add '{file}' to \"files\" in {config}")]
    FileNotListed { file: String, config: String },

    // Configuration errors
    #[error("Invalid upgrade rule pattern '{pattern}': {source}")]
    InvalidRule {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Transport errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for sprig operations
pub type SprigResult<T> = Result<T, SprigError>;

impl SprigError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Create a JSON error from serde_json::Error
    pub fn json(message: String, source: serde_json::Error) -> Self {
        Self::Json { message, source }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SprigError::Network { .. } | SprigError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            SprigError::PackageNotInstalled { .. } => {
                Some("Run 'sprig install' to fetch the project's dependencies")
            },
            SprigError::UnspecifiedVersion { .. } => {
                Some("Pin the dependency to a version, repository tag or local path")
            },
            SprigError::VersionSpecMismatch { .. } => {
                Some("Make every package request the same version of the shared dependency")
            },
            SprigError::TargetVersionTooOld { .. } => {
                Some("Update the editor target or pick an older package version")
            },
            SprigError::RepositoryNotAllowed { .. } => {
                Some("Ask the target maintainers to approve the repository")
            },
            SprigError::NotPublic => Some("Set \"public\": true in the package manifest"),
            SprigError::Network { .. } => Some("Check your internet connection and try again"),
            _ => None,
        }
    }
}
