//! Semantic versions for target compatibility checks.
//!
//! Packages may declare the minimum target (editor/toolchain) version they
//! need; the resolver compares it against the running target version.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version parsing errors
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Parse a version, tolerating a leading `v` and missing minor/patch
    /// components (`"v1.2"` is `1.2.0`).
    pub fn parse_lenient(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let core_end = trimmed.find(|c| c == '-' || c == '+').unwrap_or(trimmed.len());
        let (core, rest) = trimmed.split_at(core_end);
        let parts = core.split('.').count();
        if parts == 0 || parts > 3 || core.is_empty() {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let padded = match parts {
            1 => format!("{}.0.0{}", core, rest),
            2 => format!("{}.0{}", core, rest),
            _ => trimmed.to_string(),
        };
        Version::from_str(&padded)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Get the precedence for comparison (ignores build metadata)
    fn precedence_cmp(&self, other: &Self) -> Ordering {
        match (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch)) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            },
            other => other,
        }
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();

        // Split on '+' for build metadata
        let (version_part, build) = match input.split_once('+') {
            Some((v, b)) => (v, Some(b.to_string())),
            None => (input, None),
        };

        // Split on '-' for prerelease
        let (core_part, prerelease) = match version_part.split_once('-') {
            Some((c, p)) => (c, Some(p.to_string())),
            None => (version_part, None),
        };

        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let number = |component: &str| {
            component.parse::<u64>().map_err(|_| VersionError::InvalidNumber {
                component: component.to_string(),
            })
        };

        Ok(Version {
            major: number(parts[0])?,
            minor: number(parts[1])?,
            patch: number(parts[2])?,
            prerelease,
            build,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence_cmp(other)
    }
}

/// Compare two target version strings.
///
/// Both sides are parsed leniently; when either fails to parse the strings
/// are compared lexicographically.
pub fn compare_target_versions(a: &str, b: &str) -> Ordering {
    match (Version::parse_lenient(a), Version::parse_lenient(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn version_round_trip(
            major in 0u64..1000,
            minor in 0u64..1000,
            patch in 0u64..1000,
            prerelease in prop::option::of("[a-zA-Z0-9.]+"),
        ) {
            let original = Version { major, minor, patch, prerelease, build: None };
            let parsed = Version::from_str(&original.to_string()).unwrap();
            prop_assert_eq!(parsed, original);
        }

        #[test]
        fn target_comparison_is_antisymmetric(
            a in (0u64..20, 0u64..20, 0u64..20),
            b in (0u64..20, 0u64..20, 0u64..20),
        ) {
            let a = format!("{}.{}.{}", a.0, a.1, a.2);
            let b = format!("{}.{}.{}", b.0, b.1, b.2);
            prop_assert_eq!(
                compare_target_versions(&a, &b),
                compare_target_versions(&b, &a).reverse()
            );
        }
    }
}
