//! Package manifest types.
//!
//! A manifest is one JSON object per package. Unknown fields are preserved
//! so that rewriting a manifest never drops data the resolver does not model.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::spec::VersionSpec;
use super::version::compare_target_versions;
use crate::error::{SprigError, SprigResult};
use crate::utils::json::{flatten, to_pretty_json};

static PUBLIC_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z][a-z0-9\-_]+$").expect("package name pattern is valid")
});

/// Parsed package manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Dependency id -> version spec, in declaration order
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,

    #[serde(default)]
    pub files: Vec<String>,

    /// Files only included when this package is the root
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_files: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub public: bool,

    /// Marks a platform runtime package; at most one may be active
    #[serde(default, skip_serializing_if = "is_false")]
    pub core: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub binary_only: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_build: Option<NativeBuild>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_versions: Option<TargetVersions>,

    /// Version actually fetched for the current session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Settings consumed by the native toolchain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeBuild {
    /// Nested settings, flattened to dotted keys for conflict checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,

    /// The settings are only defaults and never conflict
    #[serde(default, skip_serializing_if = "is_false")]
    pub config_is_just_defaults: bool,

    /// Set on the root package to disable setting conflict checks
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_conflicts: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Target version constraints of a package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetVersions {
    /// Minimum target version required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Handle a host uses to address one package of a session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRef {
    pub id: String,
    /// Resolved version if known, otherwise the requested spec
    pub version: String,
    pub is_root: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl PackageConfig {
    /// Create a minimal manifest with no dependencies and no files
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            dependencies: IndexMap::new(),
            files: Vec::new(),
            test_files: Vec::new(),
            public: false,
            core: false,
            binary_only: false,
            native_build: None,
            target_versions: None,
            installed_version: None,
            extra: Map::new(),
        }
    }

    /// Parse manifest text of `package`, checking that the required fields
    /// are present and well-formed.
    pub fn parse(package: &str, src: &str) -> SprigResult<Self> {
        let value: Value = serde_json::from_str(src).map_err(|e| SprigError::ManifestParse {
            package: package.to_string(),
            message: e.to_string(),
        })?;

        let obj = value.as_object().ok_or_else(|| SprigError::ManifestParse {
            package: package.to_string(),
            message: "manifest is not a JSON object".to_string(),
        })?;

        if !obj.get("dependencies").map_or(false, Value::is_object) {
            return Err(SprigError::MissingField {
                package: package.to_string(),
                field: "dependencies".to_string(),
            });
        }
        if !obj.get("files").map_or(false, Value::is_array) {
            return Err(SprigError::MissingField {
                package: package.to_string(),
                field: "files".to_string(),
            });
        }
        match obj.get("name") {
            Some(Value::String(_)) => {},
            Some(other) => {
                return Err(SprigError::InvalidPackageName {
                    name: other.to_string(),
                })
            },
            None => {
                return Err(SprigError::InvalidPackageName {
                    name: String::new(),
                })
            },
        }

        serde_json::from_value(value).map_err(|e| SprigError::ManifestParse {
            package: package.to_string(),
            message: e.to_string(),
        })
    }

    /// Validate the manifest against the running target version
    pub fn validate(&self, running_target: &str) -> SprigResult<()> {
        if self.name.is_empty() || (self.public && !Self::is_valid_public_name(&self.name)) {
            return Err(SprigError::InvalidPackageName {
                name: self.name.clone(),
            });
        }

        if let Some(required) = self.required_target() {
            if compare_target_versions(required, running_target) == Ordering::Greater {
                return Err(SprigError::TargetVersionTooOld {
                    package: self.name.clone(),
                    required: required.to_string(),
                    running: running_target.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Check if `name` may be used by a public package
    pub fn is_valid_public_name(name: &str) -> bool {
        PUBLIC_NAME.is_match(name)
    }

    /// Minimum target version this package requires, if any
    pub fn required_target(&self) -> Option<&str> {
        self.target_versions
            .as_ref()
            .and_then(|t| t.target.as_deref())
            .filter(|t| !t.is_empty())
    }

    /// Native-build settings flattened to dotted keys, if declared
    pub fn flat_native_settings(&self) -> Option<IndexMap<String, Value>> {
        let config = self.native_build.as_ref()?.config.as_ref()?;
        Some(flatten(config))
    }

    pub fn native_settings_are_defaults(&self) -> bool {
        self.native_build
            .as_ref()
            .map_or(false, |n| n.config_is_just_defaults)
    }

    pub fn ignores_native_conflicts(&self) -> bool {
        self.native_build.as_ref().map_or(false, |n| n.ignore_conflicts)
    }

    /// Serialize with four-space indentation, the on-disk manifest layout
    pub fn to_json_pretty(&self) -> SprigResult<String> {
        to_pretty_json(self)
    }
}

impl PackageRef {
    pub fn new(id: impl Into<String>, version: impl Into<String>, is_root: bool) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            is_root,
        }
    }

    /// Parsed form of `version`
    pub fn spec(&self) -> VersionSpec {
        VersionSpec::parse(&self.version)
    }
}
