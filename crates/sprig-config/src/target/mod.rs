//! Target description parsing
//!
//! The target describes the editor/toolchain a project is built for: its
//! version, compile settings, upgrade rules, the packages bundled with it and
//! the repositories it trusts.

use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sprig_core::error::SprigError;
use sprig_core::types::{FileMap, PackageConfig, UpgradeRule, UpgradeRules};
use sprig_core::CONFIG_NAME;

use crate::ConfigResult;

/// Complete target description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    /// Target identifier (required)
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub versions: TargetVersionInfo,

    #[serde(default)]
    pub compile: CompileTarget,

    /// Package id -> files, shipped with the target
    #[serde(default)]
    pub bundled_packages: IndexMap<String, FileMap>,

    /// Script id -> files, addressable through `embed:`
    #[serde(default)]
    pub embedded_scripts: IndexMap<String, FileMap>,

    /// Remote repository allow-list
    #[serde(default)]
    pub packages: PackagesConfig,

    /// Root projects must pick exactly one core package
    #[serde(default)]
    pub dynamic_board_definition: bool,

    #[serde(default = "default_cloud_id")]
    pub cloud_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
}

/// Versions of the running target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetVersionInfo {
    #[serde(default = "default_target_version")]
    pub target: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Compiler settings of the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileTarget {
    #[serde(default)]
    pub is_native: bool,

    #[serde(default)]
    pub short_pointers: bool,

    #[serde(default)]
    pub upgrades: Vec<UpgradeRule>,

    /// File endings handed to the compiler as sources
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Root source scanned for implied packages
    #[serde(default = "default_main_file")]
    pub main_file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_editor: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which remote repositories may be installed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagesConfig {
    /// `owner/repo` names; empty means any repository not banned
    #[serde(default)]
    pub approved_repos: Vec<String>,

    #[serde(default)]
    pub banned_repos: Vec<String>,
}

fn default_cloud_id() -> String {
    "sprig/".to_string()
}

fn default_target_version() -> String {
    "0.0.0".to_string()
}

fn default_source_extensions() -> Vec<String> {
    vec![".ts".to_string(), ".asm".to_string()]
}

fn default_main_file() -> String {
    "main.ts".to_string()
}

impl Default for TargetVersionInfo {
    fn default() -> Self {
        Self {
            target: default_target_version(),
            extra: Map::new(),
        }
    }
}

impl Default for CompileTarget {
    fn default() -> Self {
        Self {
            is_native: false,
            short_pointers: false,
            upgrades: Vec::new(),
            source_extensions: default_source_extensions(),
            main_file: default_main_file(),
            preferred_editor: None,
            extra: Map::new(),
        }
    }
}

impl TargetConfig {
    /// Create an empty target with the given id and version
    pub fn new(id: impl Into<String>, target_version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            versions: TargetVersionInfo {
                target: target_version.into(),
                extra: Map::new(),
            },
            compile: CompileTarget::default(),
            bundled_packages: IndexMap::new(),
            embedded_scripts: IndexMap::new(),
            packages: PackagesConfig::default(),
            dynamic_board_definition: false,
            cloud_id: default_cloud_id(),
            embed_url: None,
        }
    }

    /// Running target version
    pub fn target_version(&self) -> &str {
        &self.versions.target
    }

    /// Files of a package installable without a version: bundled packages
    /// first, then embedded scripts
    pub fn embedded_script(&self, id: &str) -> Option<&FileMap> {
        self.bundled_packages
            .get(id)
            .or_else(|| self.embedded_scripts.get(id))
    }

    /// Parsed manifest of a bundled package
    pub fn bundled_config(&self, id: &str) -> ConfigResult<Option<PackageConfig>> {
        let Some(files) = self.bundled_packages.get(id) else {
            return Ok(None);
        };
        let Some(text) = files.get(CONFIG_NAME) else {
            return Ok(None);
        };
        PackageConfig::parse(id, text).map(Some)
    }

    /// Bundled manifests flagged `core`, in declaration order. Bundled
    /// packages with unreadable manifests are skipped.
    pub fn core_packages(&self) -> Vec<PackageConfig> {
        self.bundled_packages
            .keys()
            .filter_map(|id| self.bundled_config(id).ok().flatten())
            .filter(|cfg| cfg.core)
            .collect()
    }

    /// Whether `id` names a bundled package flagged `core`
    pub fn is_core_package(&self, id: &str) -> bool {
        matches!(self.bundled_config(id), Ok(Some(cfg)) if cfg.core)
    }

    /// Compile the upgrade rule table
    pub fn upgrade_rules(&self) -> ConfigResult<UpgradeRules> {
        UpgradeRules::compile(&self.compile.upgrades)
    }

    /// Check a remote repository against the allow-list
    pub fn is_repo_allowed(&self, full_name: &str) -> bool {
        let matches = |list: &[String]| list.iter().any(|r| r.eq_ignore_ascii_case(full_name));

        if matches(&self.packages.banned_repos) {
            return false;
        }
        self.packages.approved_repos.is_empty() || matches(&self.packages.approved_repos)
    }

    /// Validate required fields
    pub fn validate(&self) -> ConfigResult<()> {
        if self.id.trim().is_empty() {
            return Err(SprigError::ConfigValidation {
                field: "id".to_string(),
                reason: "target id must not be empty".to_string(),
            });
        }
        if self.compile.main_file.is_empty() {
            return Err(SprigError::ConfigValidation {
                field: "compile.mainFile".to_string(),
                reason: "main file must not be empty".to_string(),
            });
        }
        self.upgrade_rules()?;
        Ok(())
    }
}

/// Parse JSON string to a target description
pub fn parse_target_json(content: &str) -> ConfigResult<TargetConfig> {
    let config: TargetConfig = serde_json::from_str(content)
        .map_err(|e| SprigError::json("failed to parse target description".to_string(), e))?;
    config.validate()?;
    Ok(config)
}

/// Load a target description from file
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<TargetConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SprigError::io(format!("Failed to read {}", path), e))?;
    parse_target_json(&content)
}
