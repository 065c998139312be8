//! User settings (`sprig.toml`) parsing
//!
//! Settings carry what differs per machine or per project rather than per
//! target: where remote packages come from, credentials and extra trusted
//! repositories.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use sprig_core::error::SprigError;

use crate::ConfigResult;

/// Complete settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub remote: RemoteSection,

    #[serde(default)]
    pub packages: PackagesSection,
}

/// Remote endpoints and credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteSection {
    /// Repository metadata API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_api: Option<String>,

    /// Raw repository file host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,

    /// Published script API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_api: Option<String>,

    /// Bearer token sent with repository requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Never touch the network
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline: Option<bool>,
}

/// Extra repository trust on top of the target's lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackagesSection {
    #[serde(default, rename = "approved-repos")]
    pub approved_repos: Vec<String>,

    #[serde(default, rename = "banned-repos")]
    pub banned_repos: Vec<String>,
}

pub const DEFAULT_REPO_API: &str = "https://api.github.com";
pub const DEFAULT_RAW_CONTENT: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_SCRIPT_API: &str = "https://scripts.sprig.dev/api";

impl UserSettings {
    /// Fill unset fields of `self` from `base`; repository lists are joined
    pub fn layered_over(mut self, base: UserSettings) -> UserSettings {
        self.remote.repo_api = self.remote.repo_api.or(base.remote.repo_api);
        self.remote.raw_content = self.remote.raw_content.or(base.remote.raw_content);
        self.remote.script_api = self.remote.script_api.or(base.remote.script_api);
        self.remote.token = self.remote.token.or(base.remote.token);
        self.remote.offline = self.remote.offline.or(base.remote.offline);

        let mut approved = base.packages.approved_repos;
        approved.extend(self.packages.approved_repos);
        approved.dedup();
        self.packages.approved_repos = approved;

        let mut banned = base.packages.banned_repos;
        banned.extend(self.packages.banned_repos);
        banned.dedup();
        self.packages.banned_repos = banned;

        self
    }

    pub fn repo_api(&self) -> &str {
        self.remote.repo_api.as_deref().unwrap_or(DEFAULT_REPO_API)
    }

    pub fn raw_content(&self) -> &str {
        self.remote.raw_content.as_deref().unwrap_or(DEFAULT_RAW_CONTENT)
    }

    pub fn script_api(&self) -> &str {
        self.remote.script_api.as_deref().unwrap_or(DEFAULT_SCRIPT_API)
    }

    pub fn is_offline(&self) -> bool {
        self.remote.offline.unwrap_or(false)
    }
}

/// Parse TOML string to settings
pub fn parse_settings(content: &str) -> ConfigResult<UserSettings> {
    toml::from_str(content).map_err(|e| SprigError::ConfigValidation {
        field: "sprig.toml".to_string(),
        reason: e.to_string(),
    })
}

/// Serialize settings to a TOML string
pub fn serialize_settings(settings: &UserSettings) -> ConfigResult<String> {
    toml::to_string_pretty(settings).map_err(|e| SprigError::ConfigValidation {
        field: "sprig.toml".to_string(),
        reason: format!("TOML serialization error: {}", e),
    })
}

/// Load settings from file
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<UserSettings> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SprigError::io(format!("Failed to read {}", path), e))?;
    parse_settings(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings() {
        let settings = parse_settings(
            r#"
[remote]
raw_content = "http://localhost:9000/raw"
token = "secret"

[packages]
approved-repos = ["acme/lights"]
"#,
        )
        .unwrap();

        assert_eq!(settings.raw_content(), "http://localhost:9000/raw");
        assert_eq!(settings.repo_api(), DEFAULT_REPO_API);
        assert_eq!(settings.remote.token.as_deref(), Some("secret"));
        assert_eq!(settings.packages.approved_repos, vec!["acme/lights".to_string()]);
        assert!(!settings.is_offline());
    }

    #[test]
    fn test_empty_settings() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings, UserSettings::default());
        assert!(parse_settings("[remote\n").is_err());
    }

    #[test]
    fn test_layering() {
        let global = parse_settings(
            "[remote]\ntoken = \"global\"\noffline = true\n[packages]\napproved-repos = [\"a/b\"]\n",
        )
        .unwrap();
        let project =
            parse_settings("[remote]\ntoken = \"project\"\n[packages]\napproved-repos = [\"c/d\"]\n")
                .unwrap();

        let merged = project.layered_over(global);
        assert_eq!(merged.remote.token.as_deref(), Some("project"));
        assert!(merged.is_offline());
        assert_eq!(merged.packages.approved_repos, vec!["a/b".to_string(), "c/d".to_string()]);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut settings = UserSettings::default();
        settings.remote.script_api = Some("http://scripts".to_string());
        let text = serialize_settings(&settings).unwrap();
        assert_eq!(parse_settings(&text).unwrap(), settings);
    }
}
