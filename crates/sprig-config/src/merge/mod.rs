//! Configuration layering, file discovery and environment overrides

use std::collections::HashMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use sprig_core::error::SprigError;

use crate::settings::UserSettings;
use crate::target::TargetConfig;
use crate::ConfigResult;

/// Name of the target description searched for by the loader
pub const TARGET_FILE: &str = "target.json";

/// Name of the per-project settings file
pub const PROJECT_SETTINGS_FILE: &str = "sprig.toml";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
    /// Replaces `~/.sprig/config.toml` when set
    global_path: Option<Utf8PathBuf>,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Target description file
    Target(Utf8PathBuf),
    /// Global settings file
    Global(Utf8PathBuf),
    /// Project sprig.toml file
    Project(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

/// Frozen configuration of one resolution session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub target: Arc<TargetConfig>,
    pub settings: UserSettings,
}

impl SessionConfig {
    pub fn new(target: TargetConfig, settings: UserSettings) -> Self {
        Self {
            target: Arc::new(target),
            settings,
        }
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self {
            cwd,
            global_path: None,
        }
    }

    /// Read global settings from `path` instead of the home directory
    pub fn with_global_settings(mut self, path: Utf8PathBuf) -> Self {
        self.global_path = Some(path);
        self
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> ConfigResult<Utf8PathBuf> {
        let mut current = self.cwd.as_path();

        loop {
            let config_path = current.join(filename);
            if config_path.exists() {
                return Ok(config_path);
            }

            // Move up one directory
            if let Some(parent) = current.parent() {
                current = parent;
            } else {
                // Reached filesystem root
                break;
            }
        }

        // Return path in current directory even if it doesn't exist
        Ok(self.cwd.join(filename))
    }

    /// Load the target description, from `explicit` if given, otherwise by
    /// searching upwards for `target.json`
    pub async fn load_target_config(
        &self,
        explicit: Option<&Utf8Path>,
    ) -> ConfigResult<(TargetConfig, ConfigSource)> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => self.resolve_config_path(TARGET_FILE)?,
        };

        if !path.exists() {
            return Err(SprigError::ConfigValidation {
                field: "target".to_string(),
                reason: format!(
                    "No {} found in current directory or parent directories",
                    TARGET_FILE
                ),
            });
        }

        let config = crate::target::load_from_file(&path).await?;
        debug!("loaded target {} from {}", config.id, path);
        Ok((config, ConfigSource::Target(path)))
    }

    /// Location of the global settings file. A home directory that cannot
    /// be determined only skips the global layer.
    fn global_settings_path(&self) -> Option<Utf8PathBuf> {
        if let Some(path) = &self.global_path {
            return Some(path.clone());
        }

        let Some(home_dir) = dirs::home_dir() else {
            warn!("could not determine home directory, skipping global settings");
            return None;
        };
        match Utf8PathBuf::try_from(home_dir) {
            Ok(home) => Some(home.join(".sprig").join("config.toml")),
            Err(e) => {
                warn!("skipping global settings, invalid home directory path: {}", e);
                None
            },
        }
    }

    /// Load global settings (`~/.sprig/config.toml`)
    pub async fn load_global_settings(&self) -> ConfigResult<Option<UserSettings>> {
        let Some(global_path) = self.global_settings_path() else {
            return Ok(None);
        };

        if global_path.exists() {
            let settings = crate::settings::load_from_file(&global_path).await?;
            Ok(Some(settings))
        } else {
            Ok(None)
        }
    }

    /// Load project settings (`sprig.toml`, searched upwards)
    pub async fn load_project_settings(&self) -> ConfigResult<Option<(UserSettings, ConfigSource)>> {
        let path = self.resolve_config_path(PROJECT_SETTINGS_FILE)?;
        if !path.exists() {
            return Ok(None);
        }
        let settings = crate::settings::load_from_file(&path).await?;
        Ok(Some((settings, ConfigSource::Project(path))))
    }

    /// Load and layer every source into one session configuration
    pub async fn load_session(
        &self,
        explicit_target: Option<&Utf8Path>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<SessionConfig> {
        let (target, _) = self.load_target_config(explicit_target).await?;
        let global = self.load_global_settings().await?;
        let project = self.load_project_settings().await?.map(|(s, _)| s);

        ConfigLayering::merge_configs(
            target,
            global,
            project,
            ConfigLayering::collect_env_overrides(),
            cli_overrides,
        )
    }
}

impl ConfigLayering {
    /// Merge multiple configuration layers; later layers win
    pub fn merge_configs(
        mut target: TargetConfig,
        global_settings: Option<UserSettings>,
        project_settings: Option<UserSettings>,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<SessionConfig> {
        let mut settings = match (project_settings, global_settings) {
            (Some(project), Some(global)) => project.layered_over(global),
            (Some(project), None) => project,
            (None, Some(global)) => global,
            (None, None) => UserSettings::default(),
        };

        Self::apply_env_overrides(&mut target, &mut settings, &env_overrides)?;

        // Apply CLI flag overrides (highest priority)
        Self::apply_cli_overrides(&mut target, &mut settings, &cli_overrides)?;

        for repo in &settings.packages.approved_repos {
            if !target.packages.approved_repos.contains(repo) {
                target.packages.approved_repos.push(repo.clone());
            }
        }
        for repo in &settings.packages.banned_repos {
            if !target.packages.banned_repos.contains(repo) {
                target.packages.banned_repos.push(repo.clone());
            }
        }

        target.validate()?;
        Ok(SessionConfig::new(target, settings))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(
        target: &mut TargetConfig,
        settings: &mut UserSettings,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "SPRIG_TARGET_VERSION" => {
                    target.versions.target = value.clone();
                },
                "SPRIG_OFFLINE" => {
                    settings.remote.offline = Some(parse_flag(key, value)?);
                },
                "SPRIG_REPO_URL" => {
                    settings.remote.repo_api = Some(value.clone());
                },
                "SPRIG_TOKEN" => {
                    settings.remote.token = Some(value.clone());
                },
                _ => {
                    // Unknown environment variable, ignore
                },
            }
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(
        target: &mut TargetConfig,
        settings: &mut UserSettings,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "target-version" => {
                    target.versions.target = value.clone();
                },
                "offline" => {
                    settings.remote.offline = Some(parse_flag("--offline", value)?);
                },
                _ => {
                    // Unknown CLI override, ignore
                },
            }
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("SPRIG_"))
            .collect()
    }
}

fn parse_flag(field: &str, value: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SprigError::ConfigValidation {
            field: field.to_string(),
            reason: format!("expected a boolean, got '{}'", value),
        }),
    }
}
