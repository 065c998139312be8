//! Protocol dispatch for package downloads and manifest lookups

use std::sync::Arc;

use tracing::debug;

use sprig_config::{SessionConfig, TargetConfig};
use sprig_core::error::SprigError;
use sprig_core::types::{FileMap, PackageConfig, PackageRef, RepoRef, UpgradeRules, VersionSpec};
use sprig_core::CONFIG_NAME;

use crate::client::RepoClient;
use crate::HostResult;

/// Where package files come from: the target's bundled and embedded
/// tables, or a remote service through [`RepoClient`]
#[derive(Debug, Clone)]
pub struct PackageSources {
    target: Arc<TargetConfig>,
    rules: UpgradeRules,
    client: Option<RepoClient>,
}

impl PackageSources {
    /// Sources backed only by the target's own tables
    pub fn new(target: Arc<TargetConfig>) -> HostResult<Self> {
        let rules = target.upgrade_rules()?;
        Ok(Self {
            target,
            rules,
            client: None,
        })
    }

    /// Sources for a session; remote access unless the session is offline
    pub fn from_session(session: &SessionConfig) -> HostResult<Self> {
        let sources = Self::new(session.target.clone())?;
        if session.settings.is_offline() {
            debug!("offline session, remote packages unavailable");
            return Ok(sources);
        }
        Ok(sources.with_client(RepoClient::from_settings(&session.settings)?))
    }

    pub fn with_client(mut self, client: RepoClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn target(&self) -> &TargetConfig {
        &self.target
    }

    pub fn rules(&self) -> &UpgradeRules {
        &self.rules
    }

    pub fn client(&self) -> Option<&RepoClient> {
        self.client.as_ref()
    }

    /// Every file of `package`, fetched according to its version protocol
    pub async fn download(&self, package: &PackageRef) -> HostResult<FileMap> {
        match package.spec() {
            VersionSpec::Published(script_id) => {
                debug!("download {} from published script {}", package.id, script_id);
                self.remote()?.download_published(&script_id).await
            },
            VersionSpec::Repo(repo) => {
                self.check_repo(&repo)?;
                let client = self.remote()?;
                if !client.repo_exists(&repo.full_name()).await? {
                    return Err(SprigError::PackageNotFound {
                        name: repo.to_string(),
                    });
                }
                client.download_repo(&repo).await
            },
            VersionSpec::Embed(name) => {
                debug!("download {} from embedded script {}", package.id, name);
                self.target
                    .embedded_script(&name)
                    .cloned()
                    .ok_or(SprigError::PackageNotFound { name })
            },
            VersionSpec::File(_) | VersionSpec::Workspace(_) => {
                debug!("{} is local, nothing to download", package.id);
                Ok(FileMap::new())
            },
            VersionSpec::Wildcard | VersionSpec::Bundled(_) => {
                let name = self
                    .rules
                    .upgrade_package_reference(&package.id, &package.version);
                self.target
                    .bundled_packages
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| SprigError::PackageNotFound {
                        name: package.id.clone(),
                    })
            },
        }
    }

    /// Manifest of `id` at `version` without installing it
    pub async fn fetch_config(&self, id: &str, version: &str) -> HostResult<PackageConfig> {
        match VersionSpec::parse(version) {
            VersionSpec::Repo(repo) => {
                self.check_repo(&repo)?;
                self.remote()?.fetch_manifest(&repo).await
            },
            VersionSpec::Published(script_id) => {
                let files = self.remote()?.download_published(&script_id).await?;
                config_from_files(id, &files)
            },
            VersionSpec::Embed(name) => match self.target.embedded_script(&name) {
                Some(files) => config_from_files(id, files),
                None => Err(SprigError::PackageNotFound { name }),
            },
            _ => {
                let name = self.rules.upgrade_package_reference(id, version);
                match self.target.bundled_packages.get(&name) {
                    Some(files) => config_from_files(&name, files),
                    None => Err(SprigError::PackageNotFound {
                        name: id.to_string(),
                    }),
                }
            },
        }
    }

    fn remote(&self) -> HostResult<&RepoClient> {
        self.client.as_ref().ok_or_else(|| SprigError::Network {
            message: "remote packages are unavailable in offline mode".to_string(),
            source: None,
        })
    }

    fn check_repo(&self, repo: &RepoRef) -> HostResult<()> {
        if self.target.is_repo_allowed(&repo.full_name()) {
            Ok(())
        } else {
            Err(SprigError::RepositoryNotAllowed {
                repo: repo.full_name(),
            })
        }
    }
}

fn config_from_files(id: &str, files: &FileMap) -> HostResult<PackageConfig> {
    let text = files
        .get(CONFIG_NAME)
        .ok_or_else(|| SprigError::PackageNotFound {
            name: id.to_string(),
        })?;
    PackageConfig::parse(id, text)
}
