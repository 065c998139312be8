//! File-system host

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use sprig_core::error::SprigError;
use sprig_core::types::{FileMap, PackageRef, VersionSpec};
use sprig_core::utils::{normalize_path, safe_join};
use sprig_core::MODULES_DIR;

use crate::host::Host;
use crate::sources::PackageSources;
use crate::HostResult;

/// Host backed by a project directory
///
/// Root files live in the project directory, installed dependencies under
/// `sprig_modules/<id>/`, and `file:` packages relative to the project.
#[derive(Debug, Clone)]
pub struct FsHost {
    root: Utf8PathBuf,
    sources: Option<Arc<PackageSources>>,
}

impl FsHost {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            sources: None,
        }
    }

    pub fn with_sources(mut self, sources: Arc<PackageSources>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Directory holding the files of `package`
    pub fn package_dir(&self, package: &PackageRef) -> HostResult<PathBuf> {
        if package.is_root {
            return Ok(self.root.as_std_path().to_path_buf());
        }

        match package.spec() {
            VersionSpec::File(path) => Ok(normalize_path(&self.root.as_std_path().join(path))),
            _ => safe_join(
                &self.root.as_std_path().join(MODULES_DIR),
                Path::new(&package.id),
            ),
        }
    }

    fn file_path(&self, package: &PackageRef, name: &str) -> HostResult<PathBuf> {
        safe_join(&self.package_dir(package)?, Path::new(name))
    }
}

#[async_trait]
impl Host for FsHost {
    async fn read_file(&self, package: &PackageRef, name: &str) -> HostResult<Option<String>> {
        let path = self.file_path(package, name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SprigError::io(format!("Failed to read {}", path.display()), e)),
        }
    }

    async fn write_file(&self, package: &PackageRef, name: &str, contents: &str) -> HostResult<()> {
        let path = self.file_path(package, name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SprigError::io(format!("Failed to create {}", parent.display()), e))?;
        }
        debug!("write {}", path.display());
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| SprigError::io(format!("Failed to write {}", path.display()), e))
    }

    async fn download_package(&self, package: &PackageRef) -> HostResult<FileMap> {
        let sources = self.sources.as_ref().ok_or_else(|| SprigError::Network {
            message: format!("no package source configured to download {}", package.id),
            source: None,
        })?;

        let files = sources.download(package).await?;
        for (name, contents) in &files {
            self.write_file(package, name, contents).await?;
        }
        debug!("installed {} files for {}", files.len(), package.id);
        Ok(files)
    }
}
