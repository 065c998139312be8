//! In-memory host

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use sprig_core::error::SprigError;
use sprig_core::types::{FileMap, PackageRef};

use crate::api::{ExtensionInfo, HexInfo};
use crate::host::Host;
use crate::sources::PackageSources;
use crate::HostResult;

/// One `write_file` call seen by a [`MemoryHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub package: String,
    pub file: String,
    pub contents: String,
}

/// Host keeping every package's files in memory, keyed by package id
#[derive(Debug, Default)]
pub struct MemoryHost {
    packages: DashMap<String, FileMap>,
    sources: Option<Arc<PackageSources>>,
    hex_info: Option<HexInfo>,
    writes: Mutex<Vec<WriteRecord>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage downloads from `sources`
    pub fn with_sources(mut self, sources: Arc<PackageSources>) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Native metadata answered for every native build
    pub fn with_hex_info(mut self, info: HexInfo) -> Self {
        self.hex_info = Some(info);
        self
    }

    /// Replace all files of `id`
    pub fn add_package(&self, id: impl Into<String>, files: FileMap) {
        self.packages.insert(id.into(), files);
    }

    pub fn insert_file(&self, id: &str, name: impl Into<String>, contents: impl Into<String>) {
        self.packages
            .entry(id.to_string())
            .or_default()
            .insert(name.into(), contents.into());
    }

    pub fn file(&self, id: &str, name: &str) -> Option<String> {
        self.packages.get(id)?.get(name).cloned()
    }

    pub fn has_package(&self, id: &str) -> bool {
        self.packages.contains_key(id)
    }

    /// Every write so far, in order
    pub fn writes(&self) -> Vec<WriteRecord> {
        match self.writes.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Host for MemoryHost {
    async fn read_file(&self, package: &PackageRef, name: &str) -> HostResult<Option<String>> {
        Ok(self.file(&package.id, name))
    }

    async fn write_file(&self, package: &PackageRef, name: &str, contents: &str) -> HostResult<()> {
        self.insert_file(&package.id, name, contents);
        let record = WriteRecord {
            package: package.id.clone(),
            file: name.to_string(),
            contents: contents.to_string(),
        };
        match self.writes.lock() {
            Ok(mut log) => log.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        Ok(())
    }

    async fn download_package(&self, package: &PackageRef) -> HostResult<FileMap> {
        let sources = self.sources.as_ref().ok_or_else(|| SprigError::Network {
            message: format!("no package source configured to download {}", package.id),
            source: None,
        })?;

        let files = sources.download(package).await?;
        debug!("staged {} files for {}", files.len(), package.id);
        if !files.is_empty() {
            let mut staged = self.packages.entry(package.id.clone()).or_default();
            for (name, contents) in &files {
                staged.insert(name.clone(), contents.clone());
            }
        }
        Ok(files)
    }

    async fn hex_info(&self, _info: &ExtensionInfo) -> HostResult<Option<HexInfo>> {
        Ok(self.hex_info.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_config::TargetConfig;
    use sprig_core::CONFIG_NAME;

    #[tokio::test]
    async fn test_read_write() {
        let host = MemoryHost::new();
        let root = PackageRef::new("this", "file:.", true);

        assert_eq!(host.read_file(&root, "main.ts").await.unwrap(), None);
        host.write_file(&root, "main.ts", "led.plot(0, 0)").await.unwrap();
        assert_eq!(
            host.read_file(&root, "main.ts").await.unwrap().as_deref(),
            Some("led.plot(0, 0)")
        );

        let writes = host.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].file, "main.ts");
    }

    #[tokio::test]
    async fn test_download_stages_files() {
        let mut target = TargetConfig::new("t", "1.0.0");
        let mut core = FileMap::new();
        core.insert(CONFIG_NAME.to_string(), "{}".to_string());
        target.bundled_packages.insert("core".to_string(), core);

        let sources = Arc::new(PackageSources::new(Arc::new(target)).unwrap());
        let host = MemoryHost::new().with_sources(sources);

        let core = PackageRef::new("core", "*", false);
        host.download_package(&core).await.unwrap();
        assert!(host.has_package("core"));
        assert_eq!(host.read_file(&core, CONFIG_NAME).await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_download_without_sources_fails() {
        let host = MemoryHost::new();
        let err = host
            .download_package(&PackageRef::new("core", "*", false))
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(host.hex_info(&ExtensionInfo::default()).await.unwrap(), None);
    }
}
