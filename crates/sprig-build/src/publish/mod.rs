//! Publishing
//!
//! The publishable file set of a project is its sanitized manifest plus
//! every file the manifest lists. A project archive wraps that set in a
//! small metadata header and compresses it with gzip.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sprig_config::{TargetConfig, TargetVersionInfo};
use sprig_core::error::SprigError;
use sprig_core::types::{FileMap, VersionSpec};
use sprig_core::{CONFIG_NAME, ROOT_ID};
use sprig_resolver::Project;

use crate::{BuildResult, BLOCKS_PROJECT_NAME};

/// Decompressed contents of a project archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectArchive {
    pub meta: ArchiveMeta,
    /// JSON of the published file set
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMeta {
    pub cloud_id: String,
    pub target_versions: TargetVersionInfo,
    pub editor: String,
    pub name: String,
}

impl ProjectArchive {
    /// The published file set carried by this archive
    pub fn files(&self) -> BuildResult<FileMap> {
        serde_json::from_str(&self.source)
            .map_err(|e| SprigError::json("invalid archive source".to_string(), e))
    }
}

/// Files to publish for the root package, sorted by name
///
/// Private packages are refused unless `allow_private` is set. Local
/// dependency references are replaced by `*` and the installed version is
/// dropped from the manifest.
pub async fn files_to_be_published(project: &Project, allow_private: bool) -> BuildResult<FileMap> {
    let config = project.root_config()?;
    if !allow_private && !config.public {
        return Err(SprigError::NotPublic);
    }

    let mut published = config.clone();
    published.installed_version = None;
    for version in published.dependencies.values_mut() {
        if VersionSpec::parse(version).is_publish_local() {
            *version = "*".to_string();
        }
    }

    let mut files = FileMap::new();
    files.insert(CONFIG_NAME.to_string(), published.to_json_pretty()?);
    for file in project.get_files(ROOT_ID)? {
        let text = project
            .read_file(ROOT_ID, &file)
            .await?
            .ok_or_else(|| SprigError::MissingFile { file: file.clone() })?;
        files.insert(file, text);
    }

    files.sort_keys();
    debug!("{} files to publish", files.len());
    Ok(files)
}

/// Gzip-compressed project archive of the publishable file set
pub async fn compress_to_file(project: &Project, editor: Option<&str>) -> BuildResult<Vec<u8>> {
    let files = files_to_be_published(project, true).await?;
    let target = project.target();

    let archive = ProjectArchive {
        meta: ArchiveMeta {
            cloud_id: cloud_id(target),
            target_versions: target.versions.clone(),
            editor: editor.unwrap_or(BLOCKS_PROJECT_NAME).to_string(),
            name: project.root_config()?.name.clone(),
        },
        source: serde_json::to_string_pretty(&files)
            .map_err(|e| SprigError::json("failed to serialize files".to_string(), e))?,
    };

    let text = serde_json::to_string_pretty(&archive)
        .map_err(|e| SprigError::json("failed to serialize archive".to_string(), e))?;
    gzip(text.as_bytes())
}

/// Read back an archive written by [`compress_to_file`]
pub fn read_archive(bytes: &[u8]) -> BuildResult<ProjectArchive> {
    let text = gunzip(bytes)?;
    serde_json::from_str(&text).map_err(|e| SprigError::json("invalid project archive".to_string(), e))
}

/// Cloud id of the running target
pub(crate) fn cloud_id(target: &TargetConfig) -> String {
    format!("{}{}", target.cloud_id, target.id)
}

pub(crate) fn gzip(bytes: &[u8]) -> BuildResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| SprigError::io("Failed to compress".to_string(), e))?;
    encoder
        .finish()
        .map_err(|e| SprigError::io("Failed to compress".to_string(), e))
}

pub(crate) fn gunzip(bytes: &[u8]) -> BuildResult<String> {
    let mut text = String::new();
    GzDecoder::new(bytes)
        .read_to_string(&mut text)
        .map_err(|e| SprigError::io("Failed to decompress".to_string(), e))?;
    Ok(text)
}
