//! Compile options handed to a downstream compiler

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use sprig_config::{CompileTarget, TargetVersionInfo};
use sprig_core::types::FileMap;
use sprig_host::{ExtensionInfo, HexInfo};

use crate::jres::JRes;

/// Everything a compiler needs for one build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    /// Name of the root package
    pub name: String,
    /// Paths into `file_system`, in build order
    pub source_files: Vec<String>,
    pub file_system: FileMap,
    pub target: CompileTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_info: Option<ExtensionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex_info: Option<HexInfo>,
    #[serde(default)]
    pub jres: IndexMap<String, JRes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_meta: Option<EmbedMeta>,
    /// Base64 of the compressed project source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_blob: Option<String>,
}

/// Describes the layout of `embed_blob`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedMeta {
    pub compression: String,
    /// Length of the JSON header at the start of the decompressed text
    pub header_size: usize,
    /// Length of the program text following the header
    pub text_size: usize,
    pub name: String,
    #[serde(rename = "eURL", default, skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    #[serde(rename = "eVER")]
    pub target_version: String,
    #[serde(rename = "sprigTarget")]
    pub target_id: String,
}

/// Header stored in front of the embedded program text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EmbedHeader {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<String>,
    pub cloud_id: String,
    pub editor: String,
    pub target_versions: TargetVersionInfo,
}

impl CompileOptions {
    pub fn new(name: impl Into<String>, target: CompileTarget) -> Self {
        Self {
            name: name.into(),
            source_files: Vec::new(),
            file_system: FileMap::new(),
            target,
            ext_info: None,
            hex_info: None,
            jres: IndexMap::new(),
            embed_meta: None,
            embed_blob: None,
        }
    }

    /// Add a source file at `path`
    pub fn add_source(&mut self, path: String, contents: String) {
        self.source_files.push(path.clone());
        self.file_system.insert(path, contents);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_meta_field_names() {
        let meta = EmbedMeta {
            compression: "gzip".to_string(),
            header_size: 10,
            text_size: 20,
            name: "game".to_string(),
            embed_url: None,
            target_version: "1.2.0".to_string(),
            target_id: "microbit".to_string(),
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["headerSize"], 10);
        assert_eq!(value["eVER"], "1.2.0");
        assert_eq!(value["sprigTarget"], "microbit");
        assert!(value.get("eURL").is_none());
    }
}
