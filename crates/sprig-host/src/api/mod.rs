//! Types exchanged with remote services and the native toolchain

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sprig_core::types::FileMap;

/// Repository metadata from the repository API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepoInfo {
    /// `owner/repo`
    pub full_name: String,
    /// Branch used when a reference carries no tag
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// Published script as returned by the script API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishedScript {
    pub id: String,
    /// File name -> contents
    pub files: FileMap,
}

/// Summary of the native parts of a build, handed to the host to look up
/// precompiled native metadata
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionInfo {
    /// Package ids of the build, sorted
    pub packages: Vec<String>,
    /// Merged native settings (dotted keys)
    pub settings: IndexMap<String, Value>,
    /// Target the build is for
    pub target: String,
}

/// Native-build metadata returned by the host
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HexInfo {
    /// Precompiled image, line by line
    #[serde(default)]
    pub hex: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtensionInfo {
    /// Stable key identifying this native configuration
    pub fn cache_key(&self) -> String {
        let settings: Vec<String> = self
            .settings
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}:{}:{}", self.target, self.packages.join(","), settings.join(";"))
    }
}
