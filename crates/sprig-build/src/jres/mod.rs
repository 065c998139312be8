//! Embedded resources (`.jres` files)
//!
//! A `.jres` file maps resource keys to either a data string or a full
//! entry. The `*` key holds defaults for every other entry of the file.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use sprig_core::error::SprigError;
use sprig_resolver::Project;

use crate::BuildResult;

/// One resolved resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JRes {
    pub id: String,
    pub data: String,
    pub data_encoding: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    id: Option<String>,
    data: Option<String>,
    data_encoding: Option<String>,
    icon: Option<String>,
    namespace: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Short(String),
    Full(RawEntry),
}

/// Resolve the entries of one `.jres` file into `out`; later entries
/// replace earlier ones with the same id
pub fn parse_jres(file: &str, text: &str, out: &mut IndexMap<String, JRes>) -> BuildResult<()> {
    let entries: IndexMap<String, Value> = serde_json::from_str(text)
        .map_err(|e| SprigError::json(format!("invalid resource file {}", file), e))?;

    let base = match entries.get("*") {
        Some(value) => serde_json::from_value::<RawEntry>(value.clone())
            .map_err(|e| SprigError::json(format!("invalid defaults in {}", file), e))?,
        None => RawEntry::default(),
    };

    for (key, value) in &entries {
        if key == "*" {
            continue;
        }
        let entry = match serde_json::from_value::<RawValue>(value.clone())
            .map_err(|e| SprigError::json(format!("invalid resource {} in {}", key, file), e))?
        {
            RawValue::Short(data) => RawEntry {
                data: Some(data),
                ..RawEntry::default()
            },
            RawValue::Full(entry) => entry,
        };

        let mut namespace = entry
            .namespace
            .or_else(|| base.namespace.clone())
            .unwrap_or_default();
        if !namespace.is_empty() {
            namespace.push('.');
        }
        let id = entry.id.unwrap_or_else(|| format!("{}{}", namespace, key));
        let mime_type = entry.mime_type.or_else(|| base.mime_type.clone());
        let data_encoding = entry
            .data_encoding
            .or_else(|| base.data_encoding.clone())
            .unwrap_or_else(|| "base64".to_string());
        let data = entry.data.unwrap_or_default();

        let icon = entry.icon.or_else(|| {
            let is_image = matches!(mime_type.as_deref(), Some("image/png") | Some("image/jpeg"));
            (data_encoding == "base64" && is_image).then(|| {
                format!("data:{};base64,{}", mime_type.as_deref().unwrap_or_default(), data)
            })
        });

        out.insert(
            id.clone(),
            JRes {
                id,
                data,
                data_encoding,
                icon,
                namespace,
                mime_type,
            },
        );
    }
    Ok(())
}

/// Resources of every package in build order. A resource id keeps the
/// declaration of the first package that defines it.
pub async fn merge_jres(project: &Project) -> BuildResult<IndexMap<String, JRes>> {
    let mut merged = IndexMap::new();

    for node in project.sorted_deps() {
        let mut package = IndexMap::new();
        for file in project.get_files(&node.id)? {
            if !file.ends_with(".jres") {
                continue;
            }
            let text = project
                .read_file(&node.id, &file)
                .await?
                .ok_or_else(|| SprigError::MissingFile {
                    file: format!("{}/{}", node.id, file),
                })?;
            parse_jres(&file, &text, &mut package)?;
        }

        for (id, res) in package {
            merged.entry(id).or_insert(res);
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_and_short_form() {
        let text = r#"{
            "*": {"namespace": "images", "mimeType": "image/png"},
            "smile": "iVBORw0",
            "frown": {"data": "AAAA", "namespace": "faces", "icon": "frown.png"},
            "raw": {"data": "x", "id": "sounds.raw", "dataEncoding": "hex", "mimeType": "audio/wav"}
        }"#;

        let mut out = IndexMap::new();
        parse_jres("images.jres", text, &mut out).unwrap();

        let smile = &out["images.smile"];
        assert_eq!(smile.namespace, "images.");
        assert_eq!(smile.data_encoding, "base64");
        assert_eq!(smile.icon.as_deref(), Some("data:image/png;base64,iVBORw0"));

        let frown = &out["faces.frown"];
        assert_eq!(frown.icon.as_deref(), Some("frown.png"));

        let raw = &out["sounds.raw"];
        assert_eq!(raw.data_encoding, "hex");
        assert_eq!(raw.icon, None);
    }

    #[test]
    fn test_later_entries_win_within_a_package() {
        let mut out = IndexMap::new();
        parse_jres("a.jres", r#"{"logo": {"data": "one", "id": "logo"}}"#, &mut out).unwrap();
        parse_jres("b.jres", r#"{"logo": {"data": "two", "id": "logo"}}"#, &mut out).unwrap();
        assert_eq!(out["logo"].data, "two");
    }

    #[tokio::test]
    async fn test_earlier_package_wins_across_packages() {
        use std::sync::Arc;

        use sprig_config::TargetConfig;
        use sprig_core::{CONFIG_NAME, ROOT_ID};
        use sprig_host::{MemoryHost, PackageSources};

        let host = MemoryHost::new();
        host.insert_file(
            ROOT_ID,
            CONFIG_NAME,
            r#"{"name": "game", "dependencies": {"lib": "*"}, "files": ["art.jres"]}"#,
        );
        host.insert_file(
            ROOT_ID,
            "art.jres",
            r#"{"*": {"namespace": "img"}, "logo": "root", "hero": "root"}"#,
        );
        host.insert_file("lib", CONFIG_NAME, r#"{"name": "lib", "dependencies": {}, "files": ["lib.jres"]}"#);
        host.insert_file("lib", "lib.jres", r#"{"*": {"namespace": "img"}, "logo": "lib"}"#);

        let sources = Arc::new(PackageSources::new(Arc::new(TargetConfig::new("t", "1.0.0"))).unwrap());
        let mut project = Project::new(Arc::new(host), sources);
        project.load().await.unwrap();

        let merged = merge_jres(&project).await.unwrap();
        assert_eq!(merged["img.logo"].data, "lib");
        assert_eq!(merged["img.hero"].data, "root");
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["img.logo", "img.hero"]);
    }

    #[test]
    fn test_invalid_resource_file() {
        let mut out = IndexMap::new();
        let err = parse_jres("bad.jres", "[1, 2]", &mut out).unwrap_err();
        assert!(err.to_string().contains("bad.jres"));
    }
}
