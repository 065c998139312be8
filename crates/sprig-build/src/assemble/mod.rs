//! Compile option assembly
//!
//! Walks the loaded graph in build order and collects what a compiler
//! needs: source files namespaced by package, native metadata from the
//! host, merged resources and, for native targets, a compressed copy of
//! the project source to embed in the binary.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde_json::Value;
use tracing::debug;

use sprig_core::error::SprigError;
use sprig_core::{CONFIG_NAME, MODULES_DIR, ROOT_ID};
use sprig_host::ExtensionInfo;
use sprig_resolver::Project;

use crate::jres::merge_jres;
use crate::options::{CompileOptions, EmbedHeader, EmbedMeta};
use crate::publish::{cloud_id, files_to_be_published, gzip};
use crate::{BuildResult, BLOCKS_PROJECT_NAME, JAVASCRIPT_PROJECT_NAME};

const GENERATED_HEADER: &str = "// Auto-generated. Do not edit.\n";
const GENERATED_FOOTER: &str = "\n// Auto-generated. Do not edit. Really.\n";

/// Builds compile options from a loaded project
pub struct BuildAssembler<'a> {
    project: &'a Project,
}

impl<'a> BuildAssembler<'a> {
    /// Assembler over an already loaded project
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    /// Load `project` from installed packages, then assemble over it
    pub async fn load(project: &'a mut Project) -> BuildResult<BuildAssembler<'a>> {
        project.load().await?;
        Ok(Self { project })
    }

    pub fn project(&self) -> &Project {
        self.project
    }

    /// Native summary of the build: package ids and merged native settings.
    /// The first package in build order wins a setting.
    pub fn extension_info(&self) -> ExtensionInfo {
        let nodes = self.project.sorted_deps();

        let mut packages: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
        packages.sort();

        let mut settings: IndexMap<String, Value> = IndexMap::new();
        for node in &nodes {
            let Some(flat) = node.config.as_ref().and_then(|c| c.flat_native_settings()) else {
                continue;
            };
            for (key, value) in flat {
                settings.entry(key).or_insert(value);
            }
        }

        ExtensionInfo {
            packages,
            settings,
            target: self.project.target().id.clone(),
        }
    }

    /// Write an auto-generated root file if its contents changed. Returns
    /// whether the file was written.
    pub async fn generate_file(&self, name: &str, contents: &str) -> BuildResult<bool> {
        if !self.project.root_config()?.files.iter().any(|f| f == name) {
            return Err(SprigError::FileNotListed {
                file: name.to_string(),
                config: CONFIG_NAME.to_string(),
            });
        }

        let wrapped = format!("{}{}{}", GENERATED_HEADER, contents, GENERATED_FOOTER);
        if self.project.read_file(ROOT_ID, name).await?.as_deref() == Some(wrapped.as_str()) {
            return Ok(false);
        }
        debug!("updating {} (size={})...", name, wrapped.len());
        self.project.write_file(ROOT_ID, name, &wrapped).await?;
        Ok(true)
    }

    pub async fn compile_options(&self) -> BuildResult<CompileOptions> {
        let root = self.project.root_config()?;
        let target = &self.project.target().compile;
        let mut options = CompileOptions::new(root.name.clone(), target.clone());

        let nodes = self.project.sorted_deps();
        debug!(
            "building: {}",
            nodes
                .iter()
                .filter_map(|n| n.config.as_ref().map(|c| c.name.as_str()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let ext_info = self.extension_info();
        if target.is_native {
            options.hex_info = self.project.host().hex_info(&ext_info).await?;
        }
        options.ext_info = Some(ext_info);

        if target.is_native && !root.binary_only && !target.short_pointers {
            self.embed_source(&mut options).await?;
        }

        for node in nodes {
            for file in self.project.get_files(&node.id)? {
                if !target.source_extensions.iter().any(|ext| file.ends_with(ext.as_str())) {
                    continue;
                }
                let contents = self
                    .project
                    .read_file(&node.id, &file)
                    .await?
                    .ok_or_else(|| SprigError::MissingFile {
                        file: format!("{}/{}", node.id, file),
                    })?;
                let path = if node.level > 0 {
                    format!("{}/{}/{}", MODULES_DIR, node.id, file)
                } else {
                    file
                };
                options.add_source(path, contents);
            }
        }

        options.jres = merge_jres(self.project).await?;
        Ok(options)
    }

    /// Compress the publishable sources into `options.embed_blob`, applying
    /// the API upgrade rules first
    async fn embed_source(&self, options: &mut CompileOptions) -> BuildResult<()> {
        let published = files_to_be_published(self.project, true).await?;
        let rules = self.project.rules();

        let upgraded: Vec<(String, String, bool)> = published
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(name, text)| {
                let updated = rules.upgrade_api(&text);
                let changed = updated != text;
                (name, updated, changed)
            })
            .collect();

        let mut files = IndexMap::new();
        for (name, text, changed) in upgraded {
            if changed {
                debug!("updating APIs in {} (size={})...", name, text.len());
                self.project.write_file(ROOT_ID, &name, &text).await?;
            }
            files.insert(name, text);
        }

        let root = self.project.root_config()?;
        let target = self.project.target();
        let editor = match &target.compile.preferred_editor {
            Some(editor) => editor.clone(),
            None if files.contains_key("main.blocks") => BLOCKS_PROJECT_NAME.to_string(),
            None => JAVASCRIPT_PROJECT_NAME.to_string(),
        };

        let header = EmbedHeader {
            name: root.name.clone(),
            comment: root.description.clone(),
            status: "unpublished".to_string(),
            script_id: root.installed_version.clone(),
            cloud_id: cloud_id(target),
            editor,
            target_versions: target.versions.clone(),
        };
        let header_text = serde_json::to_string(&header)
            .map_err(|e| SprigError::json("failed to serialize embed header".to_string(), e))?;
        let program_text = serde_json::to_string(&files)
            .map_err(|e| SprigError::json("failed to serialize program".to_string(), e))?;

        let compressed = gzip(format!("{}{}", header_text, program_text).as_bytes())?;

        options.embed_meta = Some(EmbedMeta {
            compression: "gzip".to_string(),
            header_size: header_text.len(),
            text_size: program_text.len(),
            name: root.name.clone(),
            embed_url: target.embed_url.clone(),
            target_version: target.target_version().to_string(),
            target_id: target.id.clone(),
        });
        options.embed_blob = Some(STANDARD.encode(compressed));
        Ok(())
    }
}
