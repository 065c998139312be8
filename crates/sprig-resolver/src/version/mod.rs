//! Version resolution

use std::sync::Arc;

use sprig_config::TargetConfig;
use sprig_core::error::SprigError;
use sprig_core::types::{is_file_ref, PackageConfig, VersionSpec};
use sprig_host::PackageSources;

use crate::graph::PackageGraph;
use crate::ResolverResult;

/// Turns requested version specs into concrete versions and manifests
#[derive(Debug, Clone)]
pub struct VersionResolver {
    sources: Arc<PackageSources>,
}

impl VersionResolver {
    pub fn new(sources: Arc<PackageSources>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &PackageSources {
        &self.sources
    }

    pub fn target(&self) -> &TargetConfig {
        self.sources.target()
    }

    /// Concrete version of `id`. Packages in the embedded table always
    /// resolve to `embed:<id>`; anything else must name a version.
    pub fn resolve_version(&self, id: &str, spec: &str) -> ResolverResult<String> {
        if self.target().embedded_script(id).is_some() {
            return Ok(format!("embed:{}", id));
        }
        if VersionSpec::parse(spec).is_wildcard() {
            return Err(SprigError::UnspecifiedVersion {
                package: id.to_string(),
            });
        }
        Ok(spec.to_string())
    }

    /// Manifest of `id` at `version` without installing it
    ///
    /// A loaded package requested with its own spec answers from the graph.
    /// Local packages that are not in the graph cannot be looked up and
    /// yield `None`.
    pub async fn config_for(
        &self,
        graph: &PackageGraph,
        id: &str,
        version: &str,
    ) -> ResolverResult<Option<PackageConfig>> {
        if let Some(node) = graph.get(id) {
            let same_spec = node.version_spec == version || is_file_ref(version);
            if let (true, Some(config)) = (same_spec, node.config.as_ref()) {
                return Ok(Some(config.clone()));
            }
        }

        match VersionSpec::parse(version) {
            VersionSpec::File(_) | VersionSpec::Workspace(_) => Ok(None),
            _ => self.sources.fetch_config(id, version).await.map(Some),
        }
    }
}
