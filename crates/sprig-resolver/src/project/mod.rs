//! Project loading
//!
//! A [`Project`] owns the package graph of one session. Loading starts at the
//! root manifest and expands every declared dependency depth-first; a
//! dependency's subtree is fully loaded before its importer returns. The
//! root additionally picks up packages implied by its main source file.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use sprig_config::TargetConfig;
use sprig_core::error::SprigError;
use sprig_core::types::{is_file_ref, PackageConfig, PackageRef, UpgradeRules, VersionSpec};
use sprig_core::{CONFIG_NAME, ROOT_ID};
use sprig_host::{Host, PackageSources};

use crate::conflict::{is_lookup_failure, Candidate, Conflict, ConflictDetector};
use crate::graph::{DependencyEntry, PackageGraph, PackageNode};
use crate::version::VersionResolver;
use crate::ResolverResult;


type LoadFuture<'a> = Pin<Box<dyn Future<Output = ResolverResult<()>> + Send + 'a>>;

/// Root package plus everything it depends on
pub struct Project {
    host: Arc<dyn Host>,
    sources: Arc<PackageSources>,
    resolver: VersionResolver,
    graph: PackageGraph,
}

impl Project {
    /// A project whose root lives in `host`
    pub fn new(host: Arc<dyn Host>, sources: Arc<PackageSources>) -> Self {
        Self {
            host,
            resolver: VersionResolver::new(Arc::clone(&sources)),
            sources,
            graph: PackageGraph::new(),
        }
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn sources(&self) -> &PackageSources {
        &self.sources
    }

    pub fn target(&self) -> &TargetConfig {
        self.sources.target()
    }

    pub fn rules(&self) -> &UpgradeRules {
        self.sources.rules()
    }

    pub fn resolver(&self) -> &VersionResolver {
        &self.resolver
    }

    pub fn graph(&self) -> &PackageGraph {
        &self.graph
    }

    /// Load the graph from installed packages only
    pub async fn load(&mut self) -> ResolverResult<()> {
        self.load_package(ROOT_ID.to_string(), false).await
    }

    /// Load the graph, downloading whatever is missing or outdated
    pub async fn install_all(&mut self) -> ResolverResult<()> {
        self.load_package(ROOT_ID.to_string(), true).await
    }

    /// Manifest of a loaded package
    pub fn config(&self, id: &str) -> ResolverResult<&PackageConfig> {
        self.graph
            .get(id)
            .and_then(|node| node.config.as_ref())
            .ok_or_else(|| SprigError::MissingFile {
                file: format!("{}/{}", id, CONFIG_NAME),
            })
    }

    pub fn root_config(&self) -> ResolverResult<&PackageConfig> {
        self.config(ROOT_ID)
    }

    /// Loaded packages in build order, root last
    pub fn sorted_deps(&self) -> Vec<&PackageNode> {
        self.graph.sorted_deps()
    }

    pub fn dependency_tree(&self) -> Vec<DependencyEntry> {
        self.graph.dependency_tree()
    }

    pub fn to_dot(&self) -> String {
        self.graph.to_dot()
    }

    /// Files of `id` that take part in a build; the root adds its test files
    pub fn get_files(&self, id: &str) -> ResolverResult<Vec<String>> {
        let config = self.config(id)?;
        let mut files = config.files.clone();
        if id == ROOT_ID {
            files.extend(config.test_files.iter().cloned());
        }
        Ok(files)
    }

    /// Conflicts `candidate` would introduce if added at `version`
    pub async fn find_conflicts(
        &self,
        candidate: Candidate,
        version: &str,
    ) -> ResolverResult<Vec<Conflict>> {
        ConflictDetector::new(&self.graph, &self.resolver, ROOT_ID)
            .find_conflicts(candidate, version)
            .await
    }

    /// Whether the root's main file uses `id`
    pub async fn is_package_in_use(&self, id: &str) -> ResolverResult<bool> {
        let main_file = &self.target().compile.main_file;
        let source = self.read_file(ROOT_ID, main_file).await?.unwrap_or_default();
        Ok(self.rules().is_package_in_use(id, &source))
    }

    pub fn package_ref(&self, id: &str) -> ResolverResult<PackageRef> {
        self.graph
            .get(id)
            .map(PackageNode::package_ref)
            .ok_or_else(|| SprigError::PackageNotFound {
                name: id.to_string(),
            })
    }

    pub async fn read_file(&self, id: &str, name: &str) -> ResolverResult<Option<String>> {
        let package = self.package_ref(id)?;
        self.host.read_file(&package, name).await
    }

    pub async fn write_file(&self, id: &str, name: &str, contents: &str) -> ResolverResult<()> {
        let package = self.package_ref(id)?;
        self.host.write_file(&package, name, contents).await
    }

    /// Persist the in-memory manifest of `id`
    pub async fn save_config(&self, id: &str) -> ResolverResult<()> {
        let text = self.config(id)?.to_json_pretty()?;
        self.write_file(id, CONFIG_NAME, &text).await
    }

    fn load_package(&mut self, id: String, install: bool) -> LoadFuture<'_> {
        Box::pin(async move {
            let Some(node) = self.graph.get_mut(&id) else {
                return Ok(());
            };
            if node.is_loaded {
                return Ok(());
            }
            node.is_loaded = true;

            let manifest = self.read_file(&id, CONFIG_NAME).await?;
            match manifest {
                Some(text) => self.parse_config(&id, &text).await?,
                None if !install => {
                    return Err(SprigError::PackageNotInstalled { package: id });
                },
                None => {},
            }

            if install {
                self.download(&id).await?;
            }

            let is_root = id == ROOT_ID;
            if is_root && self.target().dynamic_board_definition {
                self.patch_core_package()?;
            }

            let dependencies = self.config(&id)?.dependencies.clone();
            self.load_deps(&id, dependencies, install).await?;

            if is_root {
                self.add_missing_packages(install).await?;
            }
            Ok(())
        })
    }

    /// Attach `dependencies` of `importer`, loading packages seen for the
    /// first time
    async fn load_deps(
        &mut self,
        importer: &str,
        dependencies: IndexMap<String, String>,
        install: bool,
    ) -> ResolverResult<()> {
        for (id, version) in dependencies {
            let version = if version.is_empty() {
                "*".to_string()
            } else {
                version
            };

            if let Some(existing) = self.graph.get(&id) {
                if existing.version_spec != version
                    && !is_file_ref(&existing.version_spec)
                    && !is_file_ref(&version)
                {
                    return Err(SprigError::VersionSpecMismatch {
                        package: id,
                        existing: existing.version_spec.clone(),
                        requested: version,
                    });
                }
                self.graph.add_importer(&id, importer);
                continue;
            }

            let importer_level = self.graph.get(importer).map_or(0, |n| n.level);
            self.graph
                .insert(PackageNode::new(id.clone(), version, importer, importer_level));
            self.load_package(id, install).await?;
        }

        Ok(())
    }

    /// Parse manifest text of `id`, apply package upgrade rules and
    /// validate the result
    async fn parse_config(&mut self, id: &str, text: &str) -> ResolverResult<()> {
        let mut config = PackageConfig::parse(id, text)?;
        let changed = upgrade_dependencies(self.sources.rules(), &mut config);

        if let Some(node) = self.graph.get_mut(id) {
            node.config = Some(config);
        }
        if changed {
            debug!("upgraded dependency references of {}", id);
            self.save_config(id).await?;
        }

        self.config(id)?.validate(self.target().target_version())
    }

    async fn download(&mut self, id: &str) -> ResolverResult<()> {
        let Some(node) = self.graph.get(id) else {
            return Ok(());
        };
        let spec = node.version_spec.clone();
        let level = node.level;
        let installed = node.config.as_ref().and_then(|c| c.installed_version.clone());

        let version = self.resolver.resolve_version(id, &spec)?;
        if let Some(node) = self.graph.get_mut(id) {
            node.resolved_version = Some(version.clone());
        }

        if matches!(
            VersionSpec::parse(&version),
            VersionSpec::File(_) | VersionSpec::Workspace(_)
        ) {
            return Ok(());
        }
        if !version.starts_with("embed:") && installed.as_deref() == Some(version.as_str()) {
            debug!("{} {} is up to date", id, version);
            return Ok(());
        }

        debug!("downloading {}", version);
        let package = self.package_ref(id)?;
        self.host.download_package(&package).await?;

        let text = self
            .read_file(id, CONFIG_NAME)
            .await?
            .ok_or_else(|| SprigError::MissingFile {
                file: format!("{}/{}", id, CONFIG_NAME),
            })?;
        self.parse_config(id, &text).await?;

        if level != 0 {
            if let Some(node) = self.graph.get_mut(id) {
                let installed = node.version().to_string();
                if let Some(config) = node.config.as_mut() {
                    config.installed_version = Some(installed);
                }
            }
        }
        self.save_config(id).await?;
        debug!("installed {} /{}", id, version);
        Ok(())
    }

    /// Keep exactly one core package among the root's dependencies
    fn patch_core_package(&mut self) -> ResolverResult<()> {
        let sources = Arc::clone(&self.sources);
        let target = sources.target();
        let config = self
            .graph
            .root_mut()
            .config
            .as_mut()
            .ok_or_else(|| SprigError::MissingFile {
                file: format!("{}/{}", ROOT_ID, CONFIG_NAME),
            })?;

        let declared: Vec<String> = config
            .dependencies
            .keys()
            .filter(|dep| !dep.is_empty() && target.is_core_package(dep))
            .cloned()
            .collect();

        match declared.split_last() {
            None => {
                if let Some(first) = target.core_packages().into_iter().next() {
                    info!("adding core package {}", first.name);
                    config.dependencies.insert(first.name, "*".to_string());
                }
            },
            Some((_, removed)) => {
                for dep in removed {
                    info!("removing core package {}", dep);
                    config.dependencies.shift_remove(dep);
                }
            },
        }
        Ok(())
    }

    /// Add packages implied by the root's main file, one at a time, skipping
    /// any that conflict with what is already loaded or that fail to load.
    /// A skipped package leaves the graph as it was.
    async fn add_missing_packages(&mut self, install: bool) -> ResolverResult<()> {
        let main_file = self.target().compile.main_file.clone();
        let Some(source) = self.read_file(ROOT_ID, &main_file).await? else {
            return Ok(());
        };

        let declared = self.root_config()?.dependencies.clone();
        let missing = self.rules().missing_packages(&declared, &source);
        let mut added = false;

        for (package, version) in missing {
            match self
                .find_conflicts(Candidate::Id(package.clone()), &version)
                .await
            {
                Ok(conflicts) if !conflicts.is_empty() => {
                    let names: Vec<&str> = conflicts.iter().map(|c| c.package.as_str()).collect();
                    let settings: Vec<&str> =
                        conflicts.iter().filter_map(Conflict::setting_name).collect();
                    info!(
                        "skipping missing package {} because it conflicts with the following packages: {} (conflicting settings: {})",
                        package,
                        names.join(", "),
                        settings.join(", ")
                    );
                    continue;
                },
                Ok(_) => {},
                Err(e) if is_lookup_failure(&e) => {
                    warn!("skipping missing package {}: {}", package, e);
                    continue;
                },
                Err(e) => return Err(e),
            }

            // a failed load may have touched several nodes
            let snapshot = self.graph.clone();
            let mut dependency = IndexMap::new();
            dependency.insert(package.clone(), version);
            match self.load_deps(ROOT_ID, dependency, install).await {
                Ok(()) => {},
                Err(e) if is_lookup_failure(&e) => {
                    warn!("skipping missing package {}: {}", package, e);
                    self.graph = snapshot;
                    continue;
                },
                Err(e) => return Err(e),
            }

            info!("adding missing package {}", package);
            added = true;
            if let Some(config) = self.graph.root_mut().config.as_mut() {
                config.dependencies.insert(package, "*".to_string());
            }
        }

        if added {
            self.save_config(ROOT_ID).await?;
            self.root_config()?.validate(self.target().target_version())?;
        }
        Ok(())
    }
}

/// Rewrite dependency ids through the package upgrade rules. Returns whether
/// anything changed.
fn upgrade_dependencies(rules: &UpgradeRules, config: &mut PackageConfig) -> bool {
    let declared: Vec<(String, String)> = config
        .dependencies
        .iter()
        .map(|(id, spec)| (id.clone(), spec.clone()))
        .collect();

    let mut changed = false;
    for (id, spec) in declared {
        let upgraded = rules.upgrade_package_reference(&id, &spec);
        if upgraded == id {
            continue;
        }
        changed = true;
        config.dependencies.shift_remove(&id);
        if !upgraded.is_empty() {
            config.dependencies.insert(upgraded, "*".to_string());
        }
    }
    changed
}
