//! Conflict detection
//!
//! Before a package joins the graph we check it against every loaded
//! package: two core packages never coexist, native settings must agree, and
//! a package already in the graph must be requested with the same version.
//! Conflicts are data, not errors.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use sprig_core::error::SprigError;
use sprig_core::types::{is_file_ref, PackageConfig};

use crate::graph::PackageGraph;
use crate::version::VersionResolver;
use crate::ResolverResult;

/// What a conflict is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// Both packages are core packages
    Core,
    /// A native setting has different values
    Setting { name: String },
    /// The package is installed with a different version spec
    Version { installed: String, installing: String },
}

/// One conflict between a candidate and a package in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Id of the package in the graph the candidate conflicts with
    pub package: String,
    /// Name of the candidate package
    pub candidate: String,
    pub kind: ConflictKind,
    /// Set when the conflict was inherited from a dependency of `package`
    pub via: Option<String>,
}

/// Package to check: a manifest in hand, or an id to look up
#[derive(Debug, Clone)]
pub enum Candidate {
    Config(PackageConfig),
    Id(String),
}

impl Conflict {
    pub fn setting_name(&self) -> Option<&str> {
        match &self.kind {
            ConflictKind::Setting { name } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_version_conflict(&self) -> bool {
        matches!(self.kind, ConflictKind::Version { .. })
    }

    /// The same conflict seen from an importer of the conflicting package
    fn inherited_by(&self, ancestor: &str) -> Conflict {
        Conflict {
            package: ancestor.to_string(),
            candidate: self.candidate.clone(),
            kind: self.kind.clone(),
            via: Some(self.via.clone().unwrap_or_else(|| self.package.clone())),
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.via) {
            (ConflictKind::Core, None) => write!(
                f,
                "conflict between core packages {} and {}",
                self.candidate, self.package
            ),
            (ConflictKind::Core, Some(via)) => write!(
                f,
                "a dependency of {} ({}) conflicts with core package {}",
                self.package, via, self.candidate
            ),
            (ConflictKind::Setting { name }, _) => write!(
                f,
                "conflict on native setting {} between packages {} and {}",
                name, self.candidate, self.package
            ),
            (ConflictKind::Version { installed, installing }, None) => write!(
                f,
                "version mismatch for package {} (installed: {}, installing: {})",
                self.package, installed, installing
            ),
            (ConflictKind::Version { installed, installing }, Some(_)) => write!(
                f,
                "a dependency of {} has a version mismatch with package {} (installed: {}, installing: {})",
                self.package, self.candidate, installed, installing
            ),
        }
    }
}

type ConflictFuture<'a> = Pin<Box<dyn Future<Output = ResolverResult<Vec<Conflict>>> + Send + 'a>>;

/// Read-only conflict check over a loaded graph
pub(crate) struct ConflictDetector<'a> {
    graph: &'a PackageGraph,
    resolver: &'a VersionResolver,
    /// Package on whose behalf the check runs; never reported as an ancestor
    checker: &'a str,
}

impl<'a> ConflictDetector<'a> {
    pub(crate) fn new(
        graph: &'a PackageGraph,
        resolver: &'a VersionResolver,
        checker: &'a str,
    ) -> Self {
        Self {
            graph,
            resolver,
            checker,
        }
    }

    pub(crate) async fn find_conflicts(
        &self,
        candidate: Candidate,
        version: &str,
    ) -> ResolverResult<Vec<Conflict>> {
        let mut visited = HashSet::new();
        self.collect(candidate, version.to_string(), &mut visited).await
    }

    fn collect<'b>(
        &'b self,
        candidate: Candidate,
        version: String,
        visited: &'b mut HashSet<String>,
    ) -> ConflictFuture<'b> {
        Box::pin(async move {
            let config = match candidate {
                Candidate::Config(config) => config,
                Candidate::Id(id) => {
                    match self.resolver.config_for(self.graph, &id, &version).await? {
                        Some(config) => config,
                        None => return Ok(Vec::new()),
                    }
                },
            };

            // dependency cycles between candidates
            if !visited.insert(format!("{}@{}", config.name, version)) {
                return Ok(Vec::new());
            }

            let mut conflicts = self.direct_conflicts(&config, &version);

            // Also check the candidate's own dependencies, recursively
            for (dep, dep_version) in &config.dependencies {
                let child = self
                    .collect(Candidate::Id(dep.clone()), dep_version.clone(), visited)
                    .await?;
                conflicts.extend(child);
            }

            // Importers of a conflicting package conflict as well
            let mut inherited = Vec::new();
            for conflict in &conflicts {
                for ancestor in self.graph.ancestors(&conflict.package, self.checker) {
                    inherited.push(conflict.inherited_by(&ancestor));
                }
            }
            conflicts.extend(inherited);

            Ok(dedup_by_package(conflicts))
        })
    }

    /// Conflicts between `config` and each loaded package, in build order
    fn direct_conflicts(&self, config: &PackageConfig, version: &str) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        let settings = config.flat_native_settings();
        let ignore_settings = self
            .graph
            .root()
            .config
            .as_ref()
            .map_or(false, PackageConfig::ignores_native_conflicts);

        for node in self.graph.sorted_deps() {
            let Some(dep_config) = node.config.as_ref() else {
                continue;
            };

            if config.core && dep_config.core && node.id != config.name {
                conflicts.push(Conflict {
                    package: node.id.clone(),
                    candidate: config.name.clone(),
                    kind: ConflictKind::Core,
                    via: None,
                });
                continue;
            }

            let mut found_setting_conflict = false;
            if let (Some(ours), Some(theirs), false) = (
                settings.as_ref(),
                dep_config.flat_native_settings(),
                ignore_settings,
            ) {
                let defaults_only =
                    config.native_settings_are_defaults() || dep_config.native_settings_are_defaults();
                for (name, value) in ours {
                    let differs = theirs.get(name).map_or(false, |v| v != value);
                    if differs && !defaults_only {
                        conflicts.push(Conflict {
                            package: node.id.clone(),
                            candidate: config.name.clone(),
                            kind: ConflictKind::Setting { name: name.clone() },
                            via: None,
                        });
                        found_setting_conflict = true;
                    }
                }
            }

            if !found_setting_conflict
                && config.name == node.id
                && node.version_spec != version
                && !is_file_ref(&node.version_spec)
                && !is_file_ref(version)
            {
                conflicts.push(Conflict {
                    package: node.id.clone(),
                    candidate: config.name.clone(),
                    kind: ConflictKind::Version {
                        installed: node.version_spec.clone(),
                        installing: version.to_string(),
                    },
                    via: None,
                });
            }
        }

        conflicts
    }
}

/// Keep the first conflict per offending package
fn dedup_by_package(conflicts: Vec<Conflict>) -> Vec<Conflict> {
    let mut seen = HashSet::new();
    conflicts
        .into_iter()
        .filter(|c| seen.insert(c.package.clone()))
        .collect()
}

/// Errors worth skipping an inferred package for rather than failing
pub(crate) fn is_lookup_failure(error: &SprigError) -> bool {
    !matches!(error, SprigError::InvalidRule { .. } | SprigError::ConfigValidation { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PackageNode;
    use serde_json::json;
    use sprig_config::TargetConfig;
    use sprig_core::types::{FileMap, NativeBuild};
    use sprig_core::{CONFIG_NAME, ROOT_ID};
    use sprig_host::PackageSources;
    use std::sync::Arc;

    fn bundled(target: &mut TargetConfig, manifest: serde_json::Value) {
        let name = manifest["name"].as_str().unwrap().to_string();
        let mut files = FileMap::new();
        files.insert(CONFIG_NAME.to_string(), manifest.to_string());
        target.bundled_packages.insert(name, files);
    }

    fn resolver(target: TargetConfig) -> VersionResolver {
        VersionResolver::new(Arc::new(PackageSources::new(Arc::new(target)).unwrap()))
    }

    fn native(config: serde_json::Value, defaults: bool) -> Option<NativeBuild> {
        Some(NativeBuild {
            config: Some(config),
            config_is_just_defaults: defaults,
            ..Default::default()
        })
    }

    fn add(graph: &mut PackageGraph, id: &str, spec: &str, importer: &str, config: PackageConfig) {
        let level = graph.get(importer).unwrap().level;
        graph.insert(PackageNode::new(id, spec, importer, level));
        graph.get_mut(id).unwrap().config = Some(config);
        graph
            .get_mut(importer)
            .unwrap()
            .config
            .as_mut()
            .unwrap()
            .dependencies
            .insert(id.to_string(), spec.to_string());
    }

    fn base_graph() -> PackageGraph {
        let mut graph = PackageGraph::new();
        graph.root_mut().config = Some(PackageConfig::new("game"));
        graph
    }

    fn core_config(name: &str) -> PackageConfig {
        let mut cfg = PackageConfig::new(name);
        cfg.core = true;
        cfg
    }

    #[tokio::test]
    async fn test_core_conflict_is_symmetric() {
        let resolver = resolver(TargetConfig::new("t", "1.0.0"));
        let mut graph = base_graph();
        add(&mut graph, "a", "*", ROOT_ID, core_config("a"));
        add(&mut graph, "b", "*", ROOT_ID, core_config("b"));

        let detector = ConflictDetector::new(&graph, &resolver, ROOT_ID);

        let from_a = detector
            .find_conflicts(Candidate::Config(core_config("a")), "*")
            .await
            .unwrap();
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a[0].package, "b");
        assert_eq!(from_a[0].kind, ConflictKind::Core);

        let from_b = detector
            .find_conflicts(Candidate::Config(core_config("b")), "*")
            .await
            .unwrap();
        assert_eq!(from_b.len(), 1);
        assert_eq!(from_b[0].package, "a");
        assert_eq!(from_b[0].to_string(), "conflict between core packages b and a");
    }

    #[tokio::test]
    async fn test_setting_conflict_propagates_to_ancestors() {
        let resolver = resolver(TargetConfig::new("t", "1.0.0"));
        let mut graph = base_graph();

        add(&mut graph, "kit", "*", ROOT_ID, PackageConfig::new("kit"));
        let mut radio = PackageConfig::new("radio");
        radio.native_build = native(json!({"radio": {"enabled": 1}}), false);
        add(&mut graph, "radio", "*", "kit", radio);

        let mut ble = PackageConfig::new("ble");
        ble.native_build = native(json!({"radio": {"enabled": 0}}), false);

        let detector = ConflictDetector::new(&graph, &resolver, ROOT_ID);
        let conflicts = detector
            .find_conflicts(Candidate::Config(ble.clone()), "*")
            .await
            .unwrap();

        let packages: Vec<&str> = conflicts.iter().map(|c| c.package.as_str()).collect();
        assert_eq!(packages, vec!["radio", "kit"]);
        assert_eq!(conflicts[0].setting_name(), Some("radio.enabled"));
        assert_eq!(conflicts[1].setting_name(), Some("radio.enabled"));
        assert_eq!(conflicts[1].via.as_deref(), Some("radio"));

        // defaults never conflict
        ble.native_build = native(json!({"radio": {"enabled": 0}}), true);
        let conflicts = detector
            .find_conflicts(Candidate::Config(ble), "*")
            .await
            .unwrap();
        assert!(conflicts.is_empty());
    }

    #[tokio::test]
    async fn test_root_can_ignore_setting_conflicts() {
        let resolver = resolver(TargetConfig::new("t", "1.0.0"));
        let mut graph = base_graph();
        graph.root_mut().config.as_mut().unwrap().native_build = Some(NativeBuild {
            ignore_conflicts: true,
            ..Default::default()
        });

        let mut radio = PackageConfig::new("radio");
        radio.native_build = native(json!({"radio": {"enabled": 1}}), false);
        add(&mut graph, "radio", "*", ROOT_ID, radio);

        let mut ble = PackageConfig::new("ble");
        ble.native_build = native(json!({"radio": {"enabled": 0}}), false);

        let detector = ConflictDetector::new(&graph, &resolver, ROOT_ID);
        let conflicts = detector
            .find_conflicts(Candidate::Config(ble), "*")
            .await
            .unwrap();
        assert!(conflicts.is_empty());
    }

    #[tokio::test]
    async fn test_version_conflict() {
        let resolver = resolver(TargetConfig::new("t", "1.0.0"));
        let mut graph = base_graph();
        add(&mut graph, "lights", "acme/lights#v1", ROOT_ID, PackageConfig::new("lights"));

        let detector = ConflictDetector::new(&graph, &resolver, ROOT_ID);

        let conflicts = detector
            .find_conflicts(Candidate::Config(PackageConfig::new("lights")), "acme/lights#v2")
            .await
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].is_version_conflict());
        assert_eq!(
            conflicts[0].to_string(),
            "version mismatch for package lights (installed: acme/lights#v1, installing: acme/lights#v2)"
        );

        // local references are exempt
        let conflicts = detector
            .find_conflicts(Candidate::Config(PackageConfig::new("lights")), "file:../lights")
            .await
            .unwrap();
        assert!(conflicts.is_empty());
    }

    #[tokio::test]
    async fn test_candidate_dependencies_are_checked() {
        let mut target = TargetConfig::new("t", "1.0.0");
        bundled(&mut target, json!({"name": "board", "core": true, "dependencies": {}, "files": []}));
        bundled(
            &mut target,
            json!({"name": "shield", "dependencies": {"board": "*"}, "files": []}),
        );
        let resolver = resolver(target);

        let mut graph = base_graph();
        add(&mut graph, "core", "*", ROOT_ID, core_config("core"));

        let detector = ConflictDetector::new(&graph, &resolver, ROOT_ID);
        let conflicts = detector
            .find_conflicts(Candidate::Id("shield".to_string()), "*")
            .await
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].package, "core");
        assert_eq!(conflicts[0].candidate, "board");

        // unknown packages are a lookup failure
        let err = detector
            .find_conflicts(Candidate::Id("nope".to_string()), "*")
            .await
            .unwrap_err();
        assert!(is_lookup_failure(&err));
    }

    #[tokio::test]
    async fn test_candidate_cycle_terminates() {
        let mut target = TargetConfig::new("t", "1.0.0");
        bundled(&mut target, json!({"name": "ping", "dependencies": {"pong": "*"}, "files": []}));
        bundled(&mut target, json!({"name": "pong", "dependencies": {"ping": "*"}, "files": []}));
        let resolver = resolver(target);
        let graph = base_graph();

        let detector = ConflictDetector::new(&graph, &resolver, ROOT_ID);
        let conflicts = detector
            .find_conflicts(Candidate::Id("ping".to_string()), "*")
            .await
            .unwrap();
        assert!(conflicts.is_empty());
    }
}
