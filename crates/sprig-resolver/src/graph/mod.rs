//! Package graph of one resolution session
//!
//! The graph is a flat table keyed by package id. Nodes refer to the
//! packages that imported them by id only, so a package reached through
//! several import paths is one node with several importers.

use std::collections::HashSet;

use indexmap::IndexMap;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use sprig_core::types::{PackageConfig, PackageRef};
use sprig_core::ROOT_ID;

/// Spec of the root package
pub const ROOT_SPEC: &str = "file:.";

/// One package of the session
#[derive(Debug, Clone, PartialEq)]
pub struct PackageNode {
    pub id: String,
    /// Version string as requested by the first importer
    pub version_spec: String,
    /// Version actually used, once determined
    pub resolved_version: Option<String>,
    /// Ids of the importers, in discovery order, without duplicates
    pub added_by: Vec<String>,
    /// Shortest known import depth; the root is 0
    pub level: usize,
    pub config: Option<PackageConfig>,
    pub is_loaded: bool,
}

/// Row of the dependency listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEntry {
    pub id: String,
    pub version: String,
    pub level: usize,
    pub added_by: Vec<String>,
}

impl PackageNode {
    /// The root package of a session
    pub fn root() -> Self {
        Self {
            id: ROOT_ID.to_string(),
            version_spec: ROOT_SPEC.to_string(),
            resolved_version: None,
            added_by: Vec::new(),
            level: 0,
            config: None,
            is_loaded: false,
        }
    }

    /// A dependency first seen while loading `importer`
    pub fn new(
        id: impl Into<String>,
        version_spec: impl Into<String>,
        importer: impl Into<String>,
        importer_level: usize,
    ) -> Self {
        Self {
            id: id.into(),
            version_spec: version_spec.into(),
            resolved_version: None,
            added_by: vec![importer.into()],
            level: importer_level + 1,
            config: None,
            is_loaded: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.level == 0 && self.id == ROOT_ID
    }

    /// Resolved version if known, otherwise the requested spec
    pub fn version(&self) -> &str {
        self.resolved_version.as_deref().unwrap_or(&self.version_spec)
    }

    /// Handle used to address this package through a host
    pub fn package_ref(&self) -> PackageRef {
        PackageRef::new(self.id.clone(), self.version(), self.is_root())
    }

    /// Record another importer; the level never increases
    pub fn add_importer(&mut self, importer: &str, importer_level: usize) {
        if !self.added_by.iter().any(|a| a == importer) {
            self.added_by.push(importer.to_string());
        }
        self.level = self.level.min(importer_level + 1);
    }

    /// Declared dependency ids, sorted
    pub fn sorted_dependency_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .config
            .as_ref()
            .map(|c| c.dependencies.keys().map(String::as_str).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }
}

/// Flat id-keyed table of the packages of one session
#[derive(Debug, Clone)]
pub struct PackageGraph {
    nodes: IndexMap<String, PackageNode>,
}

impl PackageGraph {
    /// A graph holding only the root
    pub fn new() -> Self {
        let mut nodes = IndexMap::new();
        nodes.insert(ROOT_ID.to_string(), PackageNode::root());
        Self { nodes }
    }

    pub fn root(&self) -> &PackageNode {
        &self.nodes[0]
    }

    pub fn root_mut(&mut self) -> &mut PackageNode {
        &mut self.nodes[0]
    }

    pub fn get(&self, id: &str) -> Option<&PackageNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut PackageNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of packages, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in discovery order, root first
    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.nodes.values()
    }

    /// Register a node unless its id is already taken. Returns whether the
    /// node was inserted.
    pub fn insert(&mut self, node: PackageNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Record that `importer` also imports `id`, lowering levels below `id`
    /// if this path is shorter
    pub fn add_importer(&mut self, id: &str, importer: &str) {
        let Some(importer_level) = self.nodes.get(importer).map(|n| n.level) else {
            return;
        };
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };

        let before = node.level;
        node.add_importer(importer, importer_level);
        if node.level < before {
            self.propagate_level(id);
        }
    }

    /// Push a lowered level down to already loaded dependencies
    fn propagate_level(&mut self, id: &str) {
        let mut worklist = vec![id.to_string()];

        while let Some(current) = worklist.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            let level = node.level;
            let deps: Vec<String> = node
                .config
                .as_ref()
                .map(|c| c.dependencies.keys().cloned().collect())
                .unwrap_or_default();

            for dep in deps {
                if let Some(child) = self.nodes.get_mut(&dep) {
                    if child.added_by.contains(&current) && level + 1 < child.level {
                        child.level = level + 1;
                        worklist.push(dep);
                    }
                }
            }
        }
    }

    /// Every transitive importer of `id`, nearest last, skipping `exclude`
    pub fn ancestors(&self, id: &str, exclude: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_ancestors(id, exclude, &mut seen, &mut out);
        out
    }

    fn collect_ancestors(
        &self,
        id: &str,
        exclude: &str,
        seen: &mut HashSet<String>,
        out: &mut Vec<String>,
    ) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        for importer in &node.added_by {
            if importer == exclude || !seen.insert(importer.clone()) {
                continue;
            }
            self.collect_ancestors(importer, exclude, seen, out);
            out.push(importer.clone());
        }
    }

    /// Build order: depth-first post-order from the root, visiting
    /// dependencies in lexicographic order. Only loaded packages appear;
    /// the root comes last.
    pub fn sorted_deps(&self) -> Vec<&PackageNode> {
        let mut visited = HashSet::new();
        let mut out = Vec::new();
        self.visit(ROOT_ID, &mut visited, &mut out);
        out
    }

    fn visit<'a>(
        &'a self,
        id: &str,
        visited: &mut HashSet<String>,
        out: &mut Vec<&'a PackageNode>,
    ) {
        if !visited.insert(id.to_string()) {
            return;
        }
        let Some(node) = self.nodes.get(id) else {
            return;
        };

        for dep in node.sorted_dependency_ids() {
            self.visit(dep, visited, out);
        }
        if node.config.is_some() {
            out.push(node);
        }
    }

    /// Package listing in discovery order
    pub fn dependency_tree(&self) -> Vec<DependencyEntry> {
        self.nodes
            .values()
            .map(|n| DependencyEntry {
                id: n.id.clone(),
                version: n.version().to_string(),
                level: n.level,
                added_by: n.added_by.clone(),
            })
            .collect()
    }

    /// Import graph in Graphviz DOT format, edges point from importer to
    /// dependency
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut indices: IndexMap<&str, NodeIndex> = IndexMap::new();

        for node in self.nodes.values() {
            let label = format!("{}@{}", node.id, node.version());
            indices.insert(node.id.as_str(), graph.add_node(label));
        }
        for node in self.nodes.values() {
            for importer in &node.added_by {
                if let (Some(&from), Some(&to)) =
                    (indices.get(importer.as_str()), indices.get(node.id.as_str()))
                {
                    graph.add_edge(from, to, ());
                }
            }
        }

        format!("{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}

impl Default for PackageGraph {
    fn default() -> Self {
        Self::new()
    }
}
