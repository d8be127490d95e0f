//! Dependency graph construction and traversal.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use pinset_core::name::{normalize, PackageName};
use pinset_core::version::Version;

/// A node in the resolved dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: PackageName,
    pub version: Version,
}

impl ResolvedPackage {
    /// Normalized name; unique within a graph.
    pub fn key(&self) -> &str {
        self.name.normalized()
    }
}

impl fmt::Display for ResolvedPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

/// A resolved dependency graph backed by petgraph.
///
/// Nodes keep first-discovery order and edges keep insertion order, so every
/// rendering of the graph is deterministic.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<ResolvedPackage, ()>,
    /// Lookup from normalized name to node index.
    index: HashMap<String, NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or retrieve a node. If the name already exists, returns the existing index.
    pub fn add_node(&mut self, package: ResolvedPackage) -> NodeIndex {
        if let Some(&idx) = self.index.get(package.key()) {
            return idx;
        }
        let key = package.key().to_string();
        let idx = self.graph.add_node(package);
        self.index.insert(key, idx);
        idx
    }

    /// Mark a node as introduced by a root requirement.
    pub fn add_root(&mut self, idx: NodeIndex) {
        if !self.roots.contains(&idx) {
            self.roots.push(idx);
        }
    }

    /// Add a dependency edge from `from` to `to`. Repeated edges are stored once.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Look up a node by any spelling of the package name.
    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(&normalize(name)).copied()
    }

    /// Get the package for an index.
    pub fn node(&self, idx: NodeIndex) -> &ResolvedPackage {
        &self.graph[idx]
    }

    /// All resolved packages in first-discovery order.
    pub fn nodes(&self) -> Vec<&ResolvedPackage> {
        self.graph.node_indices().map(|idx| &self.graph[idx]).collect()
    }

    /// Nodes introduced by root requirements, in order.
    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    /// Direct dependencies of a node in the order the edges were added.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(idx, Direction::Outgoing)
    }

    /// Reverse dependencies (who depends on this node), oldest edge first.
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(idx, Direction::Incoming)
    }

    // petgraph walks adjacency lists newest-first; sort by edge id to restore
    // insertion order.
    fn neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.id(), other)
            })
            .collect();
        edges.sort_by_key(|(id, _)| id.index());
        edges.into_iter().map(|(_, other)| other).collect()
    }

    /// `name==version` for every package, in first-discovery order.
    pub fn to_flat_list(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .map(|idx| self.graph[idx].to_string())
            .collect()
    }

    /// `name==version` mapped to its direct dependencies. Leaves map to an
    /// empty list; keys are in first-discovery order.
    pub fn to_adjacency(&self) -> IndexMap<String, Vec<String>> {
        self.graph
            .node_indices()
            .map(|idx| {
                let deps = self
                    .dependencies_of(idx)
                    .into_iter()
                    .map(|dep| self.graph[dep].to_string())
                    .collect();
                (self.graph[idx].to_string(), deps)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
