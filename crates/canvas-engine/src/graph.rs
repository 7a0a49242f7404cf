//! Graph store - the canonical node and edge sets
//!
//! The store is the only owner of nodes and edges. Every mutation keeps
//! the referential integrity invariant: each edge's `source` and `target`
//! name a node that is currently present.

use std::collections::HashSet;

use crate::error::{CanvasError, Result};
use crate::types::{EdgeId, GraphEdge, GraphNode, NodeId, NodeKind, Position};

/// Canonical set of nodes and edges
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl GraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from parts that are already known to be consistent
    pub(crate) fn from_parts(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self { nodes, edges }
    }

    /// Insert a node of `kind` with default configuration and return its id
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        position: Position,
    ) -> NodeId {
        let id = self.fresh_id(kind.as_str());
        self.insert_node(GraphNode::new(id.clone(), kind, label, position));
        id
    }

    /// Insert a prepared node
    ///
    /// Callers must ensure the id is not already taken.
    pub(crate) fn insert_node(&mut self, node: GraphNode) {
        log::debug!("Added {} node '{}'", node.kind(), node.id);
        self.nodes.push(node);
    }

    /// Connect two live nodes and return the new edge id
    ///
    /// Duplicate connections are allowed.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        source_handle: Option<&str>,
        target_handle: Option<&str>,
    ) -> Result<EdgeId> {
        let id = self.fresh_id("edge");
        self.add_edge_with_id(id, source, target, source_handle, target_handle)
    }

    /// Connect two live nodes using an explicit edge id
    pub(crate) fn add_edge_with_id(
        &mut self,
        id: EdgeId,
        source: &str,
        target: &str,
        source_handle: Option<&str>,
        target_handle: Option<&str>,
    ) -> Result<EdgeId> {
        for endpoint in [source, target] {
            if !self.contains_node(endpoint) {
                return Err(CanvasError::dangling(endpoint));
            }
        }

        log::debug!(
            "Added edge '{}': {}.{} -> {}.{}",
            id,
            source,
            source_handle.unwrap_or("*"),
            target,
            target_handle.unwrap_or("*")
        );
        self.edges.push(GraphEdge {
            id: id.clone(),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: source_handle.map(str::to_string),
            target_handle: target_handle.map(str::to_string),
        });
        Ok(id)
    }

    /// Remove a node and every edge touching it
    ///
    /// Removing an absent node is a no-op. Returns the removed node (if
    /// any) and the removed edges.
    pub fn remove_node(&mut self, node_id: &str) -> (Option<GraphNode>, Vec<GraphEdge>) {
        let Some(pos) = self.nodes.iter().position(|n| n.id == node_id) else {
            return (None, Vec::new());
        };
        let node = self.nodes.remove(pos);
        let edges = self.remove_edges(|e| e.touches(node_id));
        log::debug!("Removed node '{}' and {} edge(s)", node_id, edges.len());
        (Some(node), edges)
    }

    /// Remove a set of nodes, then drop every edge touching any of them in one pass
    pub fn remove_nodes(&mut self, node_ids: &HashSet<&str>) -> (Vec<GraphNode>, Vec<GraphEdge>) {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.nodes)
            .into_iter()
            .partition(|n| node_ids.contains(n.id.as_str()));
        self.nodes = kept;

        let edges = self.remove_edges(|e| {
            node_ids.contains(e.source.as_str()) || node_ids.contains(e.target.as_str())
        });
        if !removed.is_empty() {
            log::debug!("Removed {} node(s) and {} edge(s)", removed.len(), edges.len());
        }
        (removed, edges)
    }

    /// Remove every edge matching `predicate`, returning what was removed
    pub fn remove_edges<F>(&mut self, mut predicate: F) -> Vec<GraphEdge>
    where
        F: FnMut(&GraphEdge) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.edges).into_iter().partition(|e| predicate(e));
        self.edges = kept;
        removed
    }

    /// All nodes, in insertion order
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// All edges, in insertion order
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a node by ID (mutable)
    ///
    /// Only identity-preserving edits go through here; ids and kinds are
    /// guarded by the editor.
    pub(crate) fn find_node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Find an edge by ID
    pub fn find_edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.find_node(id).is_some()
    }

    /// Kind of a live node
    pub fn node_kind(&self, id: &str) -> Option<NodeKind> {
        self.find_node(id).map(GraphNode::kind)
    }

    /// Edges leaving a node
    pub fn edges_from<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Edges entering a node
    pub fn edges_into<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Edges landing on a specific handle of a node
    pub fn edges_into_handle<'a>(
        &'a self,
        node_id: &'a str,
        handle: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.targets_handle(node_id, handle))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn fresh_id(&self, prefix: &str) -> String {
        loop {
            let id = format!("{}-{}", prefix, uuid::Uuid::new_v4());
            if !self.contains_node(&id) && self.find_edge(&id).is_none() {
                return id;
            }
        }
    }
}
