//! Deletion coordinator
//!
//! Removes nodes and edges and cascades the cleanup into the attachment
//! registry and the selection state, so that no step of a deletion is
//! ever observable on its own.
//!
//! Cascade order for nodes:
//! 1. Agents being deleted lose their whole registry entry.
//! 2. Nodes and every edge touching them are removed in one pass.
//! 3. Agents that lost a slot edge have their now-unbacked slots cleared.
//!    The lost edges are exactly the edges the deleted children fed their
//!    agents through before removal.
//! 4. Selection and prompt drop references to anything removed.
//!
//! Edge-only deletion follows step 3 as well: a slot is cleared as soon as
//! nothing is wired into its handle anymore.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::attachments::{AttachmentRegistry, Slot};
use crate::graph::GraphStore;
use crate::selection::{PromptTransition, Selection, SelectionController};
use crate::types::{EdgeId, GraphEdge, NodeId, NodeKind};

/// Everything a deletion removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Nodes removed from the graph
    pub removed_nodes: Vec<NodeId>,
    /// Edges removed, including cascaded ones
    pub removed_edges: Vec<EdgeId>,
    /// Slots cleared on surviving agents
    pub cleared_slots: Vec<(NodeId, Slot)>,
    /// Agents whose entire attachment entry was dropped
    pub cleared_agents: Vec<NodeId>,
    /// Whether the selection changed
    pub selection_changed: bool,
    /// Whether an open prompt was closed
    pub prompt_closed: bool,
}

impl DeletionReport {
    /// True when the deletion had no effect
    pub fn is_empty(&self) -> bool {
        self.removed_nodes.is_empty()
            && self.removed_edges.is_empty()
            && self.cleared_slots.is_empty()
            && self.cleared_agents.is_empty()
    }

    fn record_forget(&mut self, selection: &mut SelectionController) {
        let (changed, transition) = selection.forget(&self.removed_nodes, &self.removed_edges);
        self.selection_changed |= changed;
        self.prompt_closed |= transition == PromptTransition::Closed;
    }
}

/// Delete whatever is selected
///
/// A selected node is deleted with full cascade; selected edges are
/// removed exactly. Either way the selection ends up empty.
pub fn delete_selection(
    selection: &mut SelectionController,
    graph: &mut GraphStore,
    registry: &mut AttachmentRegistry,
) -> DeletionReport {
    let mut report = match selection.selection().clone() {
        Selection::Node(node_id) => delete_nodes(&[node_id], selection, graph, registry),
        Selection::Edges(edge_ids) => delete_edges(&edge_ids, selection, graph, registry),
        Selection::None => return DeletionReport::default(),
    };

    if !selection.selection().is_empty() {
        report.selection_changed = true;
        report.prompt_closed |= selection.clear() == PromptTransition::Closed;
    }
    report
}

/// Delete a set of nodes with full cascade
///
/// Absent ids are ignored, so repeating a deletion is harmless.
pub fn delete_nodes(
    node_ids: &[NodeId],
    selection: &mut SelectionController,
    graph: &mut GraphStore,
    registry: &mut AttachmentRegistry,
) -> DeletionReport {
    let mut report = DeletionReport::default();
    let targets: HashSet<&str> = node_ids
        .iter()
        .map(String::as_str)
        .filter(|id| graph.contains_node(id))
        .collect();
    if targets.is_empty() {
        return report;
    }

    for id in &targets {
        if graph.node_kind(id) == Some(NodeKind::AiAgent) && registry.clear_agent(id) {
            report.cleared_agents.push(id.to_string());
        }
    }

    let (nodes, edges) = graph.remove_nodes(&targets);
    report.removed_nodes = nodes.into_iter().map(|n| n.id).collect();
    report.cleared_slots = prune_after_edge_loss(&edges, graph, registry);
    report.removed_edges = edges.into_iter().map(|e| e.id).collect();

    report.record_forget(selection);
    report
}

/// Delete exactly the given edges
pub fn delete_edges(
    edge_ids: &[EdgeId],
    selection: &mut SelectionController,
    graph: &mut GraphStore,
    registry: &mut AttachmentRegistry,
) -> DeletionReport {
    let mut report = DeletionReport::default();
    let edges = graph.remove_edges(|e| edge_ids.contains(&e.id));
    if edges.is_empty() {
        return report;
    }
    log::debug!("Removed {} edge(s)", edges.len());

    report.cleared_slots = prune_after_edge_loss(&edges, graph, registry);
    report.removed_edges = edges.into_iter().map(|e| e.id).collect();
    report.record_forget(selection);
    report
}

/// Clear slots of surviving agents that `removed` edges used to back
pub(crate) fn prune_after_edge_loss(
    removed: &[GraphEdge],
    graph: &GraphStore,
    registry: &mut AttachmentRegistry,
) -> Vec<(NodeId, Slot)> {
    let mut agents: Vec<&str> = Vec::new();
    for edge in removed {
        let feeds_slot = edge.target_handle.as_deref().and_then(Slot::from_handle).is_some();
        let agent_alive = graph.node_kind(&edge.target) == Some(NodeKind::AiAgent);
        if feeds_slot && agent_alive && !agents.contains(&edge.target.as_str()) {
            agents.push(&edge.target);
        }
    }

    agents
        .into_iter()
        .flat_map(|agent_id| {
            registry
                .prune_unbacked(agent_id, graph.nodes(), graph.edges())
                .into_iter()
                .map(move |slot| (agent_id.to_string(), slot))
        })
        .collect()
}

/// Whether a key name triggers deletion
pub fn is_delete_key(key: &str) -> bool {
    matches!(key, "Delete" | "Backspace")
}

/// Swallows key repeats that arrive within a short window
///
/// Ignored presses do not extend the window.
#[derive(Debug, Clone)]
pub struct KeyRepeatGuard {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl KeyRepeatGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Decide whether a press at `at` should be acted on
    pub fn admit(&mut self, at: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if at.saturating_duration_since(last) < self.window {
                log::trace!("Ignored key repeat within {:?}", self.window);
                return false;
            }
        }
        self.last_accepted = Some(at);
        true
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
