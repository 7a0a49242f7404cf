//! Graph validation for workflow documents
//!
//! Checks the invariants the editor maintains: unique ids, edges that
//! reference live nodes, and an attachment registry that mirrors the
//! slot edges of every agent.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::attachments::{AgentAttachment, AttachmentRegistry, Slot};
use crate::document::WorkflowDocument;
use crate::types::{GraphEdge, GraphNode, NodeId, NodeKind};

/// Validation error with location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Two nodes share an id
    DuplicateNodeId { node_id: String },
    /// Two edges share an id
    DuplicateEdgeId { edge_id: String },
    /// An edge references a non-existent node
    UnknownNode { edge_id: String, node_id: String },
    /// Attachments are recorded for something that is not a live agent
    AttachmentWithoutAgent { node_id: String },
    /// A slot has a record but nothing wired into its handle
    UnbackedSlot { agent_id: String, slot: Slot },
    /// Something is wired into a slot handle but no record exists
    UnrecordedSlot { agent_id: String, slot: Slot },
}

impl ValidationError {
    /// Structural errors break referential integrity and cannot be repaired
    /// by reconciling the registry
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateNodeId { .. } | Self::DuplicateEdgeId { .. } | Self::UnknownNode { .. }
        )
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateNodeId { node_id } => write!(f, "Duplicate node id '{}'", node_id),
            Self::DuplicateEdgeId { edge_id } => write!(f, "Duplicate edge id '{}'", edge_id),
            Self::UnknownNode { edge_id, node_id } => {
                write!(f, "Edge '{}' references unknown node '{}'", edge_id, node_id)
            }
            Self::AttachmentWithoutAgent { node_id } => {
                write!(f, "Attachments recorded for '{}', which is not an AI agent", node_id)
            }
            Self::UnbackedSlot { agent_id, slot } => {
                write!(f, "Agent '{}' has a {} record but nothing connected", agent_id, slot)
            }
            Self::UnrecordedSlot { agent_id, slot } => {
                write!(f, "Agent '{}' has a {} connection but no record", agent_id, slot)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a whole document
///
/// Returns all validation errors found (not just the first).
pub fn validate_document(document: &WorkflowDocument) -> Vec<ValidationError> {
    let mut errors = validate_graph(&document.nodes, &document.edges);
    errors.extend(validate_attachments(
        &document.nodes,
        &document.edges,
        &document.agent_attachments,
    ));
    errors
}

/// Check id uniqueness and that every edge endpoint exists
pub fn validate_graph(nodes: &[GraphNode], edges: &[GraphEdge]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut node_ids = HashSet::new();
    for node in nodes {
        if !node_ids.insert(node.id.as_str()) {
            errors.push(ValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }

    let mut edge_ids = HashSet::new();
    for edge in edges {
        if !edge_ids.insert(edge.id.as_str()) {
            errors.push(ValidationError::DuplicateEdgeId {
                edge_id: edge.id.clone(),
            });
        }
        for endpoint in [&edge.source, &edge.target] {
            if !node_ids.contains(endpoint.as_str()) {
                errors.push(ValidationError::UnknownNode {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
    }

    errors
}

/// Check that every agent's records match its slot edges exactly
///
/// Only an edge from a resource of the slot's kind counts as a connection.
pub fn validate_attachments(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    attachments: &BTreeMap<NodeId, AgentAttachment>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let kinds: HashMap<&str, NodeKind> = nodes.iter().map(|n| (n.id.as_str(), n.kind())).collect();

    for agent_id in attachments.keys() {
        if kinds.get(agent_id.as_str()) != Some(&NodeKind::AiAgent) {
            errors.push(ValidationError::AttachmentWithoutAgent {
                node_id: agent_id.clone(),
            });
        }
    }

    for node in nodes.iter().filter(|n| n.is_agent()) {
        let attachment = attachments.get(&node.id);
        for slot in Slot::ALL {
            let recorded = attachment.is_some_and(|a| a.has(slot));
            let backed = AttachmentRegistry::is_backed(&node.id, slot, nodes, edges);
            match (recorded, backed) {
                (true, false) => errors.push(ValidationError::UnbackedSlot {
                    agent_id: node.id.clone(),
                    slot,
                }),
                (false, true) => errors.push(ValidationError::UnrecordedSlot {
                    agent_id: node.id.clone(),
                    slot,
                }),
                _ => {}
            }
        }
    }

    errors
}
