//! Error types for the canvas engine

use thiserror::Error;

use crate::attachments::Slot;
use crate::types::{NodeId, NodeKind};
use crate::validation::ValidationError;

/// Result type alias using CanvasError
pub type Result<T> = std::result::Result<T, CanvasError>;

/// Errors that can occur while editing a workflow graph
#[derive(Debug, Error)]
pub enum CanvasError {
    /// An edge endpoint does not reference a live node
    #[error("Dangling reference: node '{0}' does not exist")]
    DanglingReference(NodeId),

    /// The addressed node does not exist
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// The addressed node exists but is not an AI agent
    #[error("Node '{0}' is not an AI agent")]
    NotAnAgent(NodeId),

    /// A configuration update would change a node's kind
    #[error("Node '{node_id}' is a {found} node, cannot apply {expected} configuration")]
    KindMismatch {
        node_id: NodeId,
        expected: NodeKind,
        found: NodeKind,
    },

    /// A prompt form was given a record for another slot
    #[error("Prompt is for the {expected} slot, got a {found} record")]
    SlotMismatch { expected: Slot, found: Slot },

    /// No configuration prompt is open
    #[error("No configuration prompt is open")]
    NoActivePrompt,

    /// The open prompt is not attached to any AI agent
    #[error("Prompt is not attached to an AI agent")]
    PromptUnattached,

    /// A slot record was written with no edge backing it
    #[error("Agent '{agent_id}' has nothing connected to its {slot} slot")]
    SlotNotConnected { agent_id: NodeId, slot: Slot },

    /// An imported document failed structural validation
    #[error("Invalid workflow document: {} problem(s)", .0.len())]
    InvalidDocument(Vec<ValidationError>),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CanvasError {
    /// Create a dangling reference error for a node id
    pub fn dangling(node_id: impl Into<NodeId>) -> Self {
        Self::DanglingReference(node_id.into())
    }
}
