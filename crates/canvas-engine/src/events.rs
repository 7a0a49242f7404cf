//! Event types for observing editor state changes
//!
//! Events are sent from the editor to the presentation layer (or any
//! consumer) after each mutation has been fully applied.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attachments::Slot;
use crate::types::{EdgeId, NodeId, NodeKind};

/// Receiver for editor events
///
/// Hosts implement this for whatever carries events to the canvas
/// (a UI channel or a test recorder).
pub trait EventSink: Send + Sync {
    /// Deliver one event; an error is reported but never undoes the edit
    fn send(&self, event: EditorEvent) -> Result<(), EventError>;
}

/// Why an event could not be delivered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The receiving side has gone away
    #[error("Event receiver disconnected")]
    Disconnected,

    /// The receiver refused the event
    #[error("Event rejected: {0}")]
    Rejected(String),
}

/// Events emitted by the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    /// A node was added to the graph
    #[serde(rename_all = "camelCase")]
    NodeAdded { node_id: NodeId, kind: NodeKind },

    /// A node's label, description, position or configuration changed
    #[serde(rename_all = "camelCase")]
    NodeUpdated { node_id: NodeId },

    /// Nodes were removed from the graph
    #[serde(rename_all = "camelCase")]
    NodesRemoved { node_ids: Vec<NodeId> },

    /// An edge was added
    #[serde(rename_all = "camelCase")]
    EdgeAdded {
        edge_id: EdgeId,
        source: NodeId,
        target: NodeId,
    },

    /// Edges were removed
    #[serde(rename_all = "camelCase")]
    EdgesRemoved { edge_ids: Vec<EdgeId> },

    /// A slot record was written
    #[serde(rename_all = "camelCase")]
    SlotUpdated { agent_id: NodeId, slot: Slot },

    /// A slot record was removed
    #[serde(rename_all = "camelCase")]
    SlotCleared { agent_id: NodeId, slot: Slot },

    /// All attachment state of an agent was removed
    #[serde(rename_all = "camelCase")]
    AgentCleared { agent_id: NodeId },

    /// Selection changed
    #[serde(rename_all = "camelCase")]
    SelectionChanged {
        node_id: Option<NodeId>,
        edge_ids: Vec<EdgeId>,
    },

    /// A configuration prompt was opened
    #[serde(rename_all = "camelCase")]
    PromptOpened {
        slot: Slot,
        agent_id: Option<NodeId>,
        node_id: Option<NodeId>,
    },

    /// The configuration prompt was closed
    PromptClosed,

    /// The workflow was handed to a save callback
    #[serde(rename_all = "camelCase")]
    WorkflowSaved { node_count: usize, edge_count: usize },
}

/// Sink for hosts that do not observe the editor
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: EditorEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Records every event in order
pub struct VecEventSink {
    events: Mutex<Vec<EditorEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<EditorEvent> {
        self.lock().clone()
    }

    /// Take the recorded events, leaving the sink empty
    pub fn drain(&self) -> Vec<EditorEvent> {
        std::mem::take(&mut *self.lock())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<EditorEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: EditorEvent) -> Result<(), EventError> {
        self.lock().push(event);
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn send(&self, event: EditorEvent) -> Result<(), EventError> {
        (**self).send(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_keeps_order() {
        let sink = VecEventSink::new();
        sink.send(EditorEvent::SlotUpdated {
            agent_id: "a1".to_string(),
            slot: Slot::Tool,
        })
        .unwrap();
        sink.send(EditorEvent::PromptClosed).unwrap();

        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(
            &drained[0],
            EditorEvent::SlotUpdated { agent_id, slot: Slot::Tool } if agent_id == "a1"
        ));
        assert_eq!(drained[1], EditorEvent::PromptClosed);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_shared_sink_through_arc() {
        let sink = Arc::new(VecEventSink::new());
        let handle: Box<dyn EventSink> = Box::new(sink.clone());
        handle.send(EditorEvent::AgentCleared { agent_id: "a1".to_string() }).unwrap();
        assert_eq!(sink.events().len(), 1);

        assert!(NullEventSink.send(EditorEvent::PromptClosed).is_ok());
    }

    #[test]
    fn test_event_wire_shape() {
        let event = EditorEvent::PromptOpened {
            slot: Slot::ChatModel,
            agent_id: Some("a1".to_string()),
            node_id: None,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({
                "type": "promptOpened",
                "slot": "chatModel",
                "agentId": "a1",
                "nodeId": null
            })
        );
        assert_eq!(EventError::Disconnected.to_string(), "Event receiver disconnected");
    }
}
