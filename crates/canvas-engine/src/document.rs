//! The exported workflow document
//!
//! This is the plain serializable form of an editor: nodes, edges and
//! agent attachments. It has no schema version; the shape is always the
//! current one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attachments::AgentAttachment;
use crate::error::Result;
use crate::types::{GraphEdge, GraphNode, NodeId, NodeKind, Position};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub agent_attachments: BTreeMap<NodeId, AgentAttachment>,
}

impl WorkflowDocument {
    /// The workflow a new canvas starts with: a chat trigger feeding an agent
    pub fn starter() -> Self {
        Self {
            nodes: vec![
                GraphNode::new(
                    "trigger-1",
                    NodeKind::Trigger,
                    "When chat message received",
                    Position::new(160.0, 240.0),
                ),
                GraphNode::new(
                    "agent-1",
                    NodeKind::AiAgent,
                    "AI Agent",
                    Position::new(520.0, 240.0),
                ),
            ],
            edges: vec![GraphEdge {
                id: "e1-2".to_string(),
                source: "trigger-1".to_string(),
                target: "agent-1".to_string(),
                source_handle: None,
                target_handle: None,
            }],
            agent_attachments: BTreeMap::new(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_starter_shape() {
        let doc = WorkflowDocument::starter();
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.edges.len(), 1);
        assert_eq!(doc.nodes[1].kind(), NodeKind::AiAgent);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value["edges"][0],
            json!({"id": "e1-2", "source": "trigger-1", "target": "agent-1"})
        );
        assert_eq!(value["nodes"][0]["triggerType"], json!("manual"));
        assert_eq!(value["agentAttachments"], json!({}));
    }

    #[test]
    fn test_json_round_trip() {
        let doc = WorkflowDocument::starter();
        let parsed = WorkflowDocument::from_json(&doc.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_missing_attachments_default_to_empty() {
        let doc = WorkflowDocument::from_json(r#"{"nodes": [], "edges": []}"#).unwrap();
        assert!(doc.agent_attachments.is_empty());
    }
}
