//! Core types for workflow graphs
//!
//! These types define the structure of the canvas graph: typed nodes
//! with kind-specific configuration, and directed edges between node
//! handles.

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Named connection points on nodes
pub mod handles {
    /// Side input port
    pub const IN: &str = "in";
    /// Side output port (also the port child resources feed agents from)
    pub const OUT: &str = "out";
    /// Agent port for the chat model resource
    pub const MODEL: &str = "model";
    /// Agent port for the memory resource
    pub const MEMORY: &str = "memory";
    /// Agent port for the tool resource
    pub const TOOL: &str = "tool";
}

/// The closed set of node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// Entry point of a workflow
    Trigger,
    /// Calls an external app
    Action,
    /// Branching or merging
    Logic,
    /// Chat model resource attached to an agent
    AiModel,
    /// Tool resource attached to an agent
    Tool,
    /// AI agent with model/memory/tool ports
    AiAgent,
    /// Memory resource attached to an agent
    Memory,
}

impl NodeKind {
    /// All kinds, in palette order
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Trigger,
        NodeKind::Action,
        NodeKind::Logic,
        NodeKind::AiModel,
        NodeKind::Tool,
        NodeKind::AiAgent,
        NodeKind::Memory,
    ];

    /// Whether nodes of this kind are sub-resources that attach to an agent
    pub fn is_agent_resource(&self) -> bool {
        matches!(self, NodeKind::AiModel | NodeKind::Memory | NodeKind::Tool)
    }

    /// The wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Action => "action",
            NodeKind::Logic => "logic",
            NodeKind::AiModel => "aiModel",
            NodeKind::Tool => "tool",
            NodeKind::AiAgent => "aiAgent",
            NodeKind::Memory => "memory",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown node kind: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    Webhook,
    Cron,
    #[default]
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicMode {
    #[default]
    If,
    Switch,
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    OpenAi,
    Azure,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    #[default]
    Buffer,
    Vector,
}

/// Kind-specific configuration of a node
///
/// The variant is the node's kind; fields of one kind never appear on
/// another. Serialized inline with the node under a `kind` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeConfig {
    #[serde(rename_all = "camelCase")]
    Trigger { trigger_type: TriggerType },

    #[serde(rename_all = "camelCase")]
    Action { app: String, operation: String },

    #[serde(rename_all = "camelCase")]
    Logic {
        mode: LogicMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expression: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    AiModel {
        provider: ModelProvider,
        model_name: String,
        temperature: f64,
    },

    #[serde(rename_all = "camelCase")]
    Tool { tool_name: String },

    #[serde(rename_all = "camelCase")]
    AiAgent {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        system_prompt: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    Memory {
        memory_type: MemoryType,
        store_name: String,
    },
}

impl NodeConfig {
    /// Default configuration for a freshly created node of `kind`
    pub fn default_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Trigger => NodeConfig::Trigger {
                trigger_type: TriggerType::default(),
            },
            NodeKind::Action => NodeConfig::Action {
                app: String::new(),
                operation: String::new(),
            },
            NodeKind::Logic => NodeConfig::Logic {
                mode: LogicMode::default(),
                expression: None,
            },
            NodeKind::AiModel => NodeConfig::AiModel {
                provider: ModelProvider::default(),
                model_name: "gpt-4o".to_string(),
                temperature: 0.7,
            },
            NodeKind::Tool => NodeConfig::Tool {
                tool_name: String::new(),
            },
            NodeKind::AiAgent => NodeConfig::AiAgent { system_prompt: None },
            NodeKind::Memory => NodeConfig::Memory {
                memory_type: MemoryType::default(),
                store_name: String::new(),
            },
        }
    }

    /// The kind this configuration belongs to
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Trigger { .. } => NodeKind::Trigger,
            NodeConfig::Action { .. } => NodeKind::Action,
            NodeConfig::Logic { .. } => NodeKind::Logic,
            NodeConfig::AiModel { .. } => NodeKind::AiModel,
            NodeConfig::Tool { .. } => NodeKind::Tool,
            NodeConfig::AiAgent { .. } => NodeKind::AiAgent,
            NodeConfig::Memory { .. } => NodeKind::Memory,
        }
    }
}

/// Position on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// This position shifted by (dx, dy)
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Display label
    pub label: String,
    /// Optional free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Position in the UI
    pub position: Position,
    /// Kind tag plus kind-specific fields
    #[serde(flatten)]
    pub config: NodeConfig,
}

impl GraphNode {
    /// Create a node of `kind` with default configuration
    pub fn new(
        id: impl Into<NodeId>,
        kind: NodeKind,
        label: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            position,
            config: NodeConfig::default_for(kind),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }

    pub fn is_agent(&self) -> bool {
        self.kind() == NodeKind::AiAgent
    }
}

/// A directed edge between two node handles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Source node ID
    pub source: NodeId,
    /// Target node ID
    pub target: NodeId,
    /// Source port, if the connection names one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Target port, if the connection names one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl GraphEdge {
    /// Whether either endpoint is `node_id`
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// Whether this edge lands on the given handle of `node_id`
    pub fn targets_handle(&self, node_id: &str, handle: &str) -> bool {
        self.target == node_id && self.target_handle.as_deref() == Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_kind_round_trips_through_str() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>().unwrap(), kind);
        }
        assert!("agent".parse::<NodeKind>().is_err());
    }

    #[test]
    fn test_default_config_matches_kind() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeConfig::default_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_agent_resource_kinds() {
        assert!(NodeKind::AiModel.is_agent_resource());
        assert!(NodeKind::Memory.is_agent_resource());
        assert!(NodeKind::Tool.is_agent_resource());
        assert!(!NodeKind::AiAgent.is_agent_resource());
        assert!(!NodeKind::Trigger.is_agent_resource());
    }

    #[test]
    fn test_node_serializes_kind_fields_inline() {
        let node = GraphNode::new("m1", NodeKind::AiModel, "Chat Model", Position::new(10.0, 20.0));
        let value = serde_json::to_value(&node).unwrap();

        assert_eq!(
            value,
            json!({
                "id": "m1",
                "label": "Chat Model",
                "position": {"x": 10.0, "y": 20.0},
                "kind": "aiModel",
                "provider": "openai",
                "modelName": "gpt-4o",
                "temperature": 0.7
            })
        );

        let back: GraphNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_edge_omits_absent_handles() {
        let edge = GraphEdge {
            id: "e1".to_string(),
            source: "a".to_string(),
            target: "b".to_string(),
            source_handle: None,
            target_handle: Some(handles::TOOL.to_string()),
        };
        let value = serde_json::to_value(&edge).unwrap();
        assert_eq!(
            value,
            json!({"id": "e1", "source": "a", "target": "b", "targetHandle": "tool"})
        );
        assert!(edge.targets_handle("b", handles::TOOL));
        assert!(!edge.targets_handle("b", handles::MODEL));
        assert!(edge.touches("a"));
    }
}
