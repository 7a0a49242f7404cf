//! Agent attachment registry
//!
//! An AI agent node exposes three bottom ports (`model`, `memory`, `tool`).
//! Whatever feeds one of those ports is the agent's sub-resource for that
//! slot, and the user-entered configuration for it is kept here, keyed by
//! agent id.
//!
//! Slot presence is a fact of graph topology. The registry stores the
//! configuration records, while owner and child lookups are always
//! recomputed from the live nodes and edges so they cannot drift from them.
//! An edge backs a slot only when its source is a resource of that slot's
//! kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{handles, GraphEdge, GraphNode, NodeId, NodeKind};

/// One of the three sub-resource slots of an AI agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    ChatModel,
    Memory,
    Tool,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::ChatModel, Slot::Memory, Slot::Tool];

    /// The agent handle this slot is wired through
    pub fn handle(&self) -> &'static str {
        match self {
            Slot::ChatModel => handles::MODEL,
            Slot::Memory => handles::MEMORY,
            Slot::Tool => handles::TOOL,
        }
    }

    /// Resolve an agent handle name to its slot
    pub fn from_handle(handle: &str) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| slot.handle() == handle)
    }

    /// The node kind that provides this slot's resource
    pub fn resource_kind(&self) -> NodeKind {
        match self {
            Slot::ChatModel => NodeKind::AiModel,
            Slot::Memory => NodeKind::Memory,
            Slot::Tool => NodeKind::Tool,
        }
    }

    /// The slot a resource node kind fills, if any
    pub fn for_kind(kind: NodeKind) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| slot.resource_kind() == kind)
    }

    /// Human-readable prompt title
    pub fn label(&self) -> &'static str {
        match self {
            Slot::ChatModel => "Chat Model",
            Slot::Memory => "Memory",
            Slot::Tool => "Tool",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::ChatModel => write!(f, "chatModel"),
            Slot::Memory => write!(f, "memory"),
            Slot::Tool => write!(f, "tool"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatModelConfig {
    pub model: String,
    pub guardrail: String,
}

impl Default for ChatModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            guardrail: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(rename = "type")]
    pub memory_type: String,
    pub notes: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            memory_type: "buffer".to_string(),
            notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub name: String,
    pub description: String,
}

/// A configuration record for exactly one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "slot", content = "record", rename_all = "camelCase")]
pub enum SlotRecord {
    ChatModel(ChatModelConfig),
    Memory(MemoryConfig),
    Tool(ToolConfig),
}

impl SlotRecord {
    /// The blank record a new slot starts from
    pub fn default_for(slot: Slot) -> Self {
        match slot {
            Slot::ChatModel => SlotRecord::ChatModel(ChatModelConfig::default()),
            Slot::Memory => SlotRecord::Memory(MemoryConfig::default()),
            Slot::Tool => SlotRecord::Tool(ToolConfig::default()),
        }
    }

    pub fn slot(&self) -> Slot {
        match self {
            SlotRecord::ChatModel(_) => Slot::ChatModel,
            SlotRecord::Memory(_) => Slot::Memory,
            SlotRecord::Tool(_) => Slot::Tool,
        }
    }
}

/// Attachment state of a single agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAttachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<ChatModelConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolConfig>,
}

impl AgentAttachment {
    /// Current record for `slot`
    pub fn get(&self, slot: Slot) -> Option<SlotRecord> {
        match slot {
            Slot::ChatModel => self.chat_model.clone().map(SlotRecord::ChatModel),
            Slot::Memory => self.memory.clone().map(SlotRecord::Memory),
            Slot::Tool => self.tool.clone().map(SlotRecord::Tool),
        }
    }

    pub fn has(&self, slot: Slot) -> bool {
        match slot {
            Slot::ChatModel => self.chat_model.is_some(),
            Slot::Memory => self.memory.is_some(),
            Slot::Tool => self.tool.is_some(),
        }
    }

    /// Upsert the record's slot
    pub fn set(&mut self, record: SlotRecord) {
        match record {
            SlotRecord::ChatModel(config) => self.chat_model = Some(config),
            SlotRecord::Memory(config) => self.memory = Some(config),
            SlotRecord::Tool(config) => self.tool = Some(config),
        }
    }

    /// Drop a slot, returning whether it was present
    pub fn clear(&mut self, slot: Slot) -> bool {
        match slot {
            Slot::ChatModel => self.chat_model.take().is_some(),
            Slot::Memory => self.memory.take().is_some(),
            Slot::Tool => self.tool.take().is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        Slot::ALL.iter().all(|slot| !self.has(*slot))
    }

    /// Slots that currently hold a record
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        Slot::ALL.into_iter().filter(move |slot| self.has(*slot))
    }
}

/// Per-agent slot configuration, keyed by agent node id
///
/// Never holds an entry whose slots are all empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentRegistry {
    entries: BTreeMap<NodeId, AgentAttachment>,
}

impl AttachmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: BTreeMap<NodeId, AgentAttachment>) -> Self {
        let mut registry = Self { entries };
        registry.entries.retain(|_, attachment| !attachment.is_empty());
        registry
    }

    /// Attachment state of an agent, if any slot is set
    pub fn get(&self, agent_id: &str) -> Option<&AgentAttachment> {
        self.entries.get(agent_id)
    }

    /// Current record for one slot of an agent
    pub fn slot(&self, agent_id: &str, slot: Slot) -> Option<SlotRecord> {
        self.get(agent_id).and_then(|attachment| attachment.get(slot))
    }

    /// Upsert a slot record; contents are accepted as-is
    pub fn set_slot(&mut self, agent_id: &str, record: SlotRecord) {
        log::debug!("Set {} slot on agent '{}'", record.slot(), agent_id);
        self.entries.entry(agent_id.to_string()).or_default().set(record);
    }

    /// Insert the default record for `slot` unless one exists
    ///
    /// Returns true when a record was inserted.
    pub fn seed_slot(&mut self, agent_id: &str, slot: Slot) -> bool {
        if self.slot(agent_id, slot).is_some() {
            return false;
        }
        self.set_slot(agent_id, SlotRecord::default_for(slot));
        true
    }

    /// Remove a slot, dropping the agent entry once it holds nothing
    ///
    /// Returns true when a record was removed.
    pub fn clear_slot(&mut self, agent_id: &str, slot: Slot) -> bool {
        let Some(attachment) = self.entries.get_mut(agent_id) else {
            return false;
        };
        let removed = attachment.clear(slot);
        if attachment.is_empty() {
            self.entries.remove(agent_id);
        }
        if removed {
            log::debug!("Cleared {} slot on agent '{}'", slot, agent_id);
        }
        removed
    }

    /// Remove all attachment state for an agent
    pub fn clear_agent(&mut self, agent_id: &str) -> bool {
        let removed = self.entries.remove(agent_id).is_some();
        if removed {
            log::debug!("Cleared all attachments of agent '{}'", agent_id);
        }
        removed
    }

    /// The agent (and slot) a child node feeds, derived from topology
    ///
    /// Only an edge into the agent handle matching the child's own kind
    /// makes the child an attachment.
    pub fn find_owner<'a>(
        child_id: &str,
        nodes: &[GraphNode],
        edges: &'a [GraphEdge],
    ) -> Option<(&'a str, Slot)> {
        let slot = Slot::for_kind(kind_of(nodes, child_id)?)?;
        edges
            .iter()
            .find(|e| {
                e.source == child_id
                    && e.target_handle.as_deref() == Some(slot.handle())
                    && kind_of(nodes, &e.target) == Some(NodeKind::AiAgent)
            })
            .map(|e| (e.target.as_str(), slot))
    }

    /// The agent a child node feeds into, derived from topology
    pub fn find_owning_agent<'a>(
        child_id: &str,
        nodes: &[GraphNode],
        edges: &'a [GraphEdge],
    ) -> Option<&'a str> {
        Self::find_owner(child_id, nodes, edges).map(|(agent_id, _)| agent_id)
    }

    /// The child node currently wired into an agent's slot
    pub fn find_slot_child_id<'a>(
        agent_id: &str,
        slot: Slot,
        nodes: &[GraphNode],
        edges: &'a [GraphEdge],
    ) -> Option<&'a str> {
        edges
            .iter()
            .find(|e| {
                e.targets_handle(agent_id, slot.handle())
                    && kind_of(nodes, &e.source) == Some(slot.resource_kind())
            })
            .map(|e| e.source.as_str())
    }

    /// Whether a live resource of the slot's kind feeds an agent's slot
    pub fn is_backed(agent_id: &str, slot: Slot, nodes: &[GraphNode], edges: &[GraphEdge]) -> bool {
        Self::find_slot_child_id(agent_id, slot, nodes, edges).is_some()
    }

    /// Clear every slot of `agent_id` that nothing backs anymore
    ///
    /// Returns the slots that were cleared.
    pub fn prune_unbacked(
        &mut self,
        agent_id: &str,
        nodes: &[GraphNode],
        edges: &[GraphEdge],
    ) -> Vec<Slot> {
        let stale: Vec<Slot> = match self.get(agent_id) {
            Some(attachment) => attachment
                .slots()
                .filter(|slot| !Self::is_backed(agent_id, *slot, nodes, edges))
                .collect(),
            None => return Vec::new(),
        };
        for slot in &stale {
            self.clear_slot(agent_id, *slot);
        }
        stale
    }

    /// All entries, ordered by agent id
    pub fn entries(&self) -> &BTreeMap<NodeId, AgentAttachment> {
        &self.entries
    }

    /// Ids of agents that have any configuration
    pub fn agent_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn kind_of(nodes: &[GraphNode], id: &str) -> Option<NodeKind> {
    nodes.iter().find(|n| n.id == id).map(GraphNode::kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn slot_edge(id: &str, child: &str, agent: &str, handle: &str) -> GraphEdge {
        GraphEdge {
            id: id.to_string(),
            source: child.to_string(),
            target: agent.to_string(),
            source_handle: Some(handles::OUT.to_string()),
            target_handle: Some(handle.to_string()),
        }
    }

    fn tool(name: &str) -> SlotRecord {
        SlotRecord::Tool(ToolConfig {
            name: name.to_string(),
            description: String::new(),
        })
    }

    #[test]
    fn test_slot_handles() {
        assert_eq!(Slot::ChatModel.handle(), "model");
        assert_eq!(Slot::from_handle("memory"), Some(Slot::Memory));
        assert_eq!(Slot::from_handle("in"), None);
        assert_eq!(Slot::for_kind(NodeKind::AiModel), Some(Slot::ChatModel));
        assert_eq!(Slot::for_kind(NodeKind::Trigger), None);
    }

    #[test]
    fn test_set_slot_upserts() {
        let mut registry = AttachmentRegistry::new();
        registry.set_slot("a1", tool("first"));
        registry.set_slot("a1", tool("second"));

        assert_eq!(registry.slot("a1", Slot::Tool), Some(tool("second")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clear_last_slot_removes_entry() {
        let mut registry = AttachmentRegistry::new();
        registry.set_slot("a1", tool("x"));
        registry.set_slot("a1", SlotRecord::default_for(Slot::Memory));

        assert!(registry.clear_slot("a1", Slot::Tool));
        assert!(registry.get("a1").is_some());

        assert!(registry.clear_slot("a1", Slot::Memory));
        assert!(registry.get("a1").is_none());
        assert!(registry.is_empty());

        assert!(!registry.clear_slot("a1", Slot::Memory));
    }

    #[test]
    fn test_clear_agent() {
        let mut registry = AttachmentRegistry::new();
        for slot in Slot::ALL {
            registry.set_slot("a1", SlotRecord::default_for(slot));
        }
        registry.set_slot("a2", tool("keep"));

        assert!(registry.clear_agent("a1"));
        assert!(!registry.clear_agent("a1"));
        assert_eq!(registry.agent_ids().collect::<Vec<_>>(), vec!["a2"]);
    }

    #[test]
    fn test_seed_slot_keeps_existing_record() {
        let mut registry = AttachmentRegistry::new();
        registry.set_slot("a1", tool("configured"));

        assert!(!registry.seed_slot("a1", Slot::Tool));
        assert_eq!(registry.slot("a1", Slot::Tool), Some(tool("configured")));

        assert!(registry.seed_slot("a1", Slot::ChatModel));
        assert_eq!(
            registry.slot("a1", Slot::ChatModel),
            Some(SlotRecord::ChatModel(ChatModelConfig::default()))
        );
    }

    fn topology() -> (Vec<GraphNode>, Vec<GraphEdge>) {
        let node = |id: &str, kind| GraphNode::new(id, kind, id, Position::default());
        let nodes = vec![
            node("t1", NodeKind::Trigger),
            node("a1", NodeKind::AiAgent),
            node("m1", NodeKind::AiModel),
            node("k1", NodeKind::Tool),
            node("r1", NodeKind::Memory),
        ];
        let edges = vec![
            GraphEdge {
                id: "e0".to_string(),
                source: "t1".to_string(),
                target: "a1".to_string(),
                source_handle: None,
                target_handle: None,
            },
            slot_edge("e1", "m1", "a1", handles::MODEL),
            slot_edge("e2", "k1", "a1", handles::TOOL),
            // wrong kinds on slot handles
            slot_edge("e3", "t1", "a1", handles::MEMORY),
            slot_edge("e4", "r1", "a1", handles::TOOL),
        ];
        (nodes, edges)
    }

    #[test]
    fn test_topology_lookups() {
        let (nodes, edges) = topology();

        assert_eq!(AttachmentRegistry::find_owning_agent("m1", &nodes, &edges), Some("a1"));
        assert_eq!(
            AttachmentRegistry::find_owner("k1", &nodes, &edges),
            Some(("a1", Slot::Tool))
        );
        assert_eq!(AttachmentRegistry::find_owning_agent("t1", &nodes, &edges), None);
        assert_eq!(AttachmentRegistry::find_owning_agent("r1", &nodes, &edges), None);

        assert_eq!(
            AttachmentRegistry::find_slot_child_id("a1", Slot::ChatModel, &nodes, &edges),
            Some("m1")
        );
        assert_eq!(
            AttachmentRegistry::find_slot_child_id("a1", Slot::Tool, &nodes, &edges),
            Some("k1")
        );
        assert!(!AttachmentRegistry::is_backed("a1", Slot::Memory, &nodes, &edges));
    }

    #[test]
    fn test_prune_unbacked() {
        let (nodes, edges) = topology();
        let mut registry = AttachmentRegistry::new();
        for slot in Slot::ALL {
            registry.set_slot("a1", SlotRecord::default_for(slot));
        }

        assert_eq!(registry.prune_unbacked("a1", &nodes, &edges), vec![Slot::Memory]);
        assert!(registry.slot("a1", Slot::ChatModel).is_some());

        assert_eq!(
            registry.prune_unbacked("a1", &nodes, &[]),
            vec![Slot::ChatModel, Slot::Tool]
        );
        assert!(registry.get("a1").is_none());
    }

    #[test]
    fn test_attachment_serialization() {
        let mut attachment = AgentAttachment::default();
        attachment.set(SlotRecord::Memory(MemoryConfig {
            memory_type: "redis".to_string(),
            notes: "redis://localhost:6379".to_string(),
        }));

        let value = serde_json::to_value(&attachment).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"memory": {"type": "redis", "notes": "redis://localhost:6379"}})
        );
    }
}
