//! Selection and configuration prompt state
//!
//! Selection is single-focus: one node, or a set of edges, or nothing.
//! The configuration prompt is tracked independently and derived from
//! selection plus topology: selecting a chat model, memory or tool node
//! opens its prompt; selecting anything else closes it.

use serde::{Deserialize, Serialize};

use crate::attachments::{AgentAttachment, AttachmentRegistry, Slot, SlotRecord};
use crate::error::{CanvasError, Result};
use crate::graph::GraphStore;
use crate::types::{EdgeId, GraphNode, NodeId};

/// What is currently selected on the canvas
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Edges(Vec<EdgeId>),
}

impl Selection {
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Selection::Node(id) => Some(id),
            _ => None,
        }
    }

    pub fn edge_ids(&self) -> &[EdgeId] {
        match self {
            Selection::Edges(ids) => ids,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::None)
    }
}

/// Selection event reported by the canvas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionChange {
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    #[serde(default)]
    pub edges: Vec<EdgeId>,
}

impl SelectionChange {
    pub fn node(id: impl Into<NodeId>) -> Self {
        Self {
            nodes: vec![id.into()],
            edges: Vec::new(),
        }
    }

    pub fn edges(ids: impl IntoIterator<Item = impl Into<EdgeId>>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn cleared() -> Self {
        Self::default()
    }
}

/// An open configuration prompt for one agent slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePrompt {
    /// Which slot is being configured
    pub slot: Slot,
    /// The agent the record will be stored on, when known
    pub agent_id: Option<NodeId>,
    /// The child node backing the slot, when there is one
    pub node_id: Option<NodeId>,
    /// Form values, seeded from the registry when the prompt opens
    pub form: SlotRecord,
}

impl ActivePrompt {
    pub fn label(&self) -> &'static str {
        self.slot.label()
    }
}

/// How a controller call affected the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTransition {
    Unchanged,
    Opened,
    Closed,
}

/// What the detail panel should show
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetailSurface<'a> {
    /// A configuration prompt is open
    Prompt(&'a ActivePrompt),
    /// An agent is selected; shows its attachments
    Agent {
        node: &'a GraphNode,
        attachment: Option<&'a AgentAttachment>,
    },
    /// Generic info for any other selected node
    Node(&'a GraphNode),
    /// Nothing to show
    Empty,
}

/// Tracks selection and the active prompt
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    selection: Selection,
    prompt: Option<ActivePrompt>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn prompt(&self) -> Option<&ActivePrompt> {
        self.prompt.as_ref()
    }

    /// Apply a canvas selection event
    ///
    /// Ids that do not refer to live nodes or edges are ignored. A node
    /// takes precedence over edges.
    pub fn apply_change(
        &mut self,
        change: &SelectionChange,
        graph: &GraphStore,
        registry: &AttachmentRegistry,
    ) -> PromptTransition {
        let node = change.nodes.iter().find_map(|id| graph.find_node(id));
        let edges: Vec<EdgeId> = change
            .edges
            .iter()
            .filter(|id| graph.find_edge(id).is_some())
            .cloned()
            .collect();

        match node {
            Some(node) => {
                self.selection = Selection::Node(node.id.clone());
                match Slot::for_kind(node.kind()) {
                    Some(slot) => {
                        let agent_id = AttachmentRegistry::find_owning_agent(
                            &node.id,
                            graph.nodes(),
                            graph.edges(),
                        );
                        self.open_prompt(
                            slot,
                            agent_id.map(str::to_string),
                            Some(node.id.clone()),
                            registry,
                        );
                        PromptTransition::Opened
                    }
                    None => self.close_prompt(),
                }
            }
            None => {
                self.selection = if edges.is_empty() {
                    Selection::None
                } else {
                    Selection::Edges(edges)
                };
                self.close_prompt()
            }
        }
    }

    /// Open the prompt for one of an agent's slots, regardless of selection
    pub fn open_agent_prompt(
        &mut self,
        agent_id: &str,
        slot: Slot,
        graph: &GraphStore,
        registry: &AttachmentRegistry,
    ) {
        let child =
            AttachmentRegistry::find_slot_child_id(agent_id, slot, graph.nodes(), graph.edges());
        self.open_prompt(
            slot,
            Some(agent_id.to_string()),
            child.map(str::to_string),
            registry,
        );
    }

    /// Open a prompt, re-seeding the form from the registry
    pub fn open_prompt(
        &mut self,
        slot: Slot,
        agent_id: Option<NodeId>,
        node_id: Option<NodeId>,
        registry: &AttachmentRegistry,
    ) {
        let form = agent_id
            .as_deref()
            .and_then(|agent| registry.slot(agent, slot))
            .unwrap_or_else(|| SlotRecord::default_for(slot));
        self.prompt = Some(ActivePrompt {
            slot,
            agent_id,
            node_id,
            form,
        });
    }

    /// Replace the form values of the open prompt
    pub fn set_form(&mut self, record: SlotRecord) -> Result<()> {
        let prompt = self.prompt.as_mut().ok_or(CanvasError::NoActivePrompt)?;
        if prompt.slot != record.slot() {
            return Err(CanvasError::SlotMismatch {
                expected: prompt.slot,
                found: record.slot(),
            });
        }
        prompt.form = record;
        Ok(())
    }

    /// Close the prompt without persisting anything
    pub fn close_prompt(&mut self) -> PromptTransition {
        match self.prompt.take() {
            Some(_) => PromptTransition::Closed,
            None => PromptTransition::Unchanged,
        }
    }

    pub(crate) fn prompt_mut(&mut self) -> Option<&mut ActivePrompt> {
        self.prompt.as_mut()
    }

    /// Select a single node directly (e.g. right after creating it)
    pub fn select_node(
        &mut self,
        node_id: &str,
        graph: &GraphStore,
        registry: &AttachmentRegistry,
    ) -> PromptTransition {
        self.apply_change(&SelectionChange::node(node_id), graph, registry)
    }

    /// Drop references to removed nodes and edges
    ///
    /// Returns whether the selection changed and how the prompt changed.
    pub fn forget(&mut self, node_ids: &[NodeId], edge_ids: &[EdgeId]) -> (bool, PromptTransition) {
        let selection_changed = match &mut self.selection {
            Selection::Node(id) => node_ids.contains(id),
            Selection::Edges(ids) => {
                let before = ids.len();
                ids.retain(|id| !edge_ids.contains(id));
                ids.len() != before
            }
            Selection::None => false,
        };
        let emptied = match &self.selection {
            Selection::Node(_) => selection_changed,
            Selection::Edges(ids) => ids.is_empty(),
            Selection::None => false,
        };
        if emptied {
            self.selection = Selection::None;
        }

        let prompt_stale = self.prompt.as_ref().is_some_and(|prompt| {
            [&prompt.agent_id, &prompt.node_id]
                .into_iter()
                .flatten()
                .any(|id| node_ids.contains(id))
        });
        let transition = if prompt_stale || (selection_changed && self.selection.is_empty()) {
            self.close_prompt()
        } else {
            PromptTransition::Unchanged
        };

        (selection_changed, transition)
    }

    /// Clear selection and close the prompt
    pub fn clear(&mut self) -> PromptTransition {
        self.selection = Selection::None;
        self.close_prompt()
    }

    /// Derive what the detail panel shows
    pub fn detail_surface<'a>(
        &'a self,
        graph: &'a GraphStore,
        registry: &'a AttachmentRegistry,
    ) -> DetailSurface<'a> {
        if let Some(prompt) = &self.prompt {
            return DetailSurface::Prompt(prompt);
        }
        match self.selection.node_id().and_then(|id| graph.find_node(id)) {
            Some(node) if node.is_agent() => DetailSurface::Agent {
                node,
                attachment: registry.get(&node.id),
            },
            Some(node) => DetailSurface::Node(node),
            None => DetailSurface::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::{MemoryConfig, ToolConfig};
    use crate::types::{handles, NodeKind, Position};

    struct Fixture {
        graph: GraphStore,
        registry: AttachmentRegistry,
        agent: NodeId,
        tool: NodeId,
        trigger: NodeId,
        flow_edge: EdgeId,
    }

    fn fixture() -> Fixture {
        let mut graph = GraphStore::new();
        let trigger = graph.add_node(NodeKind::Trigger, "Start", Position::default());
        let agent = graph.add_node(NodeKind::AiAgent, "Agent", Position::default());
        let tool = graph.add_node(NodeKind::Tool, "Tool", Position::default());
        let flow_edge = graph.add_edge(&trigger, &agent, None, None).unwrap();
        graph
            .add_edge(&tool, &agent, Some(handles::OUT), Some(handles::TOOL))
            .unwrap();

        let mut registry = AttachmentRegistry::new();
        registry.set_slot(
            &agent,
            SlotRecord::Tool(ToolConfig {
                name: "Weather".to_string(),
                description: "Looks up forecasts".to_string(),
            }),
        );

        Fixture {
            graph,
            registry,
            agent,
            tool,
            trigger,
            flow_edge,
        }
    }

    #[test]
    fn test_selecting_child_opens_prompt_with_owner() {
        let f = fixture();
        let mut ctl = SelectionController::new();

        let transition = ctl.apply_change(&SelectionChange::node(&f.tool), &f.graph, &f.registry);

        assert_eq!(transition, PromptTransition::Opened);
        assert_eq!(ctl.selection(), &Selection::Node(f.tool.clone()));
        let prompt = ctl.prompt().unwrap();
        assert_eq!(prompt.slot, Slot::Tool);
        assert_eq!(prompt.agent_id.as_deref(), Some(f.agent.as_str()));
        assert_eq!(prompt.node_id.as_deref(), Some(f.tool.as_str()));
        assert!(matches!(&prompt.form, SlotRecord::Tool(t) if t.name == "Weather"));
    }

    #[test]
    fn test_child_on_foreign_handle_has_no_owner() {
        let mut f = fixture();
        let memory = f.graph.add_node(NodeKind::Memory, "Memory", Position::default());
        f.graph
            .add_edge(&memory, &f.agent, Some(handles::OUT), Some(handles::TOOL))
            .unwrap();
        let mut ctl = SelectionController::new();

        ctl.apply_change(&SelectionChange::node(&memory), &f.graph, &f.registry);

        let prompt = ctl.prompt().unwrap();
        assert_eq!(prompt.slot, Slot::Memory);
        assert!(prompt.agent_id.is_none());
        assert_eq!(prompt.node_id.as_deref(), Some(memory.as_str()));
        assert_eq!(prompt.form, SlotRecord::default_for(Slot::Memory));
    }

    #[test]
    fn test_selecting_other_node_closes_prompt() {
        let f = fixture();
        let mut ctl = SelectionController::new();
        ctl.apply_change(&SelectionChange::node(&f.tool), &f.graph, &f.registry);

        let transition =
            ctl.apply_change(&SelectionChange::node(&f.trigger), &f.graph, &f.registry);
        assert_eq!(transition, PromptTransition::Closed);
        assert!(ctl.prompt().is_none());
    }

    #[test]
    fn test_edges_and_empty_selection() {
        let f = fixture();
        let mut ctl = SelectionController::new();

        let change = SelectionChange::edges([f.flow_edge.clone(), "ghost".to_string()]);
        ctl.apply_change(&change, &f.graph, &f.registry);
        assert_eq!(ctl.selection(), &Selection::Edges(vec![f.flow_edge.clone()]));

        ctl.apply_change(&SelectionChange::cleared(), &f.graph, &f.registry);
        assert_eq!(ctl.selection(), &Selection::None);
    }

    #[test]
    fn test_node_wins_over_edges() {
        let f = fixture();
        let mut ctl = SelectionController::new();
        let change = SelectionChange {
            nodes: vec![f.trigger.clone()],
            edges: vec![f.flow_edge.clone()],
        };

        ctl.apply_change(&change, &f.graph, &f.registry);
        assert_eq!(ctl.selection(), &Selection::Node(f.trigger.clone()));
    }

    #[test]
    fn test_prompt_reseeds_for_each_agent() {
        let mut graph = GraphStore::new();
        let a = graph.add_node(NodeKind::AiAgent, "A", Position::default());
        let b = graph.add_node(NodeKind::AiAgent, "B", Position::default());
        let mut registry = AttachmentRegistry::new();
        registry.set_slot(
            &b,
            SlotRecord::Memory(MemoryConfig {
                memory_type: "redis".to_string(),
                notes: "B's store".to_string(),
            }),
        );

        let mut ctl = SelectionController::new();
        ctl.open_agent_prompt(&b, Slot::Memory, &graph, &registry);
        ctl.set_form(SlotRecord::Memory(MemoryConfig {
            memory_type: "postgres".to_string(),
            notes: "unsaved edit".to_string(),
        }))
        .unwrap();

        ctl.open_agent_prompt(&a, Slot::Memory, &graph, &registry);
        assert_eq!(ctl.prompt().unwrap().form, SlotRecord::default_for(Slot::Memory));

        ctl.open_agent_prompt(&b, Slot::Memory, &graph, &registry);
        assert!(matches!(
            &ctl.prompt().unwrap().form,
            SlotRecord::Memory(m) if m.notes == "B's store"
        ));
    }

    #[test]
    fn test_set_form_checks_slot() {
        let f = fixture();
        let mut ctl = SelectionController::new();
        assert!(matches!(
            ctl.set_form(SlotRecord::default_for(Slot::Tool)),
            Err(CanvasError::NoActivePrompt)
        ));

        ctl.open_agent_prompt(&f.agent, Slot::ChatModel, &f.graph, &f.registry);
        assert!(ctl.prompt().unwrap().node_id.is_none());
        let err = ctl.set_form(SlotRecord::default_for(Slot::Tool)).unwrap_err();
        assert!(matches!(
            err,
            CanvasError::SlotMismatch {
                expected: Slot::ChatModel,
                found: Slot::Tool
            }
        ));
    }

    #[test]
    fn test_forget_clears_selection_and_prompt() {
        let f = fixture();
        let mut ctl = SelectionController::new();
        ctl.apply_change(&SelectionChange::node(&f.tool), &f.graph, &f.registry);

        let (changed, transition) = ctl.forget(&[f.tool.clone()], &[]);
        assert!(changed);
        assert_eq!(transition, PromptTransition::Closed);
        assert!(ctl.selection().is_empty());
    }

    #[test]
    fn test_forget_closes_prompt_of_removed_agent() {
        let f = fixture();
        let mut ctl = SelectionController::new();
        ctl.apply_change(&SelectionChange::node(&f.tool), &f.graph, &f.registry);

        let (changed, transition) = ctl.forget(&[f.agent.clone()], &[]);
        assert!(!changed);
        assert_eq!(transition, PromptTransition::Closed);
        assert_eq!(ctl.selection(), &Selection::Node(f.tool.clone()));
    }

    #[test]
    fn test_detail_surface() {
        let f = fixture();
        let mut ctl = SelectionController::new();
        assert_eq!(ctl.detail_surface(&f.graph, &f.registry), DetailSurface::Empty);

        ctl.apply_change(&SelectionChange::node(&f.agent), &f.graph, &f.registry);
        match ctl.detail_surface(&f.graph, &f.registry) {
            DetailSurface::Agent { node, attachment } => {
                assert_eq!(node.id, f.agent);
                assert!(attachment.unwrap().tool.is_some());
            }
            other => panic!("Expected agent surface, got {:?}", other),
        }

        ctl.apply_change(&SelectionChange::node(&f.trigger), &f.graph, &f.registry);
        assert!(matches!(
            ctl.detail_surface(&f.graph, &f.registry),
            DetailSurface::Node(n) if n.id == f.trigger
        ));

        ctl.apply_change(&SelectionChange::node(&f.tool), &f.graph, &f.registry);
        assert!(matches!(ctl.detail_surface(&f.graph, &f.registry), DetailSurface::Prompt(_)));
    }
}
