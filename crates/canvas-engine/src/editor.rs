//! The editor context
//!
//! `Editor` owns the graph store, the attachment registry, the selection
//! and prompt state, and the delete-key guard. Presentation code reads
//! state through its accessors and changes it only through the operations
//! below; each operation applies fully before it returns and then reports
//! what happened to the event sink.

use std::time::Instant;

use crate::attachments::{AttachmentRegistry, Slot, SlotRecord};
use crate::config::EditorConfig;
use crate::deletion::{self, DeletionReport, KeyRepeatGuard};
use crate::document::WorkflowDocument;
use crate::error::{CanvasError, Result};
use crate::events::{EditorEvent, EventSink, NullEventSink};
use crate::graph::GraphStore;
use crate::palette::{default_palette, DragPayload, PaletteItem};
use crate::selection::{
    ActivePrompt, DetailSurface, PromptTransition, Selection, SelectionChange, SelectionController,
};
use crate::types::{handles, EdgeId, GraphEdge, GraphNode, NodeConfig, NodeId, NodeKind, Position};
use crate::validation::{self, ValidationError};

/// A child node created for an agent slot, and the edge wiring it in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedChild {
    pub node_id: NodeId,
    pub edge_id: EdgeId,
}

/// Graph editing context
pub struct Editor {
    config: EditorConfig,
    graph: GraphStore,
    registry: AttachmentRegistry,
    selection: SelectionController,
    key_guard: KeyRepeatGuard,
    palette: Vec<PaletteItem>,
    events: Box<dyn EventSink>,
}

impl Editor {
    /// Create an editor with an empty canvas
    pub fn new(config: EditorConfig) -> Self {
        Self::from_parts(config, GraphStore::new(), AttachmentRegistry::new())
    }

    /// Create an editor holding the starter workflow
    pub fn with_starter(config: EditorConfig) -> Self {
        let starter = WorkflowDocument::starter();
        Self::from_parts(
            config,
            GraphStore::from_parts(starter.nodes, starter.edges),
            AttachmentRegistry::new(),
        )
    }

    /// Rebuild an editor from an exported document
    ///
    /// Documents with duplicate ids or dangling edges are rejected. Any
    /// mismatch between attachment records and slot edges is repaired with
    /// a warning.
    pub fn from_document(document: WorkflowDocument, config: EditorConfig) -> Result<Self> {
        let (structural, repairable): (Vec<ValidationError>, Vec<ValidationError>) =
            validation::validate_document(&document)
                .into_iter()
                .partition(ValidationError::is_structural);
        if !structural.is_empty() {
            return Err(CanvasError::InvalidDocument(structural));
        }

        let mut registry = AttachmentRegistry::from_entries(document.agent_attachments);
        for problem in repairable {
            log::warn!("Repairing imported workflow: {}", problem);
            match problem {
                ValidationError::AttachmentWithoutAgent { node_id } => {
                    registry.clear_agent(&node_id);
                }
                ValidationError::UnbackedSlot { agent_id, slot } => {
                    registry.clear_slot(&agent_id, slot);
                }
                ValidationError::UnrecordedSlot { agent_id, slot } => {
                    registry.seed_slot(&agent_id, slot);
                }
                _ => {}
            }
        }

        let graph = GraphStore::from_parts(document.nodes, document.edges);
        log::info!(
            "Imported workflow with {} node(s), {} edge(s), {} configured agent(s)",
            graph.node_count(),
            graph.edge_count(),
            registry.len()
        );
        Ok(Self::from_parts(config, graph, registry))
    }

    fn from_parts(config: EditorConfig, graph: GraphStore, registry: AttachmentRegistry) -> Self {
        Self {
            key_guard: KeyRepeatGuard::new(config.key_repeat_window()),
            config,
            graph,
            registry,
            selection: SelectionController::new(),
            palette: default_palette(),
            events: Box::new(NullEventSink),
        }
    }

    /// Route editor events to `sink`
    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.events = Box::new(sink);
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn registry(&self) -> &AttachmentRegistry {
        &self.registry
    }

    pub fn selection(&self) -> &Selection {
        self.selection.selection()
    }

    pub fn prompt(&self) -> Option<&ActivePrompt> {
        self.selection.prompt()
    }

    pub fn palette(&self) -> &[PaletteItem] {
        &self.palette
    }

    /// What the detail panel should show right now
    pub fn detail_surface(&self) -> DetailSurface<'_> {
        self.selection.detail_surface(&self.graph, &self.registry)
    }

    /// Label of the agent the open prompt configures
    pub fn prompt_agent_label(&self) -> Option<&str> {
        let agent_id = self.prompt()?.agent_id.as_deref()?;
        Some(
            self.graph
                .find_node(agent_id)
                .map(|n| n.label.as_str())
                .unwrap_or(agent_id),
        )
    }

    // ----- graph edits -----

    /// Add a node with default configuration
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        position: Position,
    ) -> NodeId {
        let node_id = self.graph.add_node(kind, label, position);
        self.emit(EditorEvent::NodeAdded {
            node_id: node_id.clone(),
            kind,
        });
        node_id
    }

    /// Add a node from the palette and focus it
    ///
    /// Resource nodes open their prompt straight away; it has no agent
    /// until the node is connected to one.
    pub fn add_palette_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        position: Position,
    ) -> NodeId {
        let node_id = self.add_node(kind, label, position);
        let transition = self.selection.select_node(&node_id, &self.graph, &self.registry);
        self.emit_selection();
        self.emit_prompt(transition);
        node_id
    }

    /// Consume a palette drag dropped at `position`
    pub fn drop_payload(&mut self, payload: &DragPayload, position: Position) -> NodeId {
        self.add_palette_node(payload.kind, payload.label.clone(), position)
    }

    /// Connect two nodes
    ///
    /// Wiring a resource into the matching slot handle of an agent gives
    /// that slot a default record if it has none.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        source_handle: Option<&str>,
        target_handle: Option<&str>,
    ) -> Result<EdgeId> {
        let edge_id = self.graph.add_edge(source, target, source_handle, target_handle)?;
        self.after_edge_added(&edge_id);
        Ok(edge_id)
    }

    /// Create a child resource under an agent, wire it in and open its prompt
    pub fn attach_child(&mut self, agent_id: &str, slot: Slot) -> Result<AttachedChild> {
        let child = self.spawn_child(agent_id, slot)?;
        self.selection.open_prompt(
            slot,
            Some(agent_id.to_string()),
            Some(child.node_id.clone()),
            &self.registry,
        );
        self.emit_prompt(PromptTransition::Opened);
        Ok(child)
    }

    fn spawn_child(&mut self, agent_id: &str, slot: Slot) -> Result<AttachedChild> {
        let agent_position = self.require_agent(agent_id)?.position;
        let (dx, dy) = self.config.child_offset(slot);
        let label = self.config.child_label(slot).to_string();

        let node_id = self.add_node(slot.resource_kind(), label, agent_position.offset(dx, dy));
        let edge_id = self.graph.add_edge_with_id(
            format!("edge-{}", node_id),
            &node_id,
            agent_id,
            Some(handles::OUT),
            Some(slot.handle()),
        )?;
        self.after_edge_added(&edge_id);
        Ok(AttachedChild { node_id, edge_id })
    }

    fn after_edge_added(&mut self, edge_id: &str) {
        let Some(edge) = self.graph.find_edge(edge_id).cloned() else {
            return;
        };
        self.emit(EditorEvent::EdgeAdded {
            edge_id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
        });
        self.seed_slot_for(&edge);
    }

    fn seed_slot_for(&mut self, edge: &GraphEdge) {
        let Some(slot) = edge.target_handle.as_deref().and_then(Slot::from_handle) else {
            return;
        };
        if self.graph.node_kind(&edge.target) == Some(NodeKind::AiAgent)
            && self.graph.node_kind(&edge.source) == Some(slot.resource_kind())
            && self.registry.seed_slot(&edge.target, slot)
        {
            self.emit(EditorEvent::SlotUpdated {
                agent_id: edge.target.clone(),
                slot,
            });
        }
    }

    pub fn rename_node(&mut self, node_id: &str, label: impl Into<String>) -> Result<()> {
        let label = label.into();
        self.update_node(node_id, |node| {
            node.label = label;
            Ok(())
        })
    }

    pub fn set_description(&mut self, node_id: &str, description: Option<String>) -> Result<()> {
        self.update_node(node_id, |node| {
            node.description = description.filter(|d| !d.is_empty());
            Ok(())
        })
    }

    pub fn move_node(&mut self, node_id: &str, position: Position) -> Result<()> {
        self.update_node(node_id, |node| {
            node.position = position;
            Ok(())
        })
    }

    /// Replace a node's kind-specific configuration
    ///
    /// The new configuration must be of the node's own kind.
    pub fn update_node_config(&mut self, node_id: &str, config: NodeConfig) -> Result<()> {
        self.update_node(node_id, |node| {
            if node.kind() != config.kind() {
                return Err(CanvasError::KindMismatch {
                    node_id: node.id.clone(),
                    expected: config.kind(),
                    found: node.kind(),
                });
            }
            node.config = config;
            Ok(())
        })
    }

    fn update_node<F>(&mut self, node_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut GraphNode) -> Result<()>,
    {
        let node = self
            .graph
            .find_node_mut(node_id)
            .ok_or_else(|| CanvasError::NodeNotFound(node_id.to_string()))?;
        apply(node)?;
        self.emit(EditorEvent::NodeUpdated {
            node_id: node_id.to_string(),
        });
        Ok(())
    }

    // ----- selection and prompts -----

    /// Apply a selection event from the canvas
    pub fn on_selection_change(&mut self, change: SelectionChange) {
        let transition = self.selection.apply_change(&change, &self.graph, &self.registry);
        self.emit_selection();
        self.emit_prompt(transition);
    }

    /// Open the prompt for an agent's slot from the agent detail view
    pub fn open_agent_prompt(&mut self, agent_id: &str, slot: Slot) -> Result<()> {
        self.require_agent(agent_id)?;
        self.selection
            .open_agent_prompt(agent_id, slot, &self.graph, &self.registry);
        self.emit_prompt(PromptTransition::Opened);
        Ok(())
    }

    /// Replace the values in the open prompt's form
    pub fn set_prompt_form(&mut self, record: SlotRecord) -> Result<()> {
        self.selection.set_form(record)
    }

    /// Close the prompt without saving
    pub fn close_prompt(&mut self) {
        let transition = self.selection.close_prompt();
        self.emit_prompt(transition);
    }

    /// Store the open prompt's form on its agent and close the prompt
    ///
    /// A prompt opened before its node was connected resolves its agent
    /// from the current edges. A prompt opened from the agent view for an
    /// empty slot attaches a child node first. A prompt for a node that is
    /// not wired into the matching slot fails with `PromptUnattached`. On
    /// error the prompt stays open.
    pub fn save_prompt(&mut self) -> Result<()> {
        let prompt = self.selection.prompt().cloned().ok_or(CanvasError::NoActivePrompt)?;

        let agent_id = match prompt.agent_id {
            Some(agent_id) => agent_id,
            None => prompt
                .node_id
                .as_deref()
                .and_then(|child| {
                    AttachmentRegistry::find_owning_agent(
                        child,
                        self.graph.nodes(),
                        self.graph.edges(),
                    )
                })
                .map(str::to_string)
                .ok_or(CanvasError::PromptUnattached)?,
        };
        self.require_agent(&agent_id)?;

        let (nodes, edges) = (self.graph.nodes(), self.graph.edges());
        if !AttachmentRegistry::is_backed(&agent_id, prompt.slot, nodes, edges) {
            if prompt.node_id.is_some() {
                return Err(CanvasError::PromptUnattached);
            }
            let child = self.spawn_child(&agent_id, prompt.slot)?;
            if let Some(open) = self.selection.prompt_mut() {
                open.node_id = Some(child.node_id);
            }
        }

        self.write_slot(&agent_id, prompt.form);
        let transition = self.selection.close_prompt();
        self.emit_prompt(transition);
        Ok(())
    }

    /// Write a slot record directly
    ///
    /// A resource of the slot's kind must already be wired into it.
    pub fn set_slot(&mut self, agent_id: &str, record: SlotRecord) -> Result<()> {
        self.require_agent(agent_id)?;
        let slot = record.slot();
        if !AttachmentRegistry::is_backed(agent_id, slot, self.graph.nodes(), self.graph.edges()) {
            return Err(CanvasError::SlotNotConnected {
                agent_id: agent_id.to_string(),
                slot,
            });
        }
        self.write_slot(agent_id, record);
        Ok(())
    }

    fn write_slot(&mut self, agent_id: &str, record: SlotRecord) {
        let slot = record.slot();
        self.registry.set_slot(agent_id, record);
        self.emit(EditorEvent::SlotUpdated {
            agent_id: agent_id.to_string(),
            slot,
        });
    }

    /// Disconnect whatever feeds an agent's slot; the child nodes stay
    pub fn detach_slot(&mut self, agent_id: &str, slot: Slot) -> Result<DeletionReport> {
        self.require_agent(agent_id)?;
        let edge_ids: Vec<EdgeId> = self
            .graph
            .edges_into_handle(agent_id, slot.handle())
            .map(|e| e.id.clone())
            .collect();
        Ok(self.delete_edges(&edge_ids))
    }

    // ----- deletion -----

    /// Delete the current selection
    pub fn delete_selection(&mut self) -> DeletionReport {
        let report =
            deletion::delete_selection(&mut self.selection, &mut self.graph, &mut self.registry);
        self.emit_deletion(&report);
        report
    }

    /// Delete one node (e.g. from its own delete button)
    pub fn delete_node(&mut self, node_id: &str) -> DeletionReport {
        self.delete_nodes(&[node_id.to_string()])
    }

    /// Delete several nodes at once
    pub fn delete_nodes(&mut self, node_ids: &[NodeId]) -> DeletionReport {
        let report = deletion::delete_nodes(
            node_ids,
            &mut self.selection,
            &mut self.graph,
            &mut self.registry,
        );
        self.emit_deletion(&report);
        report
    }

    /// Delete specific edges
    pub fn delete_edges(&mut self, edge_ids: &[EdgeId]) -> DeletionReport {
        let report = deletion::delete_edges(
            edge_ids,
            &mut self.selection,
            &mut self.graph,
            &mut self.registry,
        );
        self.emit_deletion(&report);
        report
    }

    /// Handle a key press at `at`
    ///
    /// Delete and Backspace delete the selection unless they repeat within
    /// the configured window. Returns the deletion report when one ran.
    pub fn handle_key(&mut self, key: &str, at: Instant) -> Option<DeletionReport> {
        if !deletion::is_delete_key(key) || !self.key_guard.admit(at) {
            return None;
        }
        Some(self.delete_selection())
    }

    // ----- export -----

    /// The current workflow as a plain document
    pub fn export(&self) -> WorkflowDocument {
        WorkflowDocument {
            nodes: self.graph.nodes().to_vec(),
            edges: self.graph.edges().to_vec(),
            agent_attachments: self.registry.entries().clone(),
        }
    }

    /// The current workflow as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        let json = self.export().to_json_pretty()?;
        log::info!("Exported workflow as JSON ({} bytes)", json.len());
        Ok(json)
    }

    /// Hand the exported workflow to a caller-supplied save callback
    pub fn save<F, R>(&self, on_save: F) -> R
    where
        F: FnOnce(WorkflowDocument) -> R,
    {
        let document = self.export();
        log::info!(
            "Saving workflow with {} node(s), {} edge(s)",
            document.nodes.len(),
            document.edges.len()
        );
        self.emit(EditorEvent::WorkflowSaved {
            node_count: document.nodes.len(),
            edge_count: document.edges.len(),
        });
        on_save(document)
    }

    // ----- helpers -----

    fn require_agent(&self, agent_id: &str) -> Result<&GraphNode> {
        let node = self
            .graph
            .find_node(agent_id)
            .ok_or_else(|| CanvasError::NodeNotFound(agent_id.to_string()))?;
        if !node.is_agent() {
            return Err(CanvasError::NotAnAgent(agent_id.to_string()));
        }
        Ok(node)
    }

    fn emit(&self, event: EditorEvent) {
        if let Err(e) = self.events.send(event) {
            log::warn!("Failed to deliver editor event: {}", e);
        }
    }

    fn emit_selection(&self) {
        let selection = self.selection.selection();
        self.emit(EditorEvent::SelectionChanged {
            node_id: selection.node_id().map(str::to_string),
            edge_ids: selection.edge_ids().to_vec(),
        });
    }

    fn emit_prompt(&self, transition: PromptTransition) {
        match transition {
            PromptTransition::Opened => {
                if let Some(prompt) = self.selection.prompt() {
                    self.emit(EditorEvent::PromptOpened {
                        slot: prompt.slot,
                        agent_id: prompt.agent_id.clone(),
                        node_id: prompt.node_id.clone(),
                    });
                }
            }
            PromptTransition::Closed => self.emit(EditorEvent::PromptClosed),
            PromptTransition::Unchanged => {}
        }
    }

    fn emit_deletion(&self, report: &DeletionReport) {
        for agent_id in &report.cleared_agents {
            self.emit(EditorEvent::AgentCleared {
                agent_id: agent_id.clone(),
            });
        }
        for (agent_id, slot) in &report.cleared_slots {
            self.emit(EditorEvent::SlotCleared {
                agent_id: agent_id.clone(),
                slot: *slot,
            });
        }
        if !report.removed_nodes.is_empty() {
            self.emit(EditorEvent::NodesRemoved {
                node_ids: report.removed_nodes.clone(),
            });
        }
        if !report.removed_edges.is_empty() {
            self.emit(EditorEvent::EdgesRemoved {
                edge_ids: report.removed_edges.clone(),
            });
        }
        if report.selection_changed {
            self.emit_selection();
        }
        if report.prompt_closed {
            self.emit(EditorEvent::PromptClosed);
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
