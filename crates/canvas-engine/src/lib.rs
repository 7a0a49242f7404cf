//! Canvas Engine - Graph editing core for the workflow canvas
//!
//! This crate holds the state behind a node-based workflow editor and
//! keeps it consistent while the user edits. It supports:
//!
//! - Typed nodes and handle-addressed edges
//! - Chat model, memory and tool slots attached to AI agents
//! - Cascading deletion that never leaves dangling edges or stale slots
//! - Selection-driven configuration prompts
//! - JSON export and import of whole workflows
//!
//! # Architecture
//!
//! - `GraphStore`: Nodes and edges with referential integrity
//! - `AttachmentRegistry`: Per-agent slot records, mirrored from slot edges
//! - `SelectionController`: Single-focus selection plus the open prompt
//! - `Editor`: Context object that owns all of the above and applies edits
//! - `EventSink`: Generic event streaming for whatever renders the canvas
//!
//! # Example
//!
//! ```ignore
//! use canvas_engine::{Editor, EditorConfig, NodeKind, Position, Slot};
//!
//! let mut editor = Editor::with_starter(EditorConfig::default());
//! let tool = editor.attach_child("agent-1", Slot::Tool)?;
//! editor.delete_node(&tool.node_id);
//! let json = editor.to_json()?;
//! ```

pub mod attachments;
pub mod config;
pub mod deletion;
pub mod document;
pub mod editor;
pub mod error;
pub mod events;
pub mod graph;
pub mod palette;
pub mod selection;
pub mod types;
pub mod validation;

// Re-export key types
pub use attachments::{
    AgentAttachment, AttachmentRegistry, ChatModelConfig, MemoryConfig, Slot, SlotRecord,
    ToolConfig,
};
pub use config::EditorConfig;
pub use deletion::{DeletionReport, KeyRepeatGuard};
pub use document::WorkflowDocument;
pub use editor::{AttachedChild, Editor};
pub use error::{CanvasError, Result};
pub use events::{EditorEvent, EventError, EventSink, NullEventSink, VecEventSink};
pub use graph::GraphStore;
pub use palette::{DragPayload, PaletteItem};
pub use selection::{ActivePrompt, DetailSurface, Selection, SelectionChange, SelectionController};
pub use types::{EdgeId, GraphEdge, GraphNode, NodeConfig, NodeId, NodeKind, Position};
pub use validation::ValidationError;
