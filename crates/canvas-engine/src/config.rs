//! Editor configuration
//!
//! Tunables for the canvas core. Every field has a default, so a partial
//! JSON file (or none at all) yields a working configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::attachments::Slot;
use crate::error::Result;

/// Default values for editor configuration
pub mod defaults {
    /// Window in which a repeated delete key press is ignored
    pub const KEY_REPEAT_WINDOW_MS: u64 = 120;
    /// How far below its agent an attached child is placed
    pub const CHILD_VERTICAL_OFFSET: f64 = 170.0;
    /// Horizontal offset of an attached chat model
    pub const CHAT_MODEL_OFFSET_X: f64 = -80.0;
    /// Horizontal offset of an attached memory
    pub const MEMORY_OFFSET_X: f64 = 0.0;
    /// Horizontal offset of an attached tool
    pub const TOOL_OFFSET_X: f64 = 80.0;
    /// Chat models offered by the prompt form
    pub const MODEL_OPTIONS: [&str; 4] = ["gpt-4o", "gpt-4o-mini", "gpt-3.5-turbo", "custom"];
    /// Memory backends offered by the prompt form
    pub const MEMORY_OPTIONS: [&str; 4] = ["buffer", "vector", "redis", "postgres"];
}

/// Per-slot value triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerSlot<T> {
    pub chat_model: T,
    pub memory: T,
    pub tool: T,
}

impl<T> PerSlot<T> {
    pub fn get(&self, slot: Slot) -> &T {
        match slot {
            Slot::ChatModel => &self.chat_model,
            Slot::Memory => &self.memory,
            Slot::Tool => &self.tool,
        }
    }
}

/// Configuration for an [`Editor`](crate::Editor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Delete key presses closer together than this are treated as one
    pub key_repeat_window_ms: u64,
    /// Vertical distance from an agent to its attached children
    pub child_vertical_offset: f64,
    /// Horizontal offset of each attached child relative to its agent
    pub child_offsets_x: PerSlot<f64>,
    /// Labels given to attached children
    pub child_labels: PerSlot<String>,
    /// Options shown for the chat model field
    pub model_options: Vec<String>,
    /// Options shown for the memory type field
    pub memory_options: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            key_repeat_window_ms: defaults::KEY_REPEAT_WINDOW_MS,
            child_vertical_offset: defaults::CHILD_VERTICAL_OFFSET,
            child_offsets_x: PerSlot {
                chat_model: defaults::CHAT_MODEL_OFFSET_X,
                memory: defaults::MEMORY_OFFSET_X,
                tool: defaults::TOOL_OFFSET_X,
            },
            child_labels: PerSlot {
                chat_model: "Chat Model*".to_string(),
                memory: "Memory".to_string(),
                tool: "Tool".to_string(),
            },
            model_options: defaults::MODEL_OPTIONS.iter().map(|s| s.to_string()).collect(),
            memory_options: defaults::MEMORY_OPTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON, filling gaps with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        log::info!("Loaded editor config from {:?}", path);
        Ok(config)
    }

    pub fn key_repeat_window(&self) -> Duration {
        Duration::from_millis(self.key_repeat_window_ms)
    }

    /// Offset of an attached child from its agent's position
    pub fn child_offset(&self, slot: Slot) -> (f64, f64) {
        (*self.child_offsets_x.get(slot), self.child_vertical_offset)
    }

    pub fn child_label(&self, slot: Slot) -> &str {
        self.child_labels.get(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.key_repeat_window(), Duration::from_millis(120));
        assert_eq!(config.child_offset(Slot::ChatModel), (-80.0, 170.0));
        assert_eq!(config.child_offset(Slot::Tool), (80.0, 170.0));
        assert_eq!(config.child_label(Slot::ChatModel), "Chat Model*");
        assert_eq!(config.model_options[0], "gpt-4o");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EditorConfig::from_json(r#"{"keyRepeatWindowMs": 250}"#).unwrap();
        assert_eq!(config.key_repeat_window_ms, 250);
        assert_eq!(config.child_vertical_offset, defaults::CHILD_VERTICAL_OFFSET);
        assert_eq!(config.memory_options.len(), 4);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"childLabels": {{"chatModel": "Model", "memory": "Mem", "tool": "Fn"}}}}"#
        )
        .unwrap();

        let config = EditorConfig::load(file.path()).unwrap();
        assert_eq!(config.child_label(Slot::Tool), "Fn");
        assert_eq!(config.key_repeat_window_ms, defaults::KEY_REPEAT_WINDOW_MS);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = EditorConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, crate::CanvasError::Io(_)));
    }
}
