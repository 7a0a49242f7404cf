//! Node palette catalogue and drag payloads

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::NodeKind;

/// Entry in the node palette
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteItem {
    pub kind: NodeKind,
    pub label: String,
    pub group: String,
}

impl PaletteItem {
    pub fn new(kind: NodeKind, label: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            group: group.into(),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.label.to_lowercase().contains(needle) || self.group.to_lowercase().contains(needle)
    }
}

/// The built-in palette
pub fn default_palette() -> Vec<PaletteItem> {
    vec![
        PaletteItem::new(NodeKind::Trigger, "Chat Trigger", "Triggers"),
        PaletteItem::new(NodeKind::AiAgent, "AI Agent", "AI"),
        PaletteItem::new(NodeKind::AiModel, "Chat Model", "AI"),
        PaletteItem::new(NodeKind::Memory, "Memory", "AI"),
        PaletteItem::new(NodeKind::Tool, "Tool", "AI"),
        PaletteItem::new(NodeKind::Action, "HTTP Request", "Actions"),
        PaletteItem::new(NodeKind::Logic, "If / Else", "Logic"),
    ]
}

/// Filter `items` by a case-insensitive query over label or group
///
/// Matches are grouped, with groups in order of first appearance. An
/// empty query returns everything.
pub fn search<'a>(items: &'a [PaletteItem], query: &str) -> Vec<(&'a str, Vec<&'a PaletteItem>)> {
    let needle = query.trim().to_lowercase();
    let mut groups: Vec<(&str, Vec<&PaletteItem>)> = Vec::new();

    for item in items.iter().filter(|item| needle.is_empty() || item.matches(&needle)) {
        match groups.iter_mut().find(|(group, _)| *group == item.group) {
            Some((_, members)) => members.push(item),
            None => groups.push((item.group.as_str(), vec![item])),
        }
    }
    groups
}

/// Resolve a palette label to its kind; unknown labels become actions
pub fn kind_for_label(items: &[PaletteItem], label: &str) -> NodeKind {
    items
        .iter()
        .find(|item| item.label == label)
        .map(|item| item.kind)
        .unwrap_or(NodeKind::Action)
}

/// Data carried by a palette drag and consumed on drop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragPayload {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
}

impl DragPayload {
    /// Payload for dragging the palette entry with `label`
    pub fn for_label(items: &[PaletteItem], label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            kind: kind_for_label(items, &label),
            label,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_groups_in_first_seen_order() {
        let palette = default_palette();
        let groups = search(&palette, "");
        let names: Vec<&str> = groups.iter().map(|(g, _)| *g).collect();
        assert_eq!(names, vec!["Triggers", "AI", "Actions", "Logic"]);
        assert_eq!(groups[1].1.len(), 4);
    }

    #[test]
    fn test_search_matches_label_or_group() {
        let palette = default_palette();

        let groups = search(&palette, "ai");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, "AI");
        assert_eq!(groups[0].1.len(), 4);

        let groups = search(&palette, "  LOGIC ");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1[0].label, "If / Else");

        let groups = search(&palette, "HTTP");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1[0].kind, NodeKind::Action);

        assert!(search(&palette, "nothing like this").is_empty());
    }

    #[test]
    fn test_drag_payload() {
        let palette = default_palette();

        let payload = DragPayload::for_label(&palette, "Memory");
        assert_eq!(payload.kind, NodeKind::Memory);
        assert_eq!(payload.to_json().unwrap(), r#"{"type":"memory","label":"Memory"}"#);

        let unknown = DragPayload::for_label(&palette, "Send Email");
        assert_eq!(unknown.kind, NodeKind::Action);

        let parsed = DragPayload::from_json(r#"{"type":"aiAgent","label":"AI Agent"}"#).unwrap();
        assert_eq!(parsed.kind, NodeKind::AiAgent);
        assert!(DragPayload::from_json(r#"{"type":"robot","label":"x"}"#).is_err());
    }
}
