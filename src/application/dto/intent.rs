//! Intent DTOs - the concrete action extracted from player text

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::ActionType;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub target_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    Walk,
    Run,
    Dash,
    Teleport,
    #[default]
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Movement {
    #[serde(default)]
    pub mode: MovementMode,
    #[serde(default)]
    pub distance: Option<i64>,
    #[serde(default)]
    pub destination: Option<String>,
}

/// A single resolved player intent. Strict on the wire so malformed model
/// output fails parsing instead of slipping through as a half-filled action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Intent {
    pub action_type: ActionType,
    #[serde(default)]
    pub targets: Vec<TargetRef>,
    #[serde(default)]
    pub skill_used: Option<String>,
    #[serde(default)]
    pub power_used: Option<String>,
    #[serde(default)]
    pub item_used: Option<String>,
    #[serde(default)]
    pub movement: Option<Movement>,
    #[serde(default)]
    pub dialogue: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub assumptions: Vec<String>,
}

impl Intent {
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            targets: Vec::new(),
            skill_used: None,
            power_used: None,
            item_used: None,
            movement: None,
            dialogue: None,
            reason: None,
            metadata: None,
            confidence: None,
            assumptions: Vec::new(),
        }
    }

    pub fn with_dialogue(mut self, dialogue: impl Into<String>) -> Self {
        self.dialogue = Some(dialogue.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// The best human-readable label for the first target, if any.
    pub fn target_label(&self) -> Option<String> {
        let target = self.targets.first()?;
        if let Some(name) = &target.name {
            return Some(name.clone());
        }
        if let Some(target_type) = &target.target_type {
            return Some(target_type.clone());
        }
        target.id.map(|id| format!("target:{id}"))
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }

    pub fn resolution(&self) -> Option<&str> {
        self.metadata_str("resolution")
    }
}

/// Input for a narration call: a state snapshot plus what just happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationRequest {
    pub state_summary: serde_json::Value,
    pub outcome: serde_json::Value,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

impl NarrationRequest {
    pub fn new(state_summary: serde_json::Value, outcome: serde_json::Value) -> Self {
        Self {
            state_summary,
            outcome,
            tone: None,
            style: None,
        }
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }
}
