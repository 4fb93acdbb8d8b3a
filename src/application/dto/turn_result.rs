//! Turn result DTOs - everything a resolved turn reports back

use serde::{Deserialize, Serialize};

use crate::application::dto::Intent;
use crate::domain::entities::Project;
use crate::domain::services::dice::RollLogEntry;
use crate::domain::services::statuses::StatusLedger;
use crate::domain::value_objects::CharacterId;

/// A ready-made follow-up the player can pick instead of typing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub label: String,
    pub action_type: String,
    pub payload: serde_json::Value,
}

impl SuggestedAction {
    pub fn new(label: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action_type: action_type.into(),
            payload: serde_json::json!({}),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Character-side changes after a mechanical turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterDiff {
    pub id: CharacterId,
    pub actions: i64,
    pub reactions: i64,
    pub hp: i64,
    pub ap: i64,
    pub statuses: StatusLedger,
    pub last_roll: Option<i64>,
    pub last_damage: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDiff {
    pub roll_index: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDiff {
    pub character: CharacterDiff,
    pub session: SessionDiff,
}

/// Raw model output and validation trail, for dev surfaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugInfo {
    pub raw_llm_output: Option<String>,
    pub parsed_intent: Option<serde_json::Value>,
    pub validation_errors: Vec<String>,
}

/// The full outcome of one resolved turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    pub intent: Intent,
    pub rolls: Vec<RollLogEntry>,
    /// Free-form mechanical outcome, shape depends on the action taken.
    pub outcome: serde_json::Value,
    pub state_diff: Option<StateDiff>,
    pub narration_prompt_context: serde_json::Value,
    pub narration: String,
    pub suggested_actions: Vec<SuggestedAction>,
    pub needs_clarification: bool,
    pub clarification_question: Option<String>,
    pub clarification_questions: Vec<String>,
    pub project_created: Option<Project>,
    #[serde(flatten)]
    pub debug: DebugInfo,
}

impl TurnResult {
    /// A non-mechanical result: no rolls, no state change.
    pub fn informational(intent: Intent, outcome: serde_json::Value, narration: String) -> Self {
        Self {
            intent,
            rolls: Vec::new(),
            outcome,
            state_diff: None,
            narration_prompt_context: serde_json::json!({}),
            narration,
            suggested_actions: Vec::new(),
            needs_clarification: false,
            clarification_question: None,
            clarification_questions: Vec::new(),
            project_created: None,
            debug: DebugInfo::default(),
        }
    }
}
