//! Turn envelope DTOs - the structured classification returned by the model
//! before any mechanics run

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Confidence, Mode, PlanStepType, RiskLevel, TimeCost};

/// What kind of play the request falls under.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Classification {
    pub primary_category: String,
    #[serde(default)]
    pub secondary_category: Option<String>,
}

/// One step of the model's proposed plan for the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GmPlanStep {
    #[serde(rename = "type")]
    pub step_type: PlanStepType,
    pub actor_id: i64,
    pub targets: Vec<String>,
    #[serde(default)]
    pub skill_used: Option<String>,
    #[serde(default)]
    pub power_used: Option<String>,
    pub time_cost: TimeCost,
    pub risk_level: RiskLevel,
    pub notes: String,
    #[serde(default)]
    pub complexity: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Npc,
    Monster,
    Item,
    Location,
    System,
    Book,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentPurpose {
    Challenge,
    Reward,
    Scare,
    Tension,
    Relax,
    Plot,
    Flavor,
}

/// A request for content the current world does not have yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentRequest {
    pub kind: ContentKind,
    pub purpose: ContentPurpose,
    #[serde(default)]
    pub era: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub difficulty: Option<String>,
    pub constraints: serde_json::Value,
    pub reason: String,
}

/// Internal deliberation notes. Only surfaced in dev mode or on low
/// confidence; otherwise stripped before the envelope is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Council {
    #[serde(default)]
    pub planner_notes: Option<String>,
    #[serde(default)]
    pub validator_notes: Option<String>,
    #[serde(default)]
    pub lorekeeper_notes: Option<String>,
    #[serde(default)]
    pub director_notes: Option<String>,
    #[serde(default)]
    pub speaker_outline: Option<String>,
}

/// The model's classification of a player request. The protocol id stays a
/// raw string here so routing can treat unknown values explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TurnEnvelope {
    pub mode: Mode,
    pub protocol_id: String,
    pub confidence: Confidence,
    pub classification: Classification,
    #[serde(default)]
    pub ooc_questions: Vec<String>,
    #[serde(default)]
    pub gm_plan: Option<Vec<GmPlanStep>>,
    #[serde(default)]
    pub content_requests: Option<Vec<ContentRequest>>,
    #[serde(default)]
    pub memory_suggestions: Option<serde_json::Value>,
    #[serde(default)]
    pub dev_report: Option<serde_json::Value>,
    #[serde(default)]
    pub council: Option<Council>,
}

impl TurnEnvelope {
    /// Cap out-of-character questions at the wire limit of three.
    pub fn truncate_ooc_questions(&mut self) {
        self.ooc_questions.truncate(3);
    }
}
