//! Closed vocabularies shared by the classifier envelope and the turn pipeline

use serde::{Deserialize, Serialize};

/// Fine-grained action a player intent resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Explore,
    SceneRequest,
    Interact,
    Attack,
    UsePower,
    BuyItem,
    Move,
    AskGm,
    ProjectCreate,
    AskClarifyingQuestion,
    Invalid,
    Other,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Explore => "explore",
            ActionType::SceneRequest => "scene_request",
            ActionType::Interact => "interact",
            ActionType::Attack => "attack",
            ActionType::UsePower => "use_power",
            ActionType::BuyItem => "buy_item",
            ActionType::Move => "move",
            ActionType::AskGm => "ask_gm",
            ActionType::ProjectCreate => "project_create",
            ActionType::AskClarifyingQuestion => "ask_clarifying_question",
            ActionType::Invalid => "invalid",
            ActionType::Other => "other",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed step inside the classifier's mechanical plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepType {
    Move,
    Attack,
    Interact,
    Investigate,
    Social,
    UsePower,
    Craft,
    Improvise,
    Downtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeCost {
    None,
    Action,
    Reaction,
    Minutes,
    Hours,
    Days,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Med,
    High,
}

/// Operating mode the classifier judged the player's message to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Gm,
    Ooc,
    Dev,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Reliability label attached to a discovered narrative fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruthGradient {
    Myth,
    Partial,
    Lost,
    False,
    Dangerous,
}

impl TruthGradient {
    pub const ALL: [TruthGradient; 5] = [
        TruthGradient::Myth,
        TruthGradient::Partial,
        TruthGradient::Lost,
        TruthGradient::False,
        TruthGradient::Dangerous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TruthGradient::Myth => "myth",
            TruthGradient::Partial => "partial",
            TruthGradient::Lost => "lost",
            TruthGradient::False => "false",
            TruthGradient::Dangerous => "dangerous",
        }
    }
}

impl std::fmt::Display for TruthGradient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_type_serde_uses_snake_case() {
        let json = serde_json::to_string(&ActionType::AskClarifyingQuestion).unwrap();
        assert_eq!(json, "\"ask_clarifying_question\"");
        let back: ActionType = serde_json::from_str("\"use_power\"").unwrap();
        assert_eq!(back, ActionType::UsePower);
    }

    #[test]
    fn unknown_action_type_is_rejected() {
        assert!(serde_json::from_str::<ActionType>("\"fly\"").is_err());
    }
}
