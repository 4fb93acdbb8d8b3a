//! Narrative bookkeeping entities - threads, clocks, discoveries, projects,
//! drafts, rulings, memory cards, and the player interest profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::value_objects::{
    ClockId, DiscoveryId, MemoryCardId, ProjectId, RulingId, SystemDraftId, ThreadId,
    TruthGradient,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Open,
    Resolved,
    Abandoned,
}

/// An unresolved story question the table is tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeThread {
    pub id: ThreadId,
    pub created_at: DateTime<Utc>,
    pub kind: String,
    pub status: ThreadStatus,
    pub urgency: String,
    pub text: String,
}

impl NarrativeThread {
    pub fn new(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: ThreadId::new(),
            created_at: Utc::now(),
            kind: kind.into(),
            status: ThreadStatus::Open,
            urgency: "medium".to_string(),
            text: text.into(),
        }
    }

    pub fn with_urgency(mut self, urgency: impl Into<String>) -> Self {
        self.urgency = urgency.into();
        self
    }

    pub fn is_open(&self) -> bool {
        self.status == ThreadStatus::Open
    }
}

/// A progress clock that advances toward an offstage consequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    pub id: ClockId,
    pub name: String,
    pub steps_total: i64,
    pub steps_done: i64,
    pub trigger_tags: Vec<String>,
}

impl Clock {
    pub fn new(name: impl Into<String>, steps_total: i64) -> Self {
        Self {
            id: ClockId::new(),
            name: name.into(),
            steps_total: steps_total.max(1),
            steps_done: 0,
            trigger_tags: Vec::new(),
        }
    }

    pub fn advance(&mut self, steps: i64) {
        self.steps_done = (self.steps_done + steps.max(0)).min(self.steps_total);
    }

    pub fn is_filled(&self) -> bool {
        self.steps_done >= self.steps_total
    }

    pub fn is_active(&self) -> bool {
        !self.is_filled()
    }
}

/// A piece of lore surfaced during exploration, tagged with how true it is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discovery {
    pub id: DiscoveryId,
    pub created_at: DateTime<Utc>,
    pub gradient: TruthGradient,
    pub summary_text: String,
    pub tags: Vec<String>,
}

impl Discovery {
    pub fn new(gradient: TruthGradient, summary_text: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            id: DiscoveryId::new(),
            created_at: Utc::now(),
            gradient,
            summary_text: summary_text.into(),
            tags,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Complete,
    Abandoned,
}

/// Multi-turn craft or improvise effort, measured in work units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub kind: String,
    pub work_units_total: i64,
    pub work_units_done: i64,
    pub status: ProjectStatus,
    /// Clarifications still needed before work can proceed confidently.
    pub open_questions: Vec<String>,
}

impl Project {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, work_units_total: i64) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            kind: kind.into(),
            work_units_total: work_units_total.max(1),
            work_units_done: 0,
            status: ProjectStatus::Active,
            open_questions: Vec::new(),
        }
    }

    pub fn with_questions(mut self, questions: Vec<String>) -> Self {
        self.open_questions = questions;
        self
    }

    pub fn advance(&mut self, units: i64) {
        self.work_units_done = (self.work_units_done + units.max(0)).min(self.work_units_total);
        if self.work_units_done >= self.work_units_total {
            self.status = ProjectStatus::Complete;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftMechanic {
    Project,
    Roll,
    Status,
}

/// One line item inside a system draft scaffold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftItem {
    pub mechanic: DraftMechanic,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl DraftItem {
    pub fn new(mechanic: DraftMechanic, description: impl Into<String>) -> Self {
        Self {
            mechanic,
            description: description.into(),
            payload: None,
        }
    }
}

/// A drafted subsystem awaiting GM review, never live rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemDraft {
    pub id: SystemDraftId,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub inputs: Vec<DraftItem>,
    pub process: Vec<DraftItem>,
    pub outputs: Vec<DraftItem>,
    pub costs: Vec<DraftItem>,
    pub risks: Vec<DraftItem>,
    pub checks: Vec<DraftItem>,
}

impl SystemDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SystemDraftId::new(),
            created_at: Utc::now(),
            name: name.into(),
            inputs: Vec::new(),
            process: Vec::new(),
            outputs: Vec::new(),
            costs: Vec::new(),
            risks: Vec::new(),
            checks: Vec::new(),
        }
    }
}

/// A ruling on a rules edge case, persisted so it applies consistently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ruling {
    pub id: RulingId,
    pub created_at: DateTime<Utc>,
    pub question: String,
    pub ruling: String,
    pub affected_systems: Vec<String>,
}

impl Ruling {
    pub fn new(question: impl Into<String>, ruling: impl Into<String>) -> Self {
        Self {
            id: RulingId::new(),
            created_at: Utc::now(),
            question: question.into(),
            ruling: ruling.into(),
            affected_systems: Vec::new(),
        }
    }
}

/// Durable summary card keyed by entity so compaction can upsert in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCard {
    pub id: MemoryCardId,
    pub entity_type: String,
    pub name: String,
    pub summary_text: String,
    pub updated_at: DateTime<Utc>,
}

impl MemoryCard {
    pub fn new(
        entity_type: impl Into<String>,
        name: impl Into<String>,
        summary_text: impl Into<String>,
    ) -> Self {
        Self {
            id: MemoryCardId::new(),
            entity_type: entity_type.into(),
            name: name.into(),
            summary_text: summary_text.into(),
            updated_at: Utc::now(),
        }
    }
}

/// One interest category tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InterestEntry {
    pub count: u64,
    pub weight: f64,
}

pub const INTEREST_CATEGORIES: [&str; 6] = [
    "combat",
    "crafting",
    "mystery",
    "politics",
    "horror",
    "exploration",
];

/// Per-session tally of what kinds of play the player gravitates toward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub interests: BTreeMap<String, InterestEntry>,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            interests: INTEREST_CATEGORIES
                .iter()
                .map(|name| (name.to_string(), InterestEntry::default()))
                .collect(),
        }
    }
}

impl PlayerProfile {
    /// Bump the category an action maps to; actions outside the mapping
    /// leave the profile untouched.
    pub fn record_action(&mut self, action_type: &str) {
        let category = match action_type {
            "attack" | "use_power" => "combat",
            "buy_item" | "project_create" => "crafting",
            "explore" | "scene_request" | "move" => "exploration",
            "interact" => "politics",
            "ask_gm" => "mystery",
            _ => return,
        };
        let entry = self.interests.entry(category.to_string()).or_default();
        entry.count += 1;
        entry.weight += 1.0;
    }

    /// Highest-weight category, defaulting to mystery for a fresh profile.
    pub fn top_interest(&self) -> &str {
        self.interests
            .iter()
            .filter(|(_, entry)| entry.count > 0)
            .max_by(|a, b| {
                a.1.weight
                    .partial_cmp(&b.1.weight)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(name, _)| name.as_str())
            .unwrap_or("mystery")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_fills_and_stops_at_total() {
        let mut clock = Clock::new("Reactor Meltdown", 4);
        clock.advance(3);
        assert!(clock.is_active());
        clock.advance(5);
        assert!(clock.is_filled());
        assert_eq!(clock.steps_done, 4);
    }

    #[test]
    fn project_completes_when_work_units_fill() {
        let mut project = Project::new("Signal Booster", "craft", 3);
        project.advance(2);
        assert_eq!(project.status, ProjectStatus::Active);
        project.advance(1);
        assert_eq!(project.status, ProjectStatus::Complete);
    }

    #[test]
    fn profile_records_mapped_actions_only() {
        let mut profile = PlayerProfile::default();
        profile.record_action("attack");
        profile.record_action("attack");
        profile.record_action("explore");
        profile.record_action("ask_clarifying_question");
        assert_eq!(profile.interests["combat"].count, 2);
        assert_eq!(profile.interests["exploration"].count, 1);
        assert_eq!(profile.top_interest(), "combat");
    }

    #[test]
    fn fresh_profile_defaults_to_mystery() {
        assert_eq!(PlayerProfile::default().top_interest(), "mystery");
    }
}
