//! Game session entity - seed, turn log, scene state, and pacing counters

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::SessionId;

/// One compact roll in the turn log: formula and result only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactRoll {
    pub f: String,
    pub r: i64,
}

/// Mechanical outcome recorded per turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage: Option<i64>,
}

/// Compact record of one resolved turn. Only fields that carry information
/// are kept so the persisted log stays small.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnLogEntry {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rolls: Vec<CompactRoll>,
    #[serde(default)]
    pub outcome: TurnOutcome,
}

/// Where the fiction currently takes place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneState {
    pub scene_id: Option<String>,
    pub location_id: Option<String>,
    pub summary: String,
    pub active_threats: Vec<String>,
    pub npcs_present: Vec<String>,
    pub open_hooks: Vec<String>,
    pub established: bool,
}

/// Campaign flavor chosen at setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Setting {
    pub kind: String,
    pub tone_tags: Vec<String>,
}

/// The opening situation generated at session start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartingSituation {
    pub hook: String,
    pub first_scene: String,
    pub immediate_problem: String,
    pub npcs: Vec<String>,
}

/// Everything a new session is seeded with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSetup {
    pub era: String,
    pub setting: Setting,
    pub player_prefs: Vec<String>,
    pub starting_situation: StartingSituation,
}

/// A note the GM keeps after an out-of-character memory recall.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryRecallNote {
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub player_text: String,
    pub goal: String,
    pub sender: String,
    pub facts: Vec<String>,
    pub rumors: Vec<String>,
    pub verified: bool,
}

/// A retcon the table agreed to, kept for dev-mode audits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetconEvent {
    pub turn_index: usize,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub dev_mode_enabled: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            dev_mode_enabled: false,
        }
    }
}

/// A running game session. The seed plus the counters make every dice draw
/// replayable without persisting generator state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub id: SessionId,
    pub seed: u64,
    /// Draws consumed so far across all turns.
    pub roll_index: u64,
    pub turn_index: usize,
    pub exploration_index: u64,
    pub stagnation_index: u64,
    pub era: String,
    pub location: String,
    pub setting: Setting,
    pub scene: SceneState,
    pub turn_log: Vec<TurnLogEntry>,
    pub recent_summary: String,
    pub rolling_summary: String,
    pub gm_memory_notes: Vec<MemoryRecallNote>,
    pub retcon_log: Vec<RetconEvent>,
    pub pacing_tag: Option<String>,
    pub settings: SessionSettings,
    pub setup: Option<SessionSetup>,
}

impl GameSession {
    pub fn new(seed: u64) -> Self {
        Self {
            id: SessionId::new(),
            seed,
            roll_index: 0,
            turn_index: 0,
            exploration_index: 0,
            stagnation_index: 0,
            era: "modern".to_string(),
            location: "an unmarked crossroads".to_string(),
            setting: Setting::default(),
            scene: SceneState::default(),
            turn_log: Vec::new(),
            recent_summary: String::new(),
            rolling_summary: String::new(),
            gm_memory_notes: Vec::new(),
            retcon_log: Vec::new(),
            pacing_tag: None,
            settings: SessionSettings::default(),
            setup: None,
        }
    }

    pub fn from_setup(seed: u64, setup: &SessionSetup) -> Self {
        let mut session = Self::new(seed);
        session.era = setup.era.clone();
        session.setting = setup.setting.clone();
        if !setup.starting_situation.first_scene.is_empty() {
            session.location = setup.starting_situation.first_scene.clone();
        }
        session
            .scene
            .open_hooks
            .extend(setup.player_prefs.iter().cloned());
        if !setup.starting_situation.hook.is_empty() {
            session
                .scene
                .open_hooks
                .push(setup.starting_situation.hook.clone());
        }
        session
            .scene
            .npcs_present
            .extend(setup.starting_situation.npcs.iter().cloned());
        session.setup = Some(setup.clone());
        session
    }

    pub fn with_era(mut self, era: impl Into<String>) -> Self {
        self.era = era.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_dev_mode(mut self, enabled: bool) -> Self {
        self.settings.dev_mode_enabled = enabled;
        self
    }

    /// Append a turn record; the turn index tracks the log length.
    pub fn record_turn(&mut self, entry: TurnLogEntry) {
        self.turn_log.push(entry);
        self.turn_index = self.turn_log.len();
    }
}
