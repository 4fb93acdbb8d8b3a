//! Domain entities - core game objects with identity

mod character;
mod combatant;
mod narrative;
mod session;

pub use character::{DerivedStats, PlayerCharacter, Resources};
pub use combatant::{Combatant, Weapon};
pub use narrative::{
    Clock, Discovery, DraftItem, DraftMechanic, InterestEntry, MemoryCard, NarrativeThread,
    PlayerProfile, Project, ProjectStatus, Ruling, SystemDraft, ThreadStatus, INTEREST_CATEGORIES,
};
pub use session::{
    CompactRoll, GameSession, MemoryRecallNote, RetconEvent, SceneState, SessionSettings,
    SessionSetup, Setting, StartingSituation, TurnLogEntry, TurnOutcome,
};
