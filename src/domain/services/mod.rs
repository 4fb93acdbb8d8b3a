//! Domain services - pure rules logic with no external dependencies

pub mod combat;
pub mod dice;
pub mod statuses;

pub use combat::{
    base_actions, end_turn, initiative_order, resolve_attack, roll_initiative, AttackOptions,
    AttackResult, CalledShotEffect, CombatError, CounterResult, EndTurnReport, Reaction,
    ReactionChoice, CALLED_SHOT_PENALTY, DODGE_BONUS_DEFAULT,
};
pub use dice::{DiceError, DiceSession, RollLogEntry};
pub use statuses::{StatusLedger, TickKind, TickOutcome};
