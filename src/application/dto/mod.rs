//! Data transfer objects shared across application services

mod envelope;
mod intent;
mod turn_result;

pub use envelope::{
    Classification, ContentKind, ContentPurpose, ContentRequest, Council, GmPlanStep, TurnEnvelope,
};
pub use intent::{Intent, Movement, MovementMode, NarrationRequest, TargetRef};
pub use turn_result::{
    CharacterDiff, DebugInfo, SessionDiff, StateDiff, SuggestedAction, TurnResult,
};
