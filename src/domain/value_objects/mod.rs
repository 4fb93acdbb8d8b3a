//! Value objects - closed vocabularies, typed ids, and static configuration

mod action;
mod ids;
mod protocol;
mod status;

pub use action::{
    ActionType, Confidence, Mode, PlanStepType, RiskLevel, TimeCost, TruthGradient,
};
pub use ids::{
    CharacterId, ClockId, DiscoveryId, MemoryCardId, ProjectId, RulingId, SessionId,
    SystemDraftId, ThreadId,
};
pub use protocol::{
    ProtocolEntry, ProtocolId, ProtocolRegistry, RegistryError, TimePolicy, UnknownProtocol,
};
pub use status::{StatusEntry, StatusError, StatusName};
