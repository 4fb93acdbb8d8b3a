//! Application services - turn resolution, routing, and the narrative
//! pressure valves around it

pub mod exploration_service;
pub mod memory_service;
pub mod router;
pub mod stagnation_service;
pub mod turn_service;

pub use exploration_service::ExplorationOutcome;
pub use router::{ProtocolRouter, RoutedDecision};
pub use stagnation_service::{StagnationAction, StagnationOutcome};
pub use turn_service::{TurnConfig, TurnService};
