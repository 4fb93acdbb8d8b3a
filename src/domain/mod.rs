//! Domain layer - rules, entities, and value objects
//!
//! This layer contains:
//! - Entities: GameSession, PlayerCharacter, Combatant, narrative records
//! - Value Objects: status names, protocol registry, action vocabularies, ids
//! - Domain Services: dice, status ledger, combat resolution

pub mod entities;
pub mod services;
pub mod value_objects;
