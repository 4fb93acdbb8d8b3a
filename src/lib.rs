//! gm-engine - Deterministic turn resolution for LLM-narrated tabletop sessions
//!
//! The engine receives a player's free-text or structured action, classifies
//! it through an external LLM, routes it through a protocol registry, resolves
//! dice/combat/status mechanics deterministically, and hands narration off to
//! the LLM again. Callers own persistence: every turn returns an immutable
//! [`application::dto::TurnResult`] plus mutated session/character state.

pub mod application;
pub mod domain;
pub mod infrastructure;
