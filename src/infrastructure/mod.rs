//! Infrastructure layer - external adapters and implementations
//!
//! This layer contains:
//! - Ollama: LLM integration for classification, intent, and narration
//! - Persistence: in-memory adapters behind the repository ports
//! - Config: application configuration

pub mod config;
pub mod ollama;
pub mod persistence;
