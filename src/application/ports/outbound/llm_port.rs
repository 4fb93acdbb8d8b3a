//! LLM port - interface for envelope classification, intent extraction,
//! and narration

use anyhow::Result;
use async_trait::async_trait;

use crate::application::dto::{Intent, NarrationRequest, TurnEnvelope};

/// Context handed to the classifier alongside the raw player text.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct EnvelopeContext {
    pub era: String,
    pub scene_summary: String,
    pub scene_established: bool,
    pub open_hooks: Vec<String>,
    pub dev_mode_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<serde_json::Value>,
}

/// Context for intent extraction: what the character can currently do.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IntentContext {
    pub era: String,
    pub available_actions: Vec<String>,
    pub available_powers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Port for the language model behind the table.
///
/// Envelope and intent calls are fallible; narration always produces text,
/// with the adapter supplying a fixed fallback line when the model fails.
#[async_trait]
pub trait LlmPort: Send + Sync {
    /// Classify a player request into a turn envelope.
    async fn generate_turn_envelope(
        &self,
        player_text: &str,
        context: &EnvelopeContext,
    ) -> Result<TurnEnvelope>;

    /// Extract a concrete intent from player text.
    async fn extract_intent(&self, player_text: &str, context: &IntentContext) -> Result<Intent>;

    /// Narrate an outcome. Infallible by contract.
    async fn generate_narration(&self, request: &NarrationRequest) -> String;
}
