//! Ollama client - LLM adapter for envelope classification, intent
//! extraction, and narration
//!
//! Structured calls (envelope, intent) run at temperature zero with JSON
//! formatting enforced and up to three attempts, feeding the parse error back
//! to the model between attempts. Narration runs warmer and never fails:
//! a fixed fallback line covers model outages.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::dto::{Intent, NarrationRequest, TurnEnvelope};
use crate::application::ports::outbound::{EnvelopeContext, IntentContext, LlmPort};
use crate::domain::value_objects::{Confidence, ProtocolId};

const MAX_ATTEMPTS: usize = 3;
const STRUCTURED_TEMPERATURE: f32 = 0.0;
const NARRATION_TEMPERATURE: f32 = 0.7;
const NARRATION_FALLBACK: &str = "The scene pauses for clarification before continuing.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: ChatOptions,
}

#[derive(Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// HTTP client for an Ollama server's `/api/chat` endpoint.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    async fn chat(&self, messages: &[ChatMessage], temperature: f32, json: bool) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            format: json.then_some("json"),
            options: ChatOptions { temperature },
        };
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .context("Ollama request failed")?
            .error_for_status()
            .context("Ollama returned an error status")?;
        let body: ChatResponse = response
            .json()
            .await
            .context("Ollama response was not valid JSON")?;
        Ok(body.message.content)
    }

    /// Call the model with JSON formatting enforced and parse the reply,
    /// feeding the failure back to the model between attempts.
    async fn structured_call<T: serde::de::DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<T> {
        let mut messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_message),
        ];
        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.chat(&messages, STRUCTURED_TEMPERATURE, true).await {
                Ok(raw) => match serde_json::from_str::<T>(salvage_json(&raw)) {
                    Ok(value) => return Ok(value),
                    Err(err) => {
                        debug!(attempt, error = %err, "structured output failed to parse");
                        messages.push(ChatMessage::user(format!(
                            "Previous reply was not valid: {err}. \
                             Return only a single JSON object matching the schema, with no extra text."
                        )));
                        last_error = Some(anyhow::Error::new(err));
                    }
                },
                Err(err) => {
                    warn!(attempt, error = %err, "Ollama call failed");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("structured call produced no output")))
    }
}

#[async_trait]
impl LlmPort for OllamaClient {
    async fn generate_turn_envelope(
        &self,
        player_text: &str,
        context: &EnvelopeContext,
    ) -> Result<TurnEnvelope> {
        let system_prompt = envelope_system_prompt();
        let user_message = format!(
            "Context:\n{}\n\nPlayer request:\n{}",
            serde_json::to_string_pretty(context)?,
            player_text
        );
        let mut envelope: TurnEnvelope = self.structured_call(&system_prompt, &user_message).await?;
        envelope.truncate_ooc_questions();
        apply_council_gate(&mut envelope, context.dev_mode_enabled);
        Ok(envelope)
    }

    async fn extract_intent(&self, player_text: &str, context: &IntentContext) -> Result<Intent> {
        let system_prompt = intent_system_prompt(context);
        let user_message = format!("Player request:\n{player_text}");
        self.structured_call(&system_prompt, &user_message).await
    }

    async fn generate_narration(&self, request: &NarrationRequest) -> String {
        let system_prompt = narration_system_prompt(request);
        let user_message = match serde_json::to_string_pretty(&request.outcome) {
            Ok(outcome) => format!("Narrate this outcome:\n{outcome}"),
            Err(_) => "Narrate the current moment.".to_string(),
        };
        let messages = [
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_message),
        ];
        match self.chat(&messages, NARRATION_TEMPERATURE, false).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => NARRATION_FALLBACK.to_string(),
            Err(err) => {
                warn!(error = %err, "narration call failed, using fallback");
                NARRATION_FALLBACK.to_string()
            }
        }
    }
}

/// Strip any prose around the JSON object a model wrapped its reply in.
fn salvage_json(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}

/// Council notes are internal deliberation. They only survive into the
/// envelope in dev mode or when the model flags low confidence.
fn apply_council_gate(envelope: &mut TurnEnvelope, dev_mode_enabled: bool) {
    if !dev_mode_enabled && envelope.confidence != Confidence::Low {
        envelope.council = None;
    }
}

fn envelope_system_prompt() -> String {
    let protocols = ProtocolId::ALL
        .iter()
        .map(|id| format!("- {id}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are the turn classifier for a tabletop RPG engine. \
         Classify the player's request into a turn envelope.\n\
         Reply with a single JSON object with these fields:\n\
         - mode: \"gm\" | \"ooc\" | \"dev\"\n\
         - protocol_id: one of the protocols below\n\
         - confidence: \"high\" | \"medium\" | \"low\"\n\
         - classification: {{\"primary_category\": string, \"secondary_category\": string?}}\n\
         - ooc_questions: up to 3 out-of-character questions (optional)\n\
         - gm_plan: list of plan steps (optional), each \
           {{\"type\", \"actor_id\", \"targets\", \"time_cost\", \"risk_level\", \"notes\", \"complexity\"?}}\n\
         Protocols:\n{protocols}\n\
         Use PROTO_ROUTINE for ordinary in-fiction actions. \
         Do not add fields outside the schema."
    )
}

fn intent_system_prompt(context: &IntentContext) -> String {
    format!(
        "You extract a single concrete game intent from player text.\n\
         Era: {}\n\
         Available actions: {}\n\
         Available powers: {}\n\
         Reply with one JSON object: {{\"action_type\": one of the available actions, \
         or \"ask_clarifying_question\" | \"invalid\", \
         \"targets\": [{{\"id\"?, \"name\"?, \"type\"?}}], \"skill_used\"?, \"power_used\"?, \
         \"item_used\"?, \"movement\"?: {{\"mode\", \"distance\"?, \"destination\"?}}, \
         \"dialogue\"?, \"reason\"?, \"confidence\"?: 0..1}}.\n\
         Do not invent powers or items the player does not have.",
        context.era,
        context.available_actions.join(", "),
        context.available_powers.join(", "),
    )
}

fn narration_system_prompt(request: &NarrationRequest) -> String {
    let tone = request.tone.as_deref().unwrap_or("grounded");
    let state = serde_json::to_string(&request.state_summary).unwrap_or_default();
    format!(
        "You narrate one beat of a tabletop RPG session in second person. \
         Tone: {tone}. Keep it to a short paragraph, stay consistent with \
         the scene state, and never invent mechanical outcomes.\n\
         Scene state: {state}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::Classification;
    use crate::domain::value_objects::Mode;

    fn envelope(confidence: Confidence) -> TurnEnvelope {
        TurnEnvelope {
            mode: Mode::Gm,
            protocol_id: "PROTO_ROUTINE".to_string(),
            confidence,
            classification: Classification {
                primary_category: "general".to_string(),
                secondary_category: None,
            },
            ooc_questions: Vec::new(),
            gm_plan: None,
            content_requests: None,
            memory_suggestions: None,
            dev_report: None,
            council: Some(Default::default()),
        }
    }

    #[test]
    fn salvage_json_strips_surrounding_prose() {
        assert_eq!(salvage_json("Here you go: {\"a\": 1} done"), "{\"a\": 1}");
        assert_eq!(salvage_json("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(salvage_json("no json here"), "no json here");
    }

    #[test]
    fn council_notes_are_stripped_outside_dev_mode() {
        let mut high = envelope(Confidence::High);
        apply_council_gate(&mut high, false);
        assert!(high.council.is_none());

        let mut low = envelope(Confidence::Low);
        apply_council_gate(&mut low, false);
        assert!(low.council.is_some());

        let mut dev = envelope(Confidence::High);
        apply_council_gate(&mut dev, true);
        assert!(dev.council.is_some());
    }

    #[test]
    fn envelope_prompt_lists_every_protocol() {
        let prompt = envelope_system_prompt();
        for id in ProtocolId::ALL {
            assert!(prompt.contains(id.as_str()), "missing {id}");
        }
    }
}
