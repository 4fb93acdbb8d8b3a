//! Turn service - the full resolution pipeline for one player turn
//!
//! Orders the turn strictly: scene establishment, memory recall triggers,
//! envelope classification, protocol routing, validation, deterministic
//! mechanics, narration, then post-turn bookkeeping (profile update, ruling
//! persistence, log compaction).

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::application::dto::{
    CharacterDiff, DebugInfo, GmPlanStep, Intent, NarrationRequest, SessionDiff, StateDiff,
    SuggestedAction, TurnEnvelope, TurnResult,
};
use crate::application::ports::outbound::{
    EnvelopeContext, IntentContext, LlmPort, MemoryRepositoryPort, NarrativeRepositoryPort,
    ProjectRepositoryPort,
};
use crate::application::services::router::{ProtocolRouter, RoutedDecision};
use crate::application::services::{exploration_service, memory_service, stagnation_service};
use crate::domain::entities::{
    CompactRoll, DraftItem, DraftMechanic, GameSession, MemoryRecallNote, NarrativeThread,
    PlayerCharacter, Project, RetconEvent, Ruling, SystemDraft, TurnLogEntry, TurnOutcome,
};
use crate::domain::services::dice::{DiceSession, RollLogEntry};
use crate::domain::value_objects::{ActionType, PlanStepType, ProtocolId, TimeCost};

const TARGET_AR_DEFAULT: i64 = 12;
const DEFAULT_WEAPON_DAMAGE: &str = "1d6";

#[derive(Debug, Clone, thiserror::Error)]
enum ValidationError {
    #[error("Action not allowed right now.")]
    ActionNotAllowed,
    #[error("Not enough actions.")]
    NotEnoughActions,
    #[error("Powers are locked outside the Space era.")]
    PowersLocked,
}

#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Turn-log length at which old turns fold into the rolling summary.
    pub compaction_threshold: usize,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            compaction_threshold: 100,
        }
    }
}

/// Resolves player turns against the session state and the outbound ports.
pub struct TurnService<L: LlmPort> {
    llm: Arc<L>,
    narrative: Arc<dyn NarrativeRepositoryPort>,
    projects: Arc<dyn ProjectRepositoryPort>,
    memory: Arc<dyn MemoryRepositoryPort>,
    router: ProtocolRouter,
    config: TurnConfig,
}

impl<L: LlmPort> TurnService<L> {
    pub fn new(
        llm: Arc<L>,
        narrative: Arc<dyn NarrativeRepositoryPort>,
        projects: Arc<dyn ProjectRepositoryPort>,
        memory: Arc<dyn MemoryRepositoryPort>,
        router: ProtocolRouter,
        config: TurnConfig,
    ) -> Self {
        Self {
            llm,
            narrative,
            projects,
            memory,
            router,
            config,
        }
    }

    /// Resolve one turn end to end, including post-turn bookkeeping.
    pub async fn execute_turn(
        &self,
        session: &mut GameSession,
        character: &mut PlayerCharacter,
        player_text: &str,
        intent_override: Option<Intent>,
        payload: Option<serde_json::Value>,
    ) -> Result<TurnResult> {
        let result = self
            .resolve_turn(session, character, player_text, intent_override, payload)
            .await?;

        self.persist_ruling_note(session, &result.outcome).await?;
        self.update_profile(session, &result.intent).await?;
        self.compact_memories(session).await?;
        Ok(result)
    }

    async fn resolve_turn(
        &self,
        session: &mut GameSession,
        character: &mut PlayerCharacter,
        player_text: &str,
        intent_override: Option<Intent>,
        payload: Option<serde_json::Value>,
    ) -> Result<TurnResult> {
        let mut debug_info = DebugInfo::default();

        if is_memory_recall_request(player_text) {
            let threads = self.narrative.list_threads(session.id).await?;
            return Ok(self
                .memory_recall_result(session, player_text, &threads, debug_info)
                .await);
        }

        if !session.scene.established {
            return Ok(self.scene_intro_result(session, debug_info).await);
        }

        if let Some(intent) = intent_override {
            debug_info.parsed_intent = serde_json::to_value(&intent).ok();
            return self
                .execute_intent_pipeline(session, character, intent, player_text, debug_info)
                .await;
        }

        let envelope = match self
            .llm
            .generate_turn_envelope(player_text, &envelope_context(session, payload.as_ref()))
            .await
        {
            Ok(mut envelope) => {
                envelope.truncate_ooc_questions();
                envelope
            }
            Err(err) => {
                warn!(error = %err, "turn envelope generation failed");
                debug_info.validation_errors.push(err.to_string());
                let intent = Intent::new(ActionType::AskClarifyingQuestion)
                    .with_reason("Turn envelope could not be generated.");
                return Ok(self
                    .clarify_turn_result(
                        session,
                        intent,
                        Some(vec![
                            "Could you clarify what you want to do next?".to_string()
                        ]),
                        debug_info,
                    )
                    .await);
            }
        };

        let decision = self.router.route(&envelope, session.settings.dev_mode_enabled);
        debug!(protocol = %decision.protocol_id, execute = decision.execute, "envelope routed");

        match decision.protocol_id {
            ProtocolId::RetconDispute => {
                return Ok(self.retcon_dispute_result(session, debug_info));
            }
            ProtocolId::RuleEdgeCase => {
                return Ok(self.rule_edge_case_result(session, player_text, &envelope, debug_info));
            }
            ProtocolId::ContentGap => {
                return self
                    .content_gap_result(session, player_text, &envelope, debug_info)
                    .await;
            }
            ProtocolId::Exploration => {
                return self
                    .exploration_result(session, player_text, debug_info)
                    .await;
            }
            ProtocolId::MemoryRecall => {
                let threads = self.narrative.list_threads(session.id).await?;
                return Ok(self
                    .memory_recall_result(session, player_text, &threads, debug_info)
                    .await);
            }
            ProtocolId::Stagnation => {
                return self.stagnation_result(session, debug_info).await;
            }
            _ => {}
        }

        if decision.freeze_time || !decision.execute {
            return Ok(self
                .frozen_decision_result(session, &decision, debug_info)
                .await);
        }

        if let Some(plan) = envelope.gm_plan.as_deref() {
            if let Some(result) = self
                .maybe_create_project(session, plan, &mut debug_info)
                .await?
            {
                return Ok(result);
            }
        }

        let intent = match self
            .llm
            .extract_intent(player_text, &intent_context(session, character))
            .await
        {
            Ok(intent) => {
                debug_info.parsed_intent = serde_json::to_value(&intent).ok();
                intent
            }
            Err(err) => {
                debug_info.validation_errors.push(err.to_string());
                Intent::new(ActionType::AskClarifyingQuestion)
                    .with_dialogue("Could you clarify your intended action?")
            }
        };
        self.execute_intent_pipeline(session, character, intent, player_text, debug_info)
            .await
    }

    async fn execute_intent_pipeline(
        &self,
        session: &mut GameSession,
        character: &mut PlayerCharacter,
        intent: Intent,
        player_text: &str,
        mut debug_info: DebugInfo,
    ) -> Result<TurnResult> {
        if should_log_retcon(&intent, session) {
            session.retcon_log.push(RetconEvent {
                turn_index: session.turn_index,
                note: intent
                    .dialogue
                    .clone()
                    .or_else(|| intent.reason.clone())
                    .unwrap_or_else(|| "retcon requested".to_string()),
            });
            info!("retcon event logged");
        }

        if let Some(reason) = impossible_action_reason(&intent, &session.era, player_text) {
            debug_info.validation_errors.push(reason.clone());
            let clarify = Intent::new(ActionType::AskClarifyingQuestion).with_reason(reason);
            return Ok(self
                .clarify_turn_result(
                    session,
                    clarify,
                    Some(vec![
                        "Flee the area on foot.".to_string(),
                        "Use known equipment.".to_string(),
                        "Attempt something unconventional within the scene.".to_string(),
                    ]),
                    debug_info,
                )
                .await);
        }

        if matches!(
            intent.action_type,
            ActionType::AskClarifyingQuestion | ActionType::Invalid
        ) {
            return Ok(self
                .clarify_turn_result(session, intent, None, debug_info)
                .await);
        }

        if let Err(err) = validate_intent(&intent, &session.era, character) {
            debug_info.validation_errors.push(err.to_string());
            let clarify =
                Intent::new(ActionType::AskClarifyingQuestion).with_reason(err.to_string());
            return Ok(self
                .clarify_turn_result(session, clarify, None, debug_info)
                .await);
        }

        let mut dice = DiceSession::new(session.seed);
        dice.fast_forward(session.roll_index);
        let outcome_map = execute_mechanics(&mut dice, &intent, character);
        let cost = action_cost(intent.action_type);

        character.resources.actions -= cost;
        character.last_roll = outcome_map
            .get("attack_roll")
            .and_then(serde_json::Value::as_i64);
        character.last_damage = outcome_map.get("damage").and_then(serde_json::Value::as_i64);

        let rolls = dice.log().to_vec();
        session.roll_index += dice.draws_consumed();
        session.record_turn(compact_log_entry(&intent, &rolls, &outcome_map));

        let state_diff = StateDiff {
            character: CharacterDiff {
                id: character.id,
                actions: character.resources.actions,
                reactions: character.resources.reactions,
                hp: character.derived.hp,
                ap: character.derived.ap,
                statuses: character.statuses.clone(),
                last_roll: character.last_roll,
                last_damage: character.last_damage,
            },
            session: SessionDiff {
                roll_index: session.roll_index,
            },
        };

        let mut outcome = serde_json::Value::Object(outcome_map);
        let narration = self
            .llm
            .generate_narration(
                &NarrationRequest::new(
                    json!({
                        "era": &session.era,
                        "location": &session.location,
                        "current_scene": &session.scene.summary,
                        "character_id": character.id,
                        "resources": &character.resources,
                    }),
                    outcome.clone(),
                )
                .with_tone("grounded"),
            )
            .await;
        outcome["narration"] = json!(&narration);

        if character.is_down() {
            outcome["death"] = json!(true);
            let journal = self
                .llm
                .generate_narration(
                    &NarrationRequest::new(
                        json!({
                            "era": &session.era,
                            "location": &session.location,
                            "character_id": character.id,
                            "event": "death",
                        }),
                        outcome.clone(),
                    )
                    .with_tone("elegiac"),
                )
                .await;
            outcome["death_journal"] = json!(journal);
        } else {
            outcome["death"] = json!(false);
        }

        let narration_context = json!({
            "era": &session.era,
            "location": &session.location,
            "intent": &intent,
            "outcome": &outcome,
        });

        Ok(TurnResult {
            intent,
            rolls,
            outcome,
            state_diff: Some(state_diff),
            narration_prompt_context: narration_context,
            narration,
            suggested_actions: build_suggested_actions(&available_actions()),
            needs_clarification: false,
            clarification_question: None,
            clarification_questions: Vec::new(),
            project_created: None,
            debug: debug_info,
        })
    }

    async fn frozen_decision_result(
        &self,
        session: &mut GameSession,
        decision: &RoutedDecision,
        debug_info: DebugInfo,
    ) -> TurnResult {
        let questions = if decision.ooc_questions.is_empty() {
            vec!["Choose an action to proceed.".to_string()]
        } else {
            decision.ooc_questions.clone()
        };
        let intent = Intent::new(ActionType::AskClarifyingQuestion).with_reason(
            decision
                .reason
                .clone()
                .unwrap_or_else(|| "clarification".to_string()),
        );
        self.clarify_turn_result(session, intent, Some(questions), debug_info)
            .await
    }

    async fn clarify_turn_result(
        &self,
        session: &mut GameSession,
        intent: Intent,
        clarification_questions: Option<Vec<String>>,
        debug_info: DebugInfo,
    ) -> TurnResult {
        let question = intent
            .reason
            .clone()
            .or_else(|| intent.dialogue.clone())
            .unwrap_or_else(|| "Please clarify your intended action.".to_string());
        let questions = match clarification_questions {
            Some(questions) if !questions.is_empty() => questions,
            _ => vec![question.clone()],
        };
        let scene_text = self.ensure_scene_text(session).await;
        let suggested_actions = build_suggested_actions(&available_actions());
        let narration = scene_update_text(&scene_text, &suggested_actions);
        let outcome = json!({
            "clarify": true,
            "message": &question,
            "narration": &narration,
        });
        let narration_context = json!({
            "era": &session.era,
            "location": &session.location,
            "intent": &intent,
            "outcome": &outcome,
        });
        TurnResult {
            intent,
            rolls: Vec::new(),
            outcome,
            state_diff: None,
            narration_prompt_context: narration_context,
            narration,
            suggested_actions,
            needs_clarification: true,
            clarification_question: Some(question),
            clarification_questions: questions,
            project_created: None,
            debug: debug_info,
        }
    }

    async fn scene_intro_result(
        &self,
        session: &mut GameSession,
        debug_info: DebugInfo,
    ) -> TurnResult {
        let scene_text = self.ensure_scene_text(session).await;
        let suggested_actions = build_suggested_actions(&available_actions());
        let mut lines = vec![
            scene_text,
            "Choose a next action from the options below.".to_string(),
        ];
        lines.extend(format_suggested_actions(&suggested_actions));
        let narration = lines.join("\n");
        let intent = Intent::new(ActionType::AskClarifyingQuestion)
            .with_dialogue("Choose an action to proceed.");
        let outcome = json!({"scene_established": true, "narration": &narration});
        let narration_context = json!({
            "era": &session.era,
            "location": &session.location,
            "intent": &intent,
            "outcome": {"scene_established": true},
        });
        TurnResult {
            intent,
            rolls: Vec::new(),
            outcome,
            state_diff: None,
            narration_prompt_context: narration_context,
            narration,
            suggested_actions,
            needs_clarification: true,
            clarification_question: Some("Choose an action to proceed.".to_string()),
            clarification_questions: vec!["Choose an action to proceed.".to_string()],
            project_created: None,
            debug: debug_info,
        }
    }

    /// Establish the scene if needed and return its text.
    async fn ensure_scene_text(&self, session: &mut GameSession) -> String {
        if session.scene.established && !session.scene.summary.trim().is_empty() {
            return session.scene.summary.clone();
        }
        let location = if session.location.is_empty() {
            "unknown location".to_string()
        } else {
            session.location.clone()
        };
        let slug = slugify(&location);
        session.scene.scene_id = Some(format!("{slug}_entrance"));
        session.scene.location_id = Some(slug);
        session.scene.open_hooks = vec![
            "Why this place matters".to_string(),
            "Who sent you".to_string(),
        ];
        let mut text = self
            .llm
            .generate_narration(
                &NarrationRequest::new(
                    json!({
                        "era": &session.era,
                        "location": &session.location,
                        "setting": &session.setting,
                        "scene_lock": {
                            "established": session.scene.established,
                            "summary": &session.scene.summary,
                            "open_hooks": &session.scene.open_hooks,
                        },
                    }),
                    json!({"establish_scene": true}),
                )
                .with_tone("grounded"),
            )
            .await
            .trim()
            .to_string();
        if text.is_empty() {
            text = fallback_scene_text(session);
        }
        session.scene.summary = text.clone();
        session.scene.established = true;
        text
    }

    fn retcon_dispute_result(&self, session: &GameSession, debug_info: DebugInfo) -> TurnResult {
        let citations = memory_service::turn_citations(session, 5);
        let mut narration_parts = vec!["OOC: Retcon dispute.".to_string()];
        if !session.rolling_summary.is_empty() {
            narration_parts.push(format!("Rolling summary: {}", session.rolling_summary));
        }
        if citations.is_empty() {
            narration_parts.push("No turn log is available yet.".to_string());
        } else {
            narration_parts.push("Here is what was said/done:".to_string());
            narration_parts.extend(citations.iter().cloned());
        }
        narration_parts.push(
            "Choose a resolution: clarify misunderstanding or retcon with minimal disruption."
                .to_string(),
        );
        let suggested_actions = vec![
            SuggestedAction::new("Clarify misunderstanding", "ask_gm").with_payload(json!({
                "dialogue": "Clarify the misunderstanding and restate the intent.",
                "metadata": {"resolution": "clarify"},
            })),
            SuggestedAction::new("Retcon with minimal disruption", "ask_gm").with_payload(json!({
                "dialogue": "Apply a minimal retcon to resolve the dispute.",
                "metadata": {"resolution": "retcon"},
            })),
        ];
        let intent = Intent::new(ActionType::AskClarifyingQuestion)
            .with_dialogue("Which resolution should we apply?");
        let narration = narration_parts.join("\n");
        TurnResult {
            narration_prompt_context: json!({
                "era": &session.era,
                "location": &session.location,
                "intent": &intent,
                "outcome": {"retcon_dispute": true},
            }),
            intent,
            rolls: Vec::new(),
            outcome: json!({"retcon_dispute": true, "citations": citations}),
            state_diff: None,
            narration,
            suggested_actions,
            needs_clarification: true,
            clarification_question: Some("Which resolution should we apply?".to_string()),
            clarification_questions: vec![
                "Clarify misunderstanding".to_string(),
                "Retcon with minimal disruption".to_string(),
            ],
            project_created: None,
            debug: debug_info,
        }
    }

    fn rule_edge_case_result(
        &self,
        session: &GameSession,
        player_text: &str,
        envelope: &TurnEnvelope,
        debug_info: DebugInfo,
    ) -> TurnResult {
        let question = rule_question(player_text, envelope);
        if session.settings.dev_mode_enabled {
            let proposal = format!(
                "Add a rule entry for {} edge cases: {question}",
                envelope.classification.primary_category
            );
            let narration = format!(
                "OOC: Mechanics edge case detected.\nQuestion: {question}\nProposed addition: {proposal}\nPlease provide a ruling."
            );
            let suggested_actions = vec![
                SuggestedAction::new("Provide ruling", "ask_gm").with_payload(json!({
                    "dialogue": "Ruling: [describe the rule to apply].",
                    "metadata": {"resolution": "ruling"},
                })),
                SuggestedAction::new("Log rule addition", "ask_gm").with_payload(json!({
                    "dialogue": "Add rule: [schema/rule addition].",
                    "metadata": {"resolution": "rule_addition"},
                })),
            ];
            let intent = Intent::new(ActionType::AskClarifyingQuestion)
                .with_dialogue("Please provide a ruling for this edge case.");
            return TurnResult {
                narration_prompt_context: json!({
                    "era": &session.era,
                    "location": &session.location,
                    "intent": &intent,
                    "outcome": {"rule_edge_case": true},
                }),
                intent,
                rolls: Vec::new(),
                outcome: json!({"rule_edge_case": true, "proposal": proposal}),
                state_diff: None,
                narration,
                suggested_actions,
                needs_clarification: true,
                clarification_question: Some(
                    "Please provide a ruling for this edge case.".to_string(),
                ),
                clarification_questions: vec![
                    "Provide a ruling.".to_string(),
                    "Add a schema/rule addition.".to_string(),
                ],
                project_created: None,
                debug: debug_info,
            };
        }

        let ruling = "Conservative ruling: no mechanical effect until clarified.";
        let affected = affected_systems(envelope);
        let intent =
            Intent::new(ActionType::AskGm).with_dialogue("Proceed under conservative ruling.");
        TurnResult {
            narration_prompt_context: json!({
                "era": &session.era,
                "location": &session.location,
                "intent": &intent,
                "outcome": {"rule_edge_case": true},
            }),
            intent,
            rolls: Vec::new(),
            outcome: json!({
                "rule_edge_case": true,
                "ruling_note": {
                    "question": question,
                    "ruling": ruling,
                    "affected_systems": affected,
                },
            }),
            state_diff: None,
            narration: format!("OOC: Mechanics edge case detected.\n{ruling}"),
            suggested_actions: build_suggested_actions(&available_actions()),
            needs_clarification: false,
            clarification_question: None,
            clarification_questions: Vec::new(),
            project_created: None,
            debug: debug_info,
        }
    }

    async fn content_gap_result(
        &self,
        session: &mut GameSession,
        player_text: &str,
        envelope: &TurnEnvelope,
        debug_info: DebugInfo,
    ) -> Result<TurnResult> {
        if !session.settings.dev_mode_enabled {
            let intent = Intent::new(ActionType::AskClarifyingQuestion)
                .with_dialogue("This system is missing. Do you want to proceed without it?");
            return Ok(TurnResult {
                narration_prompt_context: json!({
                    "era": &session.era,
                    "location": &session.location,
                    "intent": &intent,
                    "outcome": {"content_gap": true},
                }),
                intent,
                rolls: Vec::new(),
                outcome: json!({"content_gap": true}),
                state_diff: None,
                narration: "OOC: Missing system content. Proceed with a conservative fallback."
                    .to_string(),
                suggested_actions: build_suggested_actions(&available_actions()),
                needs_clarification: true,
                clarification_question: Some(
                    "This system is missing. Do you want to proceed without it?".to_string(),
                ),
                clarification_questions: vec![
                    "Proceed with conservative fallback.".to_string(),
                    "Pause and define the missing system.".to_string(),
                ],
                project_created: None,
                debug: debug_info,
            });
        }

        let draft = system_draft_for(player_text, envelope);
        if let Err(err) = self.projects.create_system_draft(session.id, &draft).await {
            let mut debug_info = debug_info;
            debug_info.validation_errors.push(err.to_string());
            let intent = Intent::new(ActionType::AskClarifyingQuestion)
                .with_reason("System draft creation unavailable.");
            return Ok(self
                .clarify_turn_result(
                    session,
                    intent,
                    Some(vec!["System draft creation is unavailable.".to_string()]),
                    debug_info,
                )
                .await);
        }
        info!(draft = %draft.name, "system draft stored for review");

        let intent = Intent::new(ActionType::AskClarifyingQuestion)
            .with_dialogue("Do you want to activate this system draft?");
        let suggested_actions = vec![
            SuggestedAction::new("Accept draft", "ask_gm")
                .with_payload(json!({"metadata": {"resolution": "accept_system_draft"}})),
            SuggestedAction::new("Revise draft", "ask_gm")
                .with_payload(json!({"metadata": {"resolution": "revise_system_draft"}})),
        ];
        Ok(TurnResult {
            narration_prompt_context: json!({
                "era": &session.era,
                "location": &session.location,
                "intent": &intent,
                "outcome": {"content_gap": true, "system_draft_created": true},
            }),
            intent,
            rolls: Vec::new(),
            outcome: json!({"content_gap": true, "system_draft": draft}),
            state_diff: None,
            narration: "OOC: Missing system content. Draft proposed and stored for review."
                .to_string(),
            suggested_actions,
            needs_clarification: true,
            clarification_question: Some("Do you want to activate this system draft?".to_string()),
            clarification_questions: vec![
                "Accept the draft.".to_string(),
                "Revise the draft.".to_string(),
            ],
            project_created: None,
            debug: debug_info,
        })
    }

    async fn exploration_result(
        &self,
        session: &mut GameSession,
        player_text: &str,
        debug_info: DebugInfo,
    ) -> Result<TurnResult> {
        let outcome = exploration_service::explore(session, player_text);
        self.narrative
            .create_discovery(session.id, &outcome.discovery)
            .await?;
        self.narrative
            .create_thread(session.id, &outcome.thread)
            .await?;
        let outcome_json = json!({
            "exploration": true,
            "discovery": &outcome.discovery,
            "thread": &outcome.thread,
        });
        let narration = self
            .llm
            .generate_narration(
                &NarrationRequest::new(
                    json!({
                        "era": &session.era,
                        "location": &session.location,
                        "tags": &outcome.tags,
                        "discovery": &outcome.discovery,
                    }),
                    outcome_json.clone(),
                )
                .with_tone("grounded"),
            )
            .await;
        let intent = Intent::new(ActionType::Explore);
        Ok(TurnResult {
            narration_prompt_context: json!({
                "era": &session.era,
                "location": &session.location,
                "intent": &intent,
                "outcome": &outcome_json,
            }),
            intent,
            rolls: Vec::new(),
            outcome: outcome_json,
            state_diff: None,
            narration,
            suggested_actions: build_suggested_actions(&available_actions()),
            needs_clarification: false,
            clarification_question: None,
            clarification_questions: Vec::new(),
            project_created: None,
            debug: debug_info,
        })
    }

    async fn stagnation_result(
        &self,
        session: &mut GameSession,
        debug_info: DebugInfo,
    ) -> Result<TurnResult> {
        let threads = self.narrative.list_threads(session.id).await?;
        let mut clocks = self.narrative.list_clocks(session.id).await?;
        let top_interest = self
            .memory
            .get_profile(session.id)
            .await?
            .unwrap_or_default()
            .top_interest()
            .to_string();

        let outcome = stagnation_service::escalate(session, &threads, &mut clocks, &top_interest);
        if let Some(clock) = &outcome.escalated_clock {
            self.narrative.update_clock(session.id, clock).await?;
        }
        self.narrative
            .create_thread(session.id, &outcome.hook)
            .await?;

        let outcome_json = json!({
            "stagnation": true,
            "action": outcome.action.as_str(),
            "clock_escalated": &outcome.escalated_clock,
            "thread_consequence": &outcome.consequence_thread,
            "hook": &outcome.hook,
        });
        let narration = self
            .llm
            .generate_narration(
                &NarrationRequest::new(
                    json!({
                        "era": &session.era,
                        "location": &session.location,
                        "top_interest": &top_interest,
                        "stagnation_action": outcome.action.as_str(),
                    }),
                    outcome_json.clone(),
                )
                .with_tone("tense"),
            )
            .await;
        let intent = Intent::new(ActionType::Explore);
        Ok(TurnResult {
            narration_prompt_context: json!({
                "era": &session.era,
                "location": &session.location,
                "intent": &intent,
                "outcome": &outcome_json,
            }),
            intent,
            rolls: Vec::new(),
            outcome: outcome_json,
            state_diff: None,
            narration,
            suggested_actions: build_suggested_actions(&available_actions()),
            needs_clarification: false,
            clarification_question: None,
            clarification_questions: Vec::new(),
            project_created: None,
            debug: debug_info,
        })
    }

    async fn memory_recall_result(
        &self,
        session: &mut GameSession,
        player_text: &str,
        threads: &[NarrativeThread],
        debug_info: DebugInfo,
    ) -> TurnResult {
        let goal = session
            .setup
            .as_ref()
            .map(|setup| setup.starting_situation.hook.clone())
            .filter(|hook| !hook.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let sender = session
            .setup
            .as_ref()
            .and_then(|setup| setup.starting_situation.npcs.first().cloned())
            .unwrap_or_else(|| "Unknown".to_string());
        let facts: Vec<String> = session
            .turn_log
            .iter()
            .rev()
            .take(4)
            .map(memory_service::fact_line)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let rumors: Vec<String> = threads
            .iter()
            .filter(|thread| thread.kind == "rumor")
            .take(3)
            .map(|thread| thread.text.clone())
            .collect();
        let scene_status = if session.scene.summary.trim().is_empty() {
            "No scene established yet.".to_string()
        } else {
            session.scene.summary.clone()
        };

        session.gm_memory_notes.push(MemoryRecallNote {
            created_at: Some(chrono::Utc::now()),
            player_text: player_text.to_string(),
            goal: goal.clone(),
            sender: sender.clone(),
            facts: facts.clone(),
            rumors: rumors.clone(),
            verified: false,
        });

        let mut lines = vec![
            "Out of character: Here's what you currently know:".to_string(),
            format!("- Last known goal: {goal}"),
            format!("- Who sent you: {sender}"),
            format!("- Current location: {scene_status}"),
        ];
        if !facts.is_empty() {
            lines.push("- Confirmed facts:".to_string());
            lines.extend(facts.iter().map(|fact| format!("  - {fact}")));
        }
        if !rumors.is_empty() {
            lines.push("- Rumors:".to_string());
            lines.extend(rumors.iter().map(|rumor| format!("  - {rumor}")));
        }
        lines.push("If you want, you can:".to_string());
        lines.extend([
            "- Search your memory for more clues (risk: false recollection).".to_string(),
            "- Investigate the scene for new evidence.".to_string(),
            "- Leave the area.".to_string(),
        ]);

        let suggested_actions = vec![
            SuggestedAction::new("Search memory for more clues", "explore")
                .with_payload(json!({"metadata": {"memory_search": true}})),
            SuggestedAction::new("Investigate the scene", "interact")
                .with_payload(json!({"targets": [{"name": "scene", "type": "location"}]})),
            SuggestedAction::new("Leave the area", "move").with_payload(
                json!({"movement": {"mode": "walk", "distance": 10, "destination": "exit"}}),
            ),
        ];

        let mut narration = self
            .llm
            .generate_narration(
                &NarrationRequest::new(
                    json!({
                        "era": &session.era,
                        "location": &session.location,
                        "memory_recall": {
                            "goal": &goal,
                            "sender": &sender,
                            "facts": &facts,
                            "rumors": &rumors,
                        },
                    }),
                    json!({"memory_recall": true}),
                )
                .with_tone("reflective"),
            )
            .await
            .trim()
            .to_string();
        if narration.is_empty() {
            narration = lines.join("\n");
        }

        let intent = Intent::new(ActionType::AskGm).with_dialogue("Memory recall.");
        TurnResult {
            narration_prompt_context: json!({
                "era": &session.era,
                "location": &session.location,
                "intent": &intent,
                "outcome": {"memory_recall": true},
            }),
            intent,
            rolls: Vec::new(),
            outcome: json!({
                "memory_recall": true,
                "facts": facts,
                "rumors": rumors,
                "summary": lines,
            }),
            state_diff: None,
            narration,
            suggested_actions,
            needs_clarification: false,
            clarification_question: None,
            clarification_questions: Vec::new(),
            project_created: None,
            debug: debug_info,
        }
    }

    async fn maybe_create_project(
        &self,
        session: &mut GameSession,
        plan: &[GmPlanStep],
        debug_info: &mut DebugInfo,
    ) -> Result<Option<TurnResult>> {
        let Some(step) = find_project_step(plan) else {
            return Ok(None);
        };

        let project = project_from_step(step);
        if let Err(err) = self.projects.create_project(session.id, &project).await {
            debug_info.validation_errors.push(err.to_string());
            let intent = Intent::new(ActionType::AskClarifyingQuestion)
                .with_reason("Project creation failed.");
            return Ok(Some(
                self.clarify_turn_result(
                    session,
                    intent,
                    Some(vec!["Project creation failed. Try again?".to_string()]),
                    debug_info.clone(),
                )
                .await,
            ));
        }
        info!(project = %project.name, units = project.work_units_total, "project created from plan");

        let questions = project.open_questions.clone();
        let narration_context = json!({
            "era": &session.era,
            "location": &session.location,
            "event": "project_created",
            "project": {"name": &project.name, "type": &project.kind},
        });
        let narration = self
            .llm
            .generate_narration(
                &NarrationRequest::new(
                    narration_context.clone(),
                    json!({"project_created": &project}),
                )
                .with_tone("grounded"),
            )
            .await;
        Ok(Some(TurnResult {
            intent: Intent::new(ActionType::ProjectCreate),
            rolls: Vec::new(),
            outcome: json!({"project_created": true, "narration": &narration}),
            state_diff: None,
            narration_prompt_context: narration_context,
            narration,
            suggested_actions: Vec::new(),
            needs_clarification: !questions.is_empty(),
            clarification_question: questions.first().cloned(),
            clarification_questions: questions,
            project_created: Some(project),
            debug: debug_info.clone(),
        }))
    }

    async fn persist_ruling_note(
        &self,
        session: &GameSession,
        outcome: &serde_json::Value,
    ) -> Result<()> {
        let Some(note) = outcome.get("ruling_note") else {
            return Ok(());
        };
        let (Some(question), Some(ruling)) = (
            note.get("question").and_then(serde_json::Value::as_str),
            note.get("ruling").and_then(serde_json::Value::as_str),
        ) else {
            return Ok(());
        };
        let mut record = Ruling::new(question, ruling);
        if let Some(systems) = note.get("affected_systems").and_then(|v| v.as_array()) {
            record.affected_systems = systems
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
        }
        self.projects.create_ruling(session.id, &record).await
    }

    async fn update_profile(&self, session: &GameSession, intent: &Intent) -> Result<()> {
        if matches!(
            intent.action_type,
            ActionType::AskClarifyingQuestion | ActionType::Invalid
        ) {
            return Ok(());
        }
        let mut profile = self
            .memory
            .get_profile(session.id)
            .await?
            .unwrap_or_default();
        profile.record_action(intent.action_type.as_str());
        self.memory.save_profile(session.id, &profile).await
    }

    async fn compact_memories(&self, session: &mut GameSession) -> Result<()> {
        let compacting = session.turn_log.len() >= self.config.compaction_threshold;
        if !memory_service::promote_memories(session, self.config.compaction_threshold) {
            return Ok(());
        }
        if !compacting {
            return Ok(());
        }
        let projects = self.projects.list_projects(session.id).await?;
        for card in memory_service::compaction_cards(session, &projects) {
            self.memory.upsert_memory_card(session.id, &card).await?;
        }
        Ok(())
    }
}

fn envelope_context(session: &GameSession, payload: Option<&serde_json::Value>) -> EnvelopeContext {
    EnvelopeContext {
        era: session.era.clone(),
        scene_summary: shorten_text(&session.scene.summary, 220),
        scene_established: session.scene.established,
        open_hooks: session.scene.open_hooks.clone(),
        dev_mode_enabled: session.settings.dev_mode_enabled,
        suggested_action: payload
            .and_then(|value| value.get("suggested_action"))
            .cloned(),
    }
}

fn intent_context(session: &GameSession, character: &PlayerCharacter) -> IntentContext {
    IntentContext {
        era: session.era.clone(),
        available_actions: available_actions(),
        available_powers: character.powers.clone(),
        notes: None,
    }
}

fn available_actions() -> Vec<String> {
    [
        "explore",
        "scene_request",
        "interact",
        "move",
        "attack",
        "use_power",
        "buy_item",
        "ask_gm",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn action_cost(action_type: ActionType) -> i64 {
    match action_type {
        ActionType::Interact
        | ActionType::Attack
        | ActionType::UsePower
        | ActionType::BuyItem
        | ActionType::Move => 1,
        _ => 0,
    }
}

fn validate_intent(
    intent: &Intent,
    era: &str,
    character: &PlayerCharacter,
) -> Result<(), ValidationError> {
    if matches!(
        intent.action_type,
        ActionType::Explore | ActionType::SceneRequest
    ) {
        return Ok(());
    }
    if !available_actions().contains(&intent.action_type.as_str().to_string()) {
        return Err(ValidationError::ActionNotAllowed);
    }
    if character.resources.actions < action_cost(intent.action_type) {
        return Err(ValidationError::NotEnoughActions);
    }
    if intent.action_type == ActionType::UsePower && era.trim().to_lowercase() != "space" {
        return Err(ValidationError::PowersLocked);
    }
    Ok(())
}

fn impossible_action_reason(intent: &Intent, era: &str, player_text: &str) -> Option<String> {
    let era_label = if era.trim().is_empty() {
        "this era"
    } else {
        era.trim()
    };
    let combined = format!(
        "{player_text} {} {}",
        intent.dialogue.as_deref().unwrap_or(""),
        intent.item_used.as_deref().unwrap_or("")
    )
    .to_lowercase();
    let spaceship_keywords = ["spaceship", "space ship", "starship", "star ship"];
    if era.trim().to_lowercase() != "space"
        && spaceship_keywords
            .iter()
            .any(|keyword| combined.contains(keyword))
    {
        return Some(format!(
            "That action isn't possible. You are in a {era_label} setting. You do not possess a spaceship."
        ));
    }
    None
}

fn execute_mechanics(
    dice: &mut DiceSession,
    intent: &Intent,
    character: &PlayerCharacter,
) -> serde_json::Map<String, serde_json::Value> {
    let mut outcome = serde_json::Map::new();
    match intent.action_type {
        ActionType::Attack => {
            let attack_roll = dice.roll_d20(Some("attack"));
            let attack_total = attack_roll + character.skill + character.attr;
            let hit = attack_total >= TARGET_AR_DEFAULT;
            let damage = if hit {
                dice.roll(DEFAULT_WEAPON_DAMAGE, Some("damage")).unwrap_or(0)
            } else {
                0
            };
            outcome.insert("hit".to_string(), json!(hit));
            outcome.insert("attack_roll".to_string(), json!(attack_roll));
            outcome.insert("attack_total".to_string(), json!(attack_total));
            outcome.insert("target_ar".to_string(), json!(TARGET_AR_DEFAULT));
            outcome.insert("damage".to_string(), json!(damage));
            outcome.insert(
                "target".to_string(),
                json!(intent
                    .target_label()
                    .unwrap_or_else(|| "nearest_threat".to_string())),
            );
        }
        ActionType::Explore => {
            outcome.insert("explore".to_string(), json!(true));
        }
        ActionType::SceneRequest => {
            outcome.insert("scene_request".to_string(), json!(true));
        }
        ActionType::Interact => {
            outcome.insert("interact".to_string(), json!(true));
            outcome.insert("target".to_string(), json!(intent.target_label()));
        }
        ActionType::UsePower => {
            outcome.insert("used_power".to_string(), json!(&intent.power_used));
        }
        ActionType::BuyItem => {
            outcome.insert("buy_item".to_string(), json!(true));
            outcome.insert("item".to_string(), json!(&intent.item_used));
        }
        ActionType::AskGm => {
            outcome.insert("ask_gm".to_string(), json!(true));
        }
        ActionType::Move => {
            outcome.insert("moved".to_string(), json!(true));
            outcome.insert("movement".to_string(), json!(&intent.movement));
        }
        _ => {
            outcome.insert("pass".to_string(), json!(true));
        }
    }
    outcome
}

fn compact_log_entry(
    intent: &Intent,
    rolls: &[RollLogEntry],
    outcome: &serde_json::Map<String, serde_json::Value>,
) -> TurnLogEntry {
    TurnLogEntry {
        action: intent.action_type.as_str().to_string(),
        power: intent.power_used.clone(),
        item: intent.item_used.clone(),
        rolls: rolls
            .iter()
            .map(|entry| CompactRoll {
                f: entry.formula.clone(),
                r: entry.result,
            })
            .collect(),
        outcome: TurnOutcome {
            hit: outcome.get("hit").and_then(serde_json::Value::as_bool),
            damage: outcome.get("damage").and_then(serde_json::Value::as_i64),
        },
    }
}

fn should_log_retcon(intent: &Intent, session: &GameSession) -> bool {
    intent.action_type == ActionType::AskGm
        && intent.resolution() == Some("retcon")
        && session.settings.dev_mode_enabled
}

fn rule_question(player_text: &str, envelope: &TurnEnvelope) -> String {
    let summary = if player_text.trim().is_empty() {
        "Unspecified request"
    } else {
        player_text.trim()
    };
    let category = &envelope.classification.primary_category;
    if category.is_empty() {
        summary.to_string()
    } else {
        format!("{summary} (category: {category})")
    }
}

fn affected_systems(envelope: &TurnEnvelope) -> Vec<String> {
    let mut systems = Vec::new();
    if !envelope.classification.primary_category.is_empty() {
        systems.push(envelope.classification.primary_category.clone());
    }
    if let Some(secondary) = &envelope.classification.secondary_category {
        if !secondary.is_empty() {
            systems.push(secondary.clone());
        }
    }
    if systems.is_empty() {
        systems.push("mechanics".to_string());
    }
    systems
}

/// The Alchemy draft ships as a worked template; anything else gets an
/// empty scaffold named from the request.
fn system_draft_for(player_text: &str, envelope: &TurnEnvelope) -> SystemDraft {
    let lowered = player_text.trim().to_lowercase();
    if lowered.contains("alchemy") {
        return alchemy_draft();
    }
    let name = {
        let primary = envelope.classification.primary_category.trim();
        if primary.is_empty() {
            "New System".to_string()
        } else {
            title_case(primary)
        }
    };
    SystemDraft::new(name)
}

fn alchemy_draft() -> SystemDraft {
    let mut draft = SystemDraft::new("Alchemy");
    draft.inputs = vec![DraftItem {
        mechanic: DraftMechanic::Project,
        description: "Gather alchemical reagents".to_string(),
        payload: Some(json!({
            "type": "craft",
            "requirements": {"materials": ["reagents"]},
            "work_units_total": 2,
        })),
    }];
    draft.process = vec![DraftItem {
        mechanic: DraftMechanic::Roll,
        description: "Perform an alchemy check".to_string(),
        payload: Some(json!({"skill": "Alchemy", "dice": "1d20"})),
    }];
    draft.outputs = vec![
        DraftItem {
            mechanic: DraftMechanic::Project,
            description: "Recipe: Minor Tonic".to_string(),
            payload: Some(json!({
                "name": "Minor Tonic",
                "type": "craft",
                "requirements": {"materials": ["reagents", "solvent"]},
                "work_units_total": 3,
            })),
        },
        DraftItem {
            mechanic: DraftMechanic::Project,
            description: "Recipe: Smoke Bomb".to_string(),
            payload: Some(json!({
                "name": "Smoke Bomb",
                "type": "craft",
                "requirements": {"materials": ["reagents", "ash"]},
                "work_units_total": 2,
            })),
        },
    ];
    draft.costs = vec![DraftItem {
        mechanic: DraftMechanic::Status,
        description: "Minor burns if mishandled".to_string(),
        payload: Some(json!({"status": "Injured", "level": 1, "duration": 1})),
    }];
    draft.risks = vec![DraftItem {
        mechanic: DraftMechanic::Status,
        description: "Toxic exposure on failure".to_string(),
        payload: Some(json!({"status": "Toxin", "level": 1, "duration": 2})),
    }];
    draft.checks = vec![DraftItem {
        mechanic: DraftMechanic::Roll,
        description: "Stability check".to_string(),
        payload: Some(json!({"skill": "Alchemy", "dice": "1d20"})),
    }];
    draft
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A plan step becomes a project when it is a substantial craft or
/// improvise effort.
fn find_project_step(plan: &[GmPlanStep]) -> Option<&GmPlanStep> {
    plan.iter().find(|step| {
        matches!(step.step_type, PlanStepType::Craft | PlanStepType::Improvise)
            && (step.complexity.unwrap_or(0) > 1
                || matches!(step.time_cost, TimeCost::Hours | TimeCost::Days))
    })
}

fn project_from_step(step: &GmPlanStep) -> Project {
    let name = step
        .targets
        .first()
        .cloned()
        .filter(|target| !target.is_empty())
        .unwrap_or_else(|| {
            if step.notes.is_empty() {
                "Project".to_string()
            } else {
                step.notes.clone()
            }
        });
    let kind = if step.step_type == PlanStepType::Craft {
        "craft"
    } else {
        "build"
    };
    let work_units = step.complexity.unwrap_or(2).max(2);
    let mut questions = Vec::new();
    let notes = step.notes.to_lowercase();
    if !notes.contains("material") {
        questions.push("What materials or parts are available?".to_string());
    }
    if step.skill_used.is_none() && !notes.contains("method") {
        questions.push("What method or approach should drive the build?".to_string());
    }
    if step.targets.is_empty() {
        questions.push("What is the specific build target?".to_string());
    }
    questions.truncate(3);
    Project::new(name, kind, work_units).with_questions(questions)
}

fn is_memory_recall_request(player_text: &str) -> bool {
    let text = player_text.trim().to_lowercase();
    if text.is_empty() {
        return false;
    }
    [
        "what do i know",
        "what do we know",
        "what do i remember",
        "why am i here",
        "didn't you say",
        "did you say",
        "what did you say",
        "what do you remember",
    ]
    .iter()
    .any(|trigger| text.contains(trigger))
}

fn shorten_text(text: &str, limit: usize) -> String {
    let clean = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if clean.len() <= limit {
        return clean;
    }
    let mut cut = limit;
    while !clean.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", clean[..cut].trim_end())
}

fn scene_update_text(scene_text: &str, suggested_actions: &[SuggestedAction]) -> String {
    let mut short_scene = shorten_text(scene_text, 180);
    if !short_scene.ends_with(['.', '!', '?']) {
        short_scene.push('.');
    }
    let mut lines = vec![
        short_scene,
        "No immediate changes are evident.".to_string(),
        "Choose a next action from the options below.".to_string(),
    ];
    lines.extend(format_suggested_actions(suggested_actions));
    lines.join("\n")
}

fn format_suggested_actions(suggested_actions: &[SuggestedAction]) -> Vec<String> {
    if suggested_actions.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Available actions:".to_string()];
    lines.extend(
        suggested_actions
            .iter()
            .map(|action| format!("- {}", action.label)),
    );
    lines
}

fn fallback_scene_text(session: &GameSession) -> String {
    let era = if session.era.is_empty() {
        "Unknown Era"
    } else {
        session.era.as_str()
    };
    let location = if session.location.is_empty() {
        "an unfamiliar location"
    } else {
        session.location.as_str()
    };
    format!(
        "{era} - {location}. Dim light flickers across steel and shadow, and the low hum of distant machinery fills the air."
    )
}

fn slugify(value: &str) -> String {
    let mut cleaned: String = value
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    while cleaned.contains("__") {
        cleaned = cleaned.replace("__", "_");
    }
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "scene".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Six stock follow-ups filtered to what is currently legal, padded to at
/// least three and capped at five.
fn build_suggested_actions(available: &[String]) -> Vec<SuggestedAction> {
    let candidates = vec![
        SuggestedAction::new("Explore the area", "explore"),
        SuggestedAction::new("Interact with the nearest terminal", "interact")
            .with_payload(json!({"targets": [{"name": "nearest terminal", "type": "object"}]})),
        SuggestedAction::new("Move to cover", "move").with_payload(
            json!({"movement": {"mode": "walk", "distance": 5, "destination": "cover"}}),
        ),
        SuggestedAction::new("Attack the nearest threat", "attack")
            .with_payload(json!({"targets": []})),
        SuggestedAction::new("Request a closer look at the scene", "scene_request"),
        SuggestedAction::new("Ask the GM for guidance", "ask_gm")
            .with_payload(json!({"dialogue": "What stands out right now?"})),
    ];
    let mut filtered: Vec<SuggestedAction> = candidates
        .into_iter()
        .filter(|action| available.contains(&action.action_type))
        .collect();
    while filtered.len() < 3 {
        filtered.push(SuggestedAction::new("Explore the area", "explore"));
    }
    filtered.truncate(5);
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::Classification;
    use crate::domain::value_objects::{Confidence, Mode, RiskLevel};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct InMemoryNarrative {
        threads: Mutex<Vec<NarrativeThread>>,
        clocks: Mutex<Vec<crate::domain::entities::Clock>>,
        discoveries: Mutex<Vec<crate::domain::entities::Discovery>>,
    }

    impl InMemoryNarrative {
        fn new() -> Self {
            Self {
                threads: Mutex::new(Vec::new()),
                clocks: Mutex::new(Vec::new()),
                discoveries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NarrativeRepositoryPort for InMemoryNarrative {
        async fn create_thread(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
            thread: &NarrativeThread,
        ) -> Result<()> {
            self.threads.lock().unwrap().push(thread.clone());
            Ok(())
        }

        async fn list_threads(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
        ) -> Result<Vec<NarrativeThread>> {
            Ok(self.threads.lock().unwrap().clone())
        }

        async fn create_clock(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
            clock: &crate::domain::entities::Clock,
        ) -> Result<()> {
            self.clocks.lock().unwrap().push(clock.clone());
            Ok(())
        }

        async fn list_clocks(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
        ) -> Result<Vec<crate::domain::entities::Clock>> {
            Ok(self.clocks.lock().unwrap().clone())
        }

        async fn update_clock(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
            clock: &crate::domain::entities::Clock,
        ) -> Result<()> {
            let mut clocks = self.clocks.lock().unwrap();
            if let Some(existing) = clocks.iter_mut().find(|c| c.id == clock.id) {
                *existing = clock.clone();
            }
            Ok(())
        }

        async fn create_discovery(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
            discovery: &crate::domain::entities::Discovery,
        ) -> Result<()> {
            self.discoveries.lock().unwrap().push(discovery.clone());
            Ok(())
        }

        async fn list_discoveries(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
        ) -> Result<Vec<crate::domain::entities::Discovery>> {
            Ok(self.discoveries.lock().unwrap().clone())
        }
    }

    struct InMemoryProjects {
        projects: Mutex<Vec<Project>>,
        drafts: Mutex<Vec<SystemDraft>>,
        rulings: Mutex<Vec<Ruling>>,
    }

    impl InMemoryProjects {
        fn new() -> Self {
            Self {
                projects: Mutex::new(Vec::new()),
                drafts: Mutex::new(Vec::new()),
                rulings: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProjectRepositoryPort for InMemoryProjects {
        async fn create_project(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
            project: &Project,
        ) -> Result<()> {
            self.projects.lock().unwrap().push(project.clone());
            Ok(())
        }

        async fn list_projects(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
        ) -> Result<Vec<Project>> {
            Ok(self.projects.lock().unwrap().clone())
        }

        async fn create_system_draft(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
            draft: &SystemDraft,
        ) -> Result<()> {
            self.drafts.lock().unwrap().push(draft.clone());
            Ok(())
        }

        async fn create_ruling(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
            ruling: &Ruling,
        ) -> Result<()> {
            self.rulings.lock().unwrap().push(ruling.clone());
            Ok(())
        }

        async fn list_rulings(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
        ) -> Result<Vec<Ruling>> {
            Ok(self.rulings.lock().unwrap().clone())
        }
    }

    struct InMemoryMemory {
        profile: Mutex<Option<crate::domain::entities::PlayerProfile>>,
        cards: Mutex<Vec<crate::domain::entities::MemoryCard>>,
    }

    impl InMemoryMemory {
        fn new() -> Self {
            Self {
                profile: Mutex::new(None),
                cards: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MemoryRepositoryPort for InMemoryMemory {
        async fn get_profile(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
        ) -> Result<Option<crate::domain::entities::PlayerProfile>> {
            Ok(self.profile.lock().unwrap().clone())
        }

        async fn save_profile(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
            profile: &crate::domain::entities::PlayerProfile,
        ) -> Result<()> {
            *self.profile.lock().unwrap() = Some(profile.clone());
            Ok(())
        }

        async fn upsert_memory_card(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
            card: &crate::domain::entities::MemoryCard,
        ) -> Result<()> {
            let mut cards = self.cards.lock().unwrap();
            if let Some(existing) = cards
                .iter_mut()
                .find(|c| c.entity_type == card.entity_type && c.name == card.name)
            {
                *existing = card.clone();
            } else {
                cards.push(card.clone());
            }
            Ok(())
        }

        async fn list_memory_cards(
            &self,
            _session_id: crate::domain::value_objects::SessionId,
        ) -> Result<Vec<crate::domain::entities::MemoryCard>> {
            Ok(self.cards.lock().unwrap().clone())
        }
    }

    /// Scripted model: fixed envelope and intent, empty narration so the
    /// deterministic fallbacks show through.
    struct ScriptedLlm {
        envelope: Option<TurnEnvelope>,
        intent: Option<Intent>,
    }

    impl ScriptedLlm {
        fn with_envelope(envelope: TurnEnvelope) -> Self {
            Self {
                envelope: Some(envelope),
                intent: None,
            }
        }

        fn with_intent(envelope: TurnEnvelope, intent: Intent) -> Self {
            Self {
                envelope: Some(envelope),
                intent: Some(intent),
            }
        }

        fn failing() -> Self {
            Self {
                envelope: None,
                intent: None,
            }
        }
    }

    #[async_trait]
    impl LlmPort for ScriptedLlm {
        async fn generate_turn_envelope(
            &self,
            _player_text: &str,
            _context: &EnvelopeContext,
        ) -> Result<TurnEnvelope> {
            self.envelope
                .clone()
                .ok_or_else(|| anyhow::anyhow!("model unavailable"))
        }

        async fn extract_intent(
            &self,
            _player_text: &str,
            _context: &IntentContext,
        ) -> Result<Intent> {
            self.intent
                .clone()
                .ok_or_else(|| anyhow::anyhow!("model unavailable"))
        }

        async fn generate_narration(&self, _request: &NarrationRequest) -> String {
            String::new()
        }
    }

    fn routine_envelope() -> TurnEnvelope {
        TurnEnvelope {
            mode: Mode::Gm,
            protocol_id: "PROTO_ROUTINE".to_string(),
            confidence: Confidence::High,
            classification: Classification {
                primary_category: "combat".to_string(),
                secondary_category: None,
            },
            ooc_questions: Vec::new(),
            gm_plan: None,
            content_requests: None,
            memory_suggestions: None,
            dev_report: None,
            council: None,
        }
    }

    fn service(llm: ScriptedLlm) -> TurnService<ScriptedLlm> {
        TurnService::new(
            Arc::new(llm),
            Arc::new(InMemoryNarrative::new()),
            Arc::new(InMemoryProjects::new()),
            Arc::new(InMemoryMemory::new()),
            ProtocolRouter::default(),
            TurnConfig::default(),
        )
    }

    fn established_session(seed: u64) -> GameSession {
        let mut session = GameSession::new(seed);
        session.scene.summary = "A cold terminal hall.".to_string();
        session.scene.established = true;
        session
    }

    #[tokio::test]
    async fn first_turn_establishes_scene_and_asks_for_action() {
        let service = service(ScriptedLlm::with_envelope(routine_envelope()));
        let mut session = GameSession::new(7).with_location("Rust Belt Station");
        let mut character = PlayerCharacter::new("Vex");

        let result = service
            .execute_turn(&mut session, &mut character, "look around", None, None)
            .await
            .unwrap();

        assert!(result.needs_clarification);
        assert!(session.scene.established);
        assert_eq!(
            session.scene.scene_id.as_deref(),
            Some("rust_belt_station_entrance")
        );
        assert!(result.narration.contains("Choose a next action"));
        assert!(result.suggested_actions.len() >= 3);
        assert_eq!(
            result.clarification_question.as_deref(),
            Some("Choose an action to proceed.")
        );
    }

    #[tokio::test]
    async fn envelope_failure_falls_back_to_clarification() {
        let service = service(ScriptedLlm::failing());
        let mut session = established_session(3);
        let mut character = PlayerCharacter::new("Vex");

        let result = service
            .execute_turn(&mut session, &mut character, "do the thing", None, None)
            .await
            .unwrap();

        assert!(result.needs_clarification);
        assert_eq!(
            result.clarification_questions,
            vec!["Could you clarify what you want to do next?"]
        );
        assert!(!result.debug.validation_errors.is_empty());
    }

    #[tokio::test]
    async fn attack_intent_resolves_deterministically() {
        let intent = Intent::new(ActionType::Attack);
        let mut session = established_session(42);
        let mut character = PlayerCharacter::new("Vex").with_skill(2).with_attr(1);

        let service = service(ScriptedLlm::with_intent(routine_envelope(), intent.clone()));
        let result = service
            .execute_turn(
                &mut session,
                &mut character,
                "I attack",
                Some(intent.clone()),
                None,
            )
            .await
            .unwrap();

        let attack_roll = result.outcome["attack_roll"].as_i64().unwrap();
        assert!((1..=20).contains(&attack_roll));
        assert_eq!(
            result.outcome["attack_total"].as_i64().unwrap(),
            attack_roll + 3
        );
        assert_eq!(result.outcome["target_ar"].as_i64().unwrap(), 12);
        assert_eq!(character.resources.actions, 0);
        assert_eq!(session.turn_log.len(), 1);
        assert_eq!(session.roll_index, result.rolls.iter().map(|r| r.rolls.len() as u64).sum::<u64>());

        // Replaying the same seed with a fresh session reproduces the roll.
        let mut replay_session = established_session(42);
        let mut replay_character = PlayerCharacter::new("Vex").with_skill(2).with_attr(1);
        let replay_service = service2(ScriptedLlm::with_intent(routine_envelope(), intent.clone()));
        let replay = replay_service
            .execute_turn(
                &mut replay_session,
                &mut replay_character,
                "I attack",
                Some(intent),
                None,
            )
            .await
            .unwrap();
        assert_eq!(replay.outcome["attack_roll"], result.outcome["attack_roll"]);
        assert_eq!(replay.outcome["damage"], result.outcome["damage"]);
    }

    fn service2(llm: ScriptedLlm) -> TurnService<ScriptedLlm> {
        service(llm)
    }

    #[tokio::test]
    async fn spaceship_in_a_modern_era_is_rejected() {
        let intent = Intent::new(ActionType::Interact).with_dialogue("I board my spaceship");
        let service = service(ScriptedLlm::with_intent(routine_envelope(), intent.clone()));
        let mut session = established_session(1);
        let mut character = PlayerCharacter::new("Vex");

        let result = service
            .execute_turn(
                &mut session,
                &mut character,
                "fly my spaceship away",
                Some(intent),
                None,
            )
            .await
            .unwrap();

        assert!(result.needs_clarification);
        assert_eq!(
            result.clarification_questions,
            vec![
                "Flee the area on foot.",
                "Use known equipment.",
                "Attempt something unconventional within the scene.",
            ]
        );
        let question = result.clarification_question.unwrap();
        assert!(question.contains("You do not possess a spaceship."));
        assert!(question.contains("modern"));
    }

    #[tokio::test]
    async fn powers_are_locked_outside_the_space_era() {
        let intent = Intent::new(ActionType::UsePower);
        let service = service(ScriptedLlm::with_intent(routine_envelope(), intent.clone()));
        let mut session = established_session(1);
        let mut character = PlayerCharacter::new("Vex").with_power("Graviton Pulse");

        let result = service
            .execute_turn(
                &mut session,
                &mut character,
                "use my power",
                Some(intent),
                None,
            )
            .await
            .unwrap();

        assert!(result.needs_clarification);
        assert_eq!(
            result.clarification_question.as_deref(),
            Some("Powers are locked outside the Space era.")
        );
    }

    #[tokio::test]
    async fn exhausted_actions_bounce_to_clarification() {
        let intent = Intent::new(ActionType::Attack);
        let service = service(ScriptedLlm::with_intent(routine_envelope(), intent.clone()));
        let mut session = established_session(1);
        let mut character = PlayerCharacter::new("Vex");
        character.resources.actions = 0;

        let result = service
            .execute_turn(
                &mut session,
                &mut character,
                "attack again",
                Some(intent),
                None,
            )
            .await
            .unwrap();

        assert!(result.needs_clarification);
        assert_eq!(
            result.clarification_question.as_deref(),
            Some("Not enough actions.")
        );
    }

    #[tokio::test]
    async fn memory_recall_phrase_short_circuits_the_model() {
        let service = service(ScriptedLlm::failing());
        let mut session = established_session(5);
        session.turn_log.push(TurnLogEntry {
            action: "attack".to_string(),
            power: None,
            item: None,
            rolls: Vec::new(),
            outcome: TurnOutcome {
                hit: Some(true),
                damage: Some(4),
            },
        });
        let mut character = PlayerCharacter::new("Vex");

        let result = service
            .execute_turn(
                &mut session,
                &mut character,
                "Wait, what do I know so far?",
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.outcome["memory_recall"], true);
        assert!(result.narration.contains("Last known goal: Unknown"));
        assert!(result.narration.contains("If you want, you can:"));
        assert_eq!(result.suggested_actions.len(), 3);
        assert_eq!(session.gm_memory_notes.len(), 1);
        assert!(!session.gm_memory_notes[0].verified);
    }

    #[tokio::test]
    async fn exploration_protocol_persists_discovery_and_thread() {
        let mut envelope = routine_envelope();
        envelope.protocol_id = "PROTO_EXPLORATION".to_string();
        let narrative = Arc::new(InMemoryNarrative::new());
        let service = TurnService::new(
            Arc::new(ScriptedLlm::with_envelope(envelope)),
            narrative.clone(),
            Arc::new(InMemoryProjects::new()),
            Arc::new(InMemoryMemory::new()),
            ProtocolRouter::default(),
            TurnConfig::default(),
        );
        let mut session = established_session(9);
        let mut character = PlayerCharacter::new("Vex");

        let result = service
            .execute_turn(
                &mut session,
                &mut character,
                "search the maintenance shaft",
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.outcome["exploration"], true);
        assert_eq!(session.exploration_index, 1);
        assert_eq!(narrative.discoveries.lock().unwrap().len(), 1);
        assert_eq!(narrative.threads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stagnation_protocol_creates_a_tension_hook() {
        let mut envelope = routine_envelope();
        envelope.protocol_id = "PROTO_STAGNATION".to_string();
        let narrative = Arc::new(InMemoryNarrative::new());
        let service = TurnService::new(
            Arc::new(ScriptedLlm::with_envelope(envelope)),
            narrative.clone(),
            Arc::new(InMemoryProjects::new()),
            Arc::new(InMemoryMemory::new()),
            ProtocolRouter::default(),
            TurnConfig::default(),
        );
        let mut session = established_session(9);
        let mut character = PlayerCharacter::new("Vex");

        let result = service
            .execute_turn(&mut session, &mut character, "I wait", None, None)
            .await
            .unwrap();

        assert_eq!(result.outcome["stagnation"], true);
        assert_eq!(session.pacing_tag.as_deref(), Some("tension"));
        let threads = narrative.threads.lock().unwrap();
        assert_eq!(threads.len(), 1);
        assert!(threads[0].text.starts_with("Tension rises:"));
    }

    #[tokio::test]
    async fn retcon_dispute_surfaces_turn_citations() {
        let mut envelope = routine_envelope();
        envelope.protocol_id = "PROTO_RETCON_DISPUTE".to_string();
        let service = service(ScriptedLlm::with_envelope(envelope));
        let mut session = established_session(9);
        session.record_turn(TurnLogEntry {
            action: "attack".to_string(),
            power: None,
            item: None,
            rolls: Vec::new(),
            outcome: TurnOutcome {
                hit: Some(false),
                damage: None,
            },
        });
        let mut character = PlayerCharacter::new("Vex");

        let result = service
            .execute_turn(
                &mut session,
                &mut character,
                "That never happened!",
                None,
                None,
            )
            .await
            .unwrap();

        assert!(result.narration.starts_with("OOC: Retcon dispute."));
        assert!(result.narration.contains("Turn 1: action=attack"));
        assert_eq!(
            result.clarification_questions,
            vec!["Clarify misunderstanding", "Retcon with minimal disruption"]
        );
        assert_eq!(result.suggested_actions.len(), 2);
    }

    #[tokio::test]
    async fn rule_edge_case_without_dev_mode_persists_a_conservative_ruling() {
        let mut envelope = routine_envelope();
        envelope.protocol_id = "PROTO_RULE_EDGE_CASE".to_string();
        envelope.classification.primary_category = "grapple".to_string();
        let projects = Arc::new(InMemoryProjects::new());
        let service = TurnService::new(
            Arc::new(ScriptedLlm::with_envelope(envelope)),
            Arc::new(InMemoryNarrative::new()),
            projects.clone(),
            Arc::new(InMemoryMemory::new()),
            ProtocolRouter::default(),
            TurnConfig::default(),
        );
        let mut session = established_session(9);
        let mut character = PlayerCharacter::new("Vex");

        let result = service
            .execute_turn(
                &mut session,
                &mut character,
                "Can I grapple two people at once?",
                None,
                None,
            )
            .await
            .unwrap();

        assert!(!result.needs_clarification);
        assert!(result
            .narration
            .contains("Conservative ruling: no mechanical effect until clarified."));
        let rulings = projects.rulings.lock().unwrap();
        assert_eq!(rulings.len(), 1);
        assert_eq!(rulings[0].affected_systems, vec!["grapple"]);
        assert!(rulings[0].question.contains("(category: grapple)"));
    }

    #[tokio::test]
    async fn rule_edge_case_in_dev_mode_proposes_a_rule_addition() {
        let mut envelope = routine_envelope();
        envelope.protocol_id = "PROTO_RULE_EDGE_CASE".to_string();
        envelope.classification.primary_category = "grapple".to_string();
        let service = service(ScriptedLlm::with_envelope(envelope));
        let mut session = established_session(9).with_dev_mode(true);
        session.scene.summary = "A cold terminal hall.".to_string();
        session.scene.established = true;
        let mut character = PlayerCharacter::new("Vex");

        let result = service
            .execute_turn(
                &mut session,
                &mut character,
                "Can I grapple two people at once?",
                None,
                None,
            )
            .await
            .unwrap();

        assert!(result.needs_clarification);
        assert!(result.narration.contains("Proposed addition: Add a rule entry for grapple edge cases:"));
        assert_eq!(
            result.clarification_questions,
            vec!["Provide a ruling.", "Add a schema/rule addition."]
        );
    }

    #[tokio::test]
    async fn content_gap_in_dev_mode_drafts_the_alchemy_system() {
        let mut envelope = routine_envelope();
        envelope.protocol_id = "PROTO_CONTENT_GAP".to_string();
        let projects = Arc::new(InMemoryProjects::new());
        let service = TurnService::new(
            Arc::new(ScriptedLlm::with_envelope(envelope)),
            Arc::new(InMemoryNarrative::new()),
            projects.clone(),
            Arc::new(InMemoryMemory::new()),
            ProtocolRouter::default(),
            TurnConfig::default(),
        );
        let mut session = established_session(9).with_dev_mode(true);
        session.scene.summary = "A cold terminal hall.".to_string();
        session.scene.established = true;
        let mut character = PlayerCharacter::new("Vex");

        let result = service
            .execute_turn(
                &mut session,
                &mut character,
                "I want to brew a potion with alchemy",
                None,
                None,
            )
            .await
            .unwrap();

        assert!(result.needs_clarification);
        assert_eq!(
            result.clarification_questions,
            vec!["Accept the draft.", "Revise the draft."]
        );
        let drafts = projects.drafts.lock().unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].name, "Alchemy");
        assert_eq!(drafts[0].outputs.len(), 2);
        assert_eq!(drafts[0].outputs[0].description, "Recipe: Minor Tonic");
    }

    #[tokio::test]
    async fn content_gap_without_dev_mode_offers_a_fallback() {
        let mut envelope = routine_envelope();
        envelope.protocol_id = "PROTO_CONTENT_GAP".to_string();
        let service = service(ScriptedLlm::with_envelope(envelope));
        let mut session = established_session(9);
        let mut character = PlayerCharacter::new("Vex");

        let result = service
            .execute_turn(
                &mut session,
                &mut character,
                "I want to brew a potion with alchemy",
                None,
                None,
            )
            .await
            .unwrap();

        assert!(result.needs_clarification);
        assert_eq!(
            result.narration,
            "OOC: Missing system content. Proceed with a conservative fallback."
        );
        assert_eq!(
            result.clarification_questions,
            vec![
                "Proceed with conservative fallback.",
                "Pause and define the missing system.",
            ]
        );
    }

    #[tokio::test]
    async fn substantial_craft_plan_creates_a_project() {
        let mut envelope = routine_envelope();
        envelope.gm_plan = Some(vec![GmPlanStep {
            step_type: PlanStepType::Craft,
            actor_id: 1,
            targets: vec!["signal booster".to_string()],
            skill_used: None,
            power_used: None,
            time_cost: TimeCost::Hours,
            risk_level: RiskLevel::Med,
            notes: String::new(),
            complexity: Some(3),
        }]);
        let projects = Arc::new(InMemoryProjects::new());
        let service = TurnService::new(
            Arc::new(ScriptedLlm::with_envelope(envelope)),
            Arc::new(InMemoryNarrative::new()),
            projects.clone(),
            Arc::new(InMemoryMemory::new()),
            ProtocolRouter::default(),
            TurnConfig::default(),
        );
        let mut session = established_session(9);
        let mut character = PlayerCharacter::new("Vex");

        let result = service
            .execute_turn(
                &mut session,
                &mut character,
                "I build a signal booster from scrap",
                None,
                None,
            )
            .await
            .unwrap();

        let project = result.project_created.unwrap();
        assert_eq!(project.name, "signal booster");
        assert_eq!(project.kind, "craft");
        assert_eq!(project.work_units_total, 3);
        assert!(result.needs_clarification);
        assert!(result
            .clarification_questions
            .contains(&"What materials or parts are available?".to_string()));
        assert_eq!(projects.projects.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn retcon_resolution_is_logged_in_dev_mode() {
        let mut intent = Intent::new(ActionType::AskGm).with_dialogue("Undo the explosion");
        intent.metadata = Some(json!({"resolution": "retcon"}));
        let service = service(ScriptedLlm::with_intent(routine_envelope(), intent.clone()));
        let mut session = established_session(9).with_dev_mode(true);
        session.scene.summary = "A cold terminal hall.".to_string();
        session.scene.established = true;
        let mut character = PlayerCharacter::new("Vex");

        service
            .execute_turn(
                &mut session,
                &mut character,
                "please retcon that",
                Some(intent),
                None,
            )
            .await
            .unwrap();

        assert_eq!(session.retcon_log.len(), 1);
        assert_eq!(session.retcon_log[0].note, "Undo the explosion");
    }

    #[tokio::test]
    async fn profile_records_resolved_actions() {
        let intent = Intent::new(ActionType::Explore);
        let memory = Arc::new(InMemoryMemory::new());
        let service = TurnService::new(
            Arc::new(ScriptedLlm::with_intent(routine_envelope(), intent.clone())),
            Arc::new(InMemoryNarrative::new()),
            Arc::new(InMemoryProjects::new()),
            memory.clone(),
            ProtocolRouter::default(),
            TurnConfig::default(),
        );
        let mut session = established_session(9);
        let mut character = PlayerCharacter::new("Vex");

        service
            .execute_turn(
                &mut session,
                &mut character,
                "scout ahead",
                Some(intent),
                None,
            )
            .await
            .unwrap();

        let profile = memory.profile.lock().unwrap().clone().unwrap();
        assert_eq!(profile.top_interest(), "exploration");
    }

    #[tokio::test]
    async fn compaction_threshold_folds_the_turn_log_and_writes_cards() {
        let intent = Intent::new(ActionType::Explore);
        let memory = Arc::new(InMemoryMemory::new());
        let service = TurnService::new(
            Arc::new(ScriptedLlm::with_intent(routine_envelope(), intent.clone())),
            Arc::new(InMemoryNarrative::new()),
            Arc::new(InMemoryProjects::new()),
            memory.clone(),
            ProtocolRouter::default(),
            TurnConfig {
                compaction_threshold: 5,
            },
        );
        let mut session = established_session(9);
        for _ in 0..4 {
            session.record_turn(TurnLogEntry {
                action: "explore".to_string(),
                power: None,
                item: None,
                rolls: Vec::new(),
                outcome: TurnOutcome {
                    hit: None,
                    damage: None,
                },
            });
        }
        let mut character = PlayerCharacter::new("Vex");

        service
            .execute_turn(
                &mut session,
                &mut character,
                "scout ahead",
                Some(intent),
                None,
            )
            .await
            .unwrap();

        assert!(!session.recent_summary.is_empty());
        let cards = memory.cards.lock().unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].entity_type, "location");
        assert_eq!(cards[0].summary_text, session.recent_summary);
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Rust Belt Station"), "rust_belt_station");
        assert_eq!(slugify("  --  "), "scene");
        assert_eq!(slugify("Dock #7 (north)"), "dock_7_north");
    }

    #[test]
    fn shorten_text_collapses_whitespace_and_truncates() {
        assert_eq!(shorten_text("a  b\n c", 100), "a b c");
        let long = "x".repeat(300);
        let short = shorten_text(&long, 180);
        assert!(short.ends_with("..."));
        assert_eq!(short.len(), 183);
    }

    #[test]
    fn suggested_actions_pad_to_three_and_cap_at_five() {
        let all = available_actions();
        let full = build_suggested_actions(&all);
        assert_eq!(full.len(), 5);

        let narrow = vec!["ask_gm".to_string()];
        let padded = build_suggested_actions(&narrow);
        assert_eq!(padded.len(), 3);
        assert_eq!(padded[0].action_type, "ask_gm");
        assert_eq!(padded[1].action_type, "explore");
    }
}
