//! Protocol router - decides whether an envelope executes, freezes time,
//! or bounces back as a clarification

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::dto::TurnEnvelope;
use crate::domain::value_objects::{Confidence, Mode, ProtocolId, ProtocolRegistry, TimePolicy};

/// The routing verdict for one envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedDecision {
    pub protocol_id: ProtocolId,
    pub freeze_time: bool,
    pub execute: bool,
    pub reason: Option<String>,
    pub dev_report: Option<serde_json::Value>,
    pub ooc_questions: Vec<String>,
}

impl RoutedDecision {
    fn frozen(protocol_id: ProtocolId, reason: &str) -> Self {
        Self {
            protocol_id,
            freeze_time: true,
            execute: false,
            reason: Some(reason.to_string()),
            dev_report: None,
            ooc_questions: Vec::new(),
        }
    }
}

/// Protocols that may still execute on low confidence. Everything else
/// falls back to clarification when the model is unsure.
fn safe_protocols() -> BTreeSet<ProtocolId> {
    BTreeSet::from([
        ProtocolId::Clarification,
        ProtocolId::Routine,
        ProtocolId::Exploration,
        ProtocolId::Downtime,
        ProtocolId::ContentGap,
        ProtocolId::RuleEdgeCase,
        ProtocolId::MemoryPromotion,
        ProtocolId::MemoryRecall,
    ])
}

/// Routes envelopes against a protocol registry.
pub struct ProtocolRouter {
    registry: ProtocolRegistry,
    safe: BTreeSet<ProtocolId>,
}

impl ProtocolRouter {
    pub fn new(registry: ProtocolRegistry) -> Self {
        Self {
            registry,
            safe: safe_protocols(),
        }
    }

    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    /// Route one envelope. Out-of-character requests and unknown protocols
    /// freeze time; low-confidence envelopes outside the safe set do too.
    pub fn route(&self, envelope: &TurnEnvelope, dev_mode_enabled: bool) -> RoutedDecision {
        if envelope.mode == Mode::Ooc || !envelope.ooc_questions.is_empty() {
            let mut decision = RoutedDecision::frozen(ProtocolId::Clarification, "ooc");
            decision.ooc_questions = envelope.ooc_questions.clone();
            return decision;
        }

        let protocol_id = match ProtocolId::from_str(&envelope.protocol_id) {
            Ok(id) => id,
            Err(_) => {
                debug!(protocol_id = %envelope.protocol_id, "unknown protocol in envelope");
                if dev_mode_enabled {
                    let mut decision =
                        RoutedDecision::frozen(ProtocolId::RuleEdgeCase, "unknown_protocol");
                    decision.dev_report = Some(serde_json::json!({
                        "error": "Unknown protocol_id",
                        "protocol_id": envelope.protocol_id,
                    }));
                    return decision;
                }
                let mut decision =
                    RoutedDecision::frozen(ProtocolId::Clarification, "unknown_protocol");
                decision.ooc_questions =
                    vec!["Protocol not recognized. Can you restate your request?".to_string()];
                return decision;
            }
        };

        if envelope.confidence == Confidence::Low && !self.safe.contains(&protocol_id) {
            let mut decision = RoutedDecision::frozen(ProtocolId::Clarification, "low_confidence");
            decision.ooc_questions = vec![
                "I need a bit more detail to proceed safely. What should I focus on?".to_string(),
            ];
            return decision;
        }

        let entry = self.registry.get(protocol_id);
        RoutedDecision {
            protocol_id,
            freeze_time: entry.time_policy == TimePolicy::Freeze,
            execute: true,
            reason: Some("ok".to_string()),
            dev_report: None,
            ooc_questions: Vec::new(),
        }
    }
}

impl Default for ProtocolRouter {
    fn default() -> Self {
        Self::new(ProtocolRegistry::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::Classification;
    use crate::domain::value_objects::Confidence;

    fn envelope(protocol_id: &str, mode: Mode, confidence: Confidence) -> TurnEnvelope {
        TurnEnvelope {
            mode,
            protocol_id: protocol_id.to_string(),
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
            council: None,
        }
    }

    #[test]
    fn ooc_mode_freezes_into_clarification() {
        let router = ProtocolRouter::default();
        let mut env = envelope("PROTO_ROUTINE", Mode::Ooc, Confidence::High);
        env.ooc_questions = vec!["Can we pause?".to_string()];
        let decision = router.route(&env, false);
        assert_eq!(decision.protocol_id, ProtocolId::Clarification);
        assert!(decision.freeze_time);
        assert!(!decision.execute);
        assert_eq!(decision.reason.as_deref(), Some("ooc"));
        assert_eq!(decision.ooc_questions, vec!["Can we pause?"]);
    }

    #[test]
    fn ooc_questions_alone_trigger_clarification() {
        let router = ProtocolRouter::default();
        let mut env = envelope("PROTO_ROUTINE", Mode::Gm, Confidence::High);
        env.ooc_questions = vec!["What year is it?".to_string()];
        let decision = router.route(&env, false);
        assert_eq!(decision.protocol_id, ProtocolId::Clarification);
        assert!(!decision.execute);
    }

    #[test]
    fn unknown_protocol_asks_for_restatement() {
        let router = ProtocolRouter::default();
        let env = envelope("PROTO_FIREBALL", Mode::Gm, Confidence::High);
        let decision = router.route(&env, false);
        assert_eq!(decision.protocol_id, ProtocolId::Clarification);
        assert_eq!(decision.reason.as_deref(), Some("unknown_protocol"));
        assert_eq!(
            decision.ooc_questions,
            vec!["Protocol not recognized. Can you restate your request?"]
        );
    }

    #[test]
    fn unknown_protocol_in_dev_mode_becomes_diagnostic_edge_case() {
        let router = ProtocolRouter::default();
        let env = envelope("PROTO_FIREBALL", Mode::Gm, Confidence::High);
        let decision = router.route(&env, true);
        assert_eq!(decision.protocol_id, ProtocolId::RuleEdgeCase);
        assert!(decision.freeze_time);
        assert!(!decision.execute);
        let report = decision.dev_report.unwrap();
        assert_eq!(report["protocol_id"], "PROTO_FIREBALL");
    }

    #[test]
    fn low_confidence_outside_safe_set_is_clarification() {
        let router = ProtocolRouter::default();
        let env = envelope("PROTO_INVENTION", Mode::Gm, Confidence::Low);
        let decision = router.route(&env, false);
        assert_eq!(decision.protocol_id, ProtocolId::Clarification);
        assert_eq!(decision.reason.as_deref(), Some("low_confidence"));
    }

    #[test]
    fn low_confidence_exploration_still_executes() {
        let router = ProtocolRouter::default();
        let env = envelope("PROTO_EXPLORATION", Mode::Gm, Confidence::Low);
        let decision = router.route(&env, false);
        assert_eq!(decision.protocol_id, ProtocolId::Exploration);
        assert!(decision.execute);
        assert_eq!(decision.reason.as_deref(), Some("ok"));
    }

    #[test]
    fn known_protocol_carries_registry_time_policy() {
        let router = ProtocolRouter::default();
        let invention = router.route(
            &envelope("PROTO_INVENTION", Mode::Gm, Confidence::High),
            false,
        );
        assert!(invention.execute);
        assert!(!invention.freeze_time);

        let clarification = router.route(
            &envelope("PROTO_CLARIFICATION", Mode::Gm, Confidence::High),
            false,
        );
        assert!(clarification.execute);
        assert!(clarification.freeze_time);
    }
}
