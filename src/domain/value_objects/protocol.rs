//! Protocol registry - the closed catalog of situational operating modes
//!
//! Every turn executes under exactly one protocol. Each entry declares whether
//! game time advances, its risk policy, and which tools/context it may use.
//! The registry is constructed once, validated, and injected into the router
//! rather than living as module-global state.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Whether game time advances while a protocol runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePolicy {
    Freeze,
    Advance,
}

/// The closed set of protocol identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProtocolId {
    #[serde(rename = "PROTO_CLARIFICATION")]
    Clarification,
    #[serde(rename = "PROTO_INVENTION")]
    Invention,
    #[serde(rename = "PROTO_CATASTROPHIC")]
    Catastrophic,
    #[serde(rename = "PROTO_CONTENT_GAP")]
    ContentGap,
    #[serde(rename = "PROTO_EXPLORATION")]
    Exploration,
    #[serde(rename = "PROTO_STAGNATION")]
    Stagnation,
    #[serde(rename = "PROTO_WORLD_BOOTSTRAP")]
    WorldBootstrap,
    #[serde(rename = "PROTO_ARC_SEEDING")]
    ArcSeeding,
    #[serde(rename = "PROTO_ROUTINE")]
    Routine,
    #[serde(rename = "PROTO_RETCON_DISPUTE")]
    RetconDispute,
    #[serde(rename = "PROTO_RULE_EDGE_CASE")]
    RuleEdgeCase,
    #[serde(rename = "PROTO_DOWNTIME")]
    Downtime,
    #[serde(rename = "PROTO_MEMORY_PROMOTION")]
    MemoryPromotion,
    #[serde(rename = "PROTO_MEMORY_RECALL")]
    MemoryRecall,
}

impl ProtocolId {
    pub const ALL: [ProtocolId; 14] = [
        ProtocolId::Clarification,
        ProtocolId::Invention,
        ProtocolId::Catastrophic,
        ProtocolId::ContentGap,
        ProtocolId::Exploration,
        ProtocolId::Stagnation,
        ProtocolId::WorldBootstrap,
        ProtocolId::ArcSeeding,
        ProtocolId::Routine,
        ProtocolId::RetconDispute,
        ProtocolId::RuleEdgeCase,
        ProtocolId::Downtime,
        ProtocolId::MemoryPromotion,
        ProtocolId::MemoryRecall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolId::Clarification => "PROTO_CLARIFICATION",
            ProtocolId::Invention => "PROTO_INVENTION",
            ProtocolId::Catastrophic => "PROTO_CATASTROPHIC",
            ProtocolId::ContentGap => "PROTO_CONTENT_GAP",
            ProtocolId::Exploration => "PROTO_EXPLORATION",
            ProtocolId::Stagnation => "PROTO_STAGNATION",
            ProtocolId::WorldBootstrap => "PROTO_WORLD_BOOTSTRAP",
            ProtocolId::ArcSeeding => "PROTO_ARC_SEEDING",
            ProtocolId::Routine => "PROTO_ROUTINE",
            ProtocolId::RetconDispute => "PROTO_RETCON_DISPUTE",
            ProtocolId::RuleEdgeCase => "PROTO_RULE_EDGE_CASE",
            ProtocolId::Downtime => "PROTO_DOWNTIME",
            ProtocolId::MemoryPromotion => "PROTO_MEMORY_PROMOTION",
            ProtocolId::MemoryRecall => "PROTO_MEMORY_RECALL",
        }
    }
}

impl std::fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolId {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProtocolId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownProtocol(s.to_string()))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown protocol id: {0}")]
pub struct UnknownProtocol(pub String);

/// Static policy for one protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolEntry {
    pub time_policy: TimePolicy,
    pub risk_policy: String,
    pub allowed_tools: Vec<String>,
    pub required_context: Vec<String>,
}

impl ProtocolEntry {
    fn new(
        time_policy: TimePolicy,
        risk_policy: &str,
        allowed_tools: &[&str],
        required_context: &[&str],
    ) -> Self {
        Self {
            time_policy,
            risk_policy: risk_policy.to_string(),
            allowed_tools: allowed_tools.iter().map(|s| s.to_string()).collect(),
            required_context: required_context.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("{0} missing from protocol registry")]
    MissingProtocol(ProtocolId),
    #[error("{0} has empty risk policy")]
    EmptyRiskPolicy(ProtocolId),
}

/// Process-wide immutable protocol configuration.
#[derive(Debug, Clone)]
pub struct ProtocolRegistry {
    entries: BTreeMap<ProtocolId, ProtocolEntry>,
}

impl ProtocolRegistry {
    /// The built-in catalog. Covers every [`ProtocolId`].
    pub fn builtin() -> Self {
        use ProtocolId::*;
        use TimePolicy::*;

        let mut entries = BTreeMap::new();
        entries.insert(
            Clarification,
            ProtocolEntry::new(Freeze, "none", &[], &["last_intent", "scene_snapshot"]),
        );
        entries.insert(
            Invention,
            ProtocolEntry::new(
                Advance,
                "none",
                &["npc_generator", "location_generator"],
                &["era", "setting"],
            ),
        );
        entries.insert(
            Catastrophic,
            ProtocolEntry::new(
                Freeze,
                "confirm_catastrophic",
                &["threat_assessor"],
                &["stakes", "party_state"],
            ),
        );
        entries.insert(
            ContentGap,
            ProtocolEntry::new(
                Freeze,
                "none",
                &["lore_lookup"],
                &["requested_topic", "campaign_memory"],
            ),
        );
        entries.insert(
            Exploration,
            ProtocolEntry::new(
                Advance,
                "none",
                &["map_hint", "sensory_prompt"],
                &["location", "scene_snapshot"],
            ),
        );
        entries.insert(
            Stagnation,
            ProtocolEntry::new(
                Advance,
                "none",
                &["pace_boost"],
                &["last_actions", "scene_snapshot"],
            ),
        );
        entries.insert(
            WorldBootstrap,
            ProtocolEntry::new(
                Freeze,
                "none",
                &["world_seed"],
                &["era", "setting", "player_prefs"],
            ),
        );
        entries.insert(
            ArcSeeding,
            ProtocolEntry::new(Advance, "none", &["plot_seed"], &["session_setup", "npcs"]),
        );
        entries.insert(
            Routine,
            ProtocolEntry::new(Advance, "none", &[], &["scene_snapshot"]),
        );
        entries.insert(
            RetconDispute,
            ProtocolEntry::new(
                Freeze,
                "confirm_catastrophic",
                &["log_review"],
                &["turn_log", "player_statement"],
            ),
        );
        entries.insert(
            RuleEdgeCase,
            ProtocolEntry::new(
                Freeze,
                "none",
                &["rules_lookup"],
                &["rule_context", "character_state"],
            ),
        );
        entries.insert(
            Downtime,
            ProtocolEntry::new(
                Advance,
                "none",
                &["downtime_generator"],
                &["party_state", "resources"],
            ),
        );
        entries.insert(
            MemoryPromotion,
            ProtocolEntry::new(Freeze, "none", &["memory_writer"], &["session_summary"]),
        );
        entries.insert(
            MemoryRecall,
            ProtocolEntry::new(Freeze, "none", &[], &["turn_log", "session_summary"]),
        );

        Self { entries }
    }

    /// Check policy-value correctness. Called once at startup.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for id in ProtocolId::ALL {
            let entry = self
                .entries
                .get(&id)
                .ok_or(RegistryError::MissingProtocol(id))?;
            if entry.risk_policy.trim().is_empty() {
                return Err(RegistryError::EmptyRiskPolicy(id));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: ProtocolId) -> &ProtocolEntry {
        // builtin() covers every variant and validate() enforces it
        &self.entries[&id]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProtocolId, &ProtocolEntry)> {
        self.entries.iter()
    }
}
