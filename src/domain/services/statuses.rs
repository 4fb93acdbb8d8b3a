//! Status ledger - pure apply/ramp/tick operations over timed effects
//!
//! All operations take the ledger by reference and return a new one; callers
//! keep ownership of "current" state. Stacks never drop below 1 once an entry
//! exists, level is monotone non-decreasing, and an entry without a duration
//! never auto-expires.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{StatusEntry, StatusError, StatusName};

/// Which kind of time step a tick represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickKind {
    Turn,
    Day,
}

/// Result of ticking a ledger one time step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub ledger: StatusLedger,
    /// Net HP change, ≤ 0 (status effects only deal damage, never heal).
    pub hp_delta: i64,
    pub expired: Vec<StatusName>,
}

/// Ordered map of active effects on one combatant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLedger {
    entries: BTreeMap<StatusName, StatusEntry>,
}

impl StatusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: StatusName) -> Option<&StatusEntry> {
        self.entries.get(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StatusName, &StatusEntry)> {
        self.entries.iter()
    }

    /// Apply an effect by canonical name: stacks add, level takes the max,
    /// duration takes the max of existing and given (or the status default).
    pub fn apply(
        &self,
        name: StatusName,
        stacks: i64,
        level: i64,
        duration: Option<i64>,
    ) -> StatusLedger {
        let mut updated = self.clone();
        let entry = updated.entries.entry(name).or_insert(StatusEntry {
            stacks: 0,
            level: 0,
            duration: None,
        });

        entry.stacks = (entry.stacks + stacks).max(1);
        entry.level = entry.level.max(level);

        let duration = duration.or_else(|| name.default_duration());
        if let Some(given) = duration {
            entry.duration = Some(match entry.duration {
                Some(existing) => existing.max(given),
                None => given,
            });
        }
        updated
    }

    /// Apply by free-text name, validated against the closed vocabulary.
    pub fn apply_named(
        &self,
        name: &str,
        stacks: i64,
        level: i64,
        duration: Option<i64>,
    ) -> Result<StatusLedger, StatusError> {
        let canonical: StatusName = name.parse()?;
        Ok(self.apply(canonical, stacks, level, duration))
    }

    /// Status- and trigger-specific escalation. Unrecognized trigger/status
    /// combinations leave the entry untouched (but still materialize it).
    pub fn ramp(&self, name: StatusName, trigger: &str, amount: i64) -> StatusLedger {
        let mut updated = self.clone();
        let entry = updated.entries.entry(name).or_insert(StatusEntry {
            stacks: 1,
            level: 1,
            duration: None,
        });
        let trigger = trigger.trim().to_lowercase();

        match (name, trigger.as_str()) {
            (StatusName::Bleeding, "move") => {
                entry.stacks += amount;
                entry.level = entry.level.max(entry.stacks);
                entry.duration = Some(entry.duration.unwrap_or(0).max(3));
            }
            (StatusName::Ignited, "ignite" | "fuel")
            | (StatusName::Cold, "cold" | "exposure")
            | (StatusName::Toxin, "exposed" | "dose")
            | (StatusName::Injured, "worsen" | "hit") => {
                entry.level += amount;
                entry.duration = Some(entry.duration.unwrap_or(0).max(3));
            }
            (StatusName::Asphyxiation, "no_air") => {
                entry.level += amount;
                entry.duration = Some(entry.duration.unwrap_or(0).max(2));
            }
            (StatusName::Disease, "day") => {
                entry.level += amount;
            }
            (StatusName::Hidden | StatusName::Concentration | StatusName::Stun, "refresh") => {
                if let Some(default) = name.default_duration() {
                    entry.duration = Some(entry.duration.unwrap_or(0).max(default));
                }
            }
            _ => {}
        }
        updated
    }

    /// Advance one time step: deal periodic damage, decay durations, and
    /// collect expired effects.
    pub fn tick(&self, kind: TickKind) -> TickOutcome {
        let mut updated = StatusLedger::new();
        let mut hp_delta = 0;
        let mut expired = Vec::new();

        for (&name, entry) in &self.entries {
            let mut entry = entry.clone();
            let stacks = entry.stacks.max(1);
            let level = entry.level.max(1);

            match (name, kind) {
                (StatusName::Bleeding, TickKind::Turn) => hp_delta -= stacks * level,
                (StatusName::Ignited, TickKind::Turn)
                | (StatusName::Asphyxiation, TickKind::Turn) => hp_delta -= 2 * level,
                (StatusName::Toxin, TickKind::Turn) => hp_delta -= level,
                (StatusName::Disease, TickKind::Day) => {
                    entry.level = level + 1;
                    hp_delta -= entry.level;
                }
                _ => {}
            }

            if kind == TickKind::Turn {
                if let Some(duration) = entry.duration {
                    let remaining = duration - 1;
                    if remaining <= 0 {
                        expired.push(name);
                        continue;
                    }
                    entry.duration = Some(remaining);
                }
            }
            updated.entries.insert(name, entry);
        }

        TickOutcome {
            ledger: updated,
            hp_delta,
            expired,
        }
    }

    /// Dexterity penalty from exposure: Σ max(1, level) over Cold entries.
    pub fn total_dex_penalty(&self) -> i64 {
        self.entries
            .iter()
            .filter(|(name, _)| **name == StatusName::Cold)
            .map(|(_, entry)| entry.level.max(1))
            .sum()
    }
}
