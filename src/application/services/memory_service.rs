//! Memory service - turn-log compaction and durable memory cards
//!
//! The turn log only ever grows until the compaction threshold, at which
//! point old entries are folded into a capped rolling summary and the log
//! is truncated to the recent window.

use tracing::info;

use crate::domain::entities::{GameSession, MemoryCard, Project, TurnLogEntry};

pub const RECENT_TURN_LIMIT: usize = 30;
pub const ROLLING_SUMMARY_LIMIT: usize = 800;
pub const SUMMARY_SEPARATOR: &str = " | ";

/// One compact line per entry: only the present fields, space separated.
pub fn fact_line(entry: &TurnLogEntry) -> String {
    let mut parts = Vec::new();
    if !entry.action.is_empty() {
        parts.push(format!("action={}", entry.action));
    }
    if let Some(power) = &entry.power {
        parts.push(format!("power={power}"));
    }
    if let Some(item) = &entry.item {
        parts.push(format!("item={item}"));
    }
    if let Some(hit) = entry.outcome.hit {
        parts.push(format!("hit={hit}"));
    }
    if let Some(damage) = entry.outcome.damage {
        parts.push(format!("damage={damage}"));
    }
    parts.join(" ")
}

fn facts_from_entries(entries: &[TurnLogEntry]) -> Vec<String> {
    entries
        .iter()
        .map(fact_line)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Numbered citations for the most recent turns, for retcon disputes.
pub fn turn_citations(session: &GameSession, limit: usize) -> Vec<String> {
    let log = &session.turn_log;
    if log.is_empty() {
        return Vec::new();
    }
    let offset = session.turn_index.saturating_sub(log.len());
    let start = log.len().saturating_sub(limit);
    log[start..]
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| {
            let line = fact_line(entry);
            if line.is_empty() {
                return None;
            }
            Some(format!("Turn {}: {line}", offset + start + idx + 1))
        })
        .collect()
}

fn dedupe_facts<I: IntoIterator<Item = String>>(facts: I) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut ordered = Vec::new();
    for fact in facts {
        if fact.is_empty() || !seen.insert(fact.clone()) {
            continue;
        }
        ordered.push(fact);
    }
    ordered
}

/// Keep the newest facts that fit under the character cap, preserving order.
fn trim_facts(facts: &[String], limit: usize) -> String {
    let mut kept: Vec<&String> = Vec::new();
    let mut total = 0;
    for fact in facts.iter().rev() {
        let extra = fact.len() + if kept.is_empty() { 0 } else { SUMMARY_SEPARATOR.len() };
        if total + extra > limit {
            continue;
        }
        kept.push(fact);
        total += extra;
    }
    kept.reverse();
    kept.into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(SUMMARY_SEPARATOR)
}

fn merge_rolling_summary(existing: &str, new_facts: Vec<String>) -> String {
    let existing_facts: Vec<String> = if existing.is_empty() {
        Vec::new()
    } else {
        existing
            .split(SUMMARY_SEPARATOR)
            .map(str::to_string)
            .collect()
    };
    let combined = dedupe_facts(existing_facts.into_iter().chain(new_facts));
    trim_facts(&combined, ROLLING_SUMMARY_LIMIT)
}

/// Cards to upsert after a compaction pass: the current location plus one
/// progress card per project.
pub fn compaction_cards(session: &GameSession, projects: &[Project]) -> Vec<MemoryCard> {
    let mut cards = Vec::new();
    if !session.location.is_empty() {
        let summary = if session.rolling_summary.is_empty() {
            session.recent_summary.clone()
        } else {
            session.rolling_summary.clone()
        };
        cards.push(MemoryCard::new(
            "location",
            session.location.clone(),
            summary,
        ));
    }
    for project in projects {
        let status = serde_json::to_value(project.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let fact = format!(
            "project={} status={} progress={}/{}",
            project.name, status, project.work_units_done, project.work_units_total
        );
        cards.push(MemoryCard::new("project", project.name.clone(), fact));
    }
    cards
}

/// Refresh the recent summary and, once the log reaches the threshold, fold
/// old turns into the rolling summary and truncate the log. Returns whether
/// the session changed.
pub fn promote_memories(session: &mut GameSession, turn_count_threshold: usize) -> bool {
    if session.turn_log.is_empty() {
        return false;
    }
    let mut updated = false;

    let recent_start = session.turn_log.len().saturating_sub(RECENT_TURN_LIMIT);
    let recent_summary = facts_from_entries(&session.turn_log[recent_start..]).join(SUMMARY_SEPARATOR);
    if session.recent_summary != recent_summary {
        session.recent_summary = recent_summary;
        updated = true;
    }

    if session.turn_log.len() >= turn_count_threshold {
        let old_facts = facts_from_entries(&session.turn_log[..recent_start]);
        if !old_facts.is_empty() {
            let rolling = merge_rolling_summary(&session.rolling_summary, old_facts);
            if session.rolling_summary != rolling {
                session.rolling_summary = rolling;
                updated = true;
            }
        }
        if session.turn_log.len() > RECENT_TURN_LIMIT {
            session.turn_log.drain(..recent_start);
            updated = true;
            info!(
                kept = session.turn_log.len(),
                "turn log compacted to recent window"
            );
        }
    }

    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::TurnOutcome;

    fn entry(action: &str, hit: Option<bool>, damage: Option<i64>) -> TurnLogEntry {
        TurnLogEntry {
            action: action.to_string(),
            outcome: TurnOutcome { hit, damage },
            ..Default::default()
        }
    }

    #[test]
    fn fact_lines_include_only_present_fields() {
        let full = TurnLogEntry {
            action: "attack".to_string(),
            power: Some("overload".to_string()),
            item: None,
            rolls: Vec::new(),
            outcome: TurnOutcome {
                hit: Some(true),
                damage: Some(4),
            },
        };
        assert_eq!(fact_line(&full), "action=attack power=overload hit=true damage=4");
        assert_eq!(fact_line(&entry("move", None, None)), "action=move");
    }

    #[test]
    fn recent_summary_tracks_last_window() {
        let mut session = GameSession::new(1);
        for i in 0..40 {
            session.record_turn(entry(&format!("act{i}"), None, None));
        }
        assert!(promote_memories(&mut session, 100));
        assert!(session.recent_summary.starts_with("action=act10"));
        assert!(session.recent_summary.ends_with("action=act39"));
        // Below the threshold the log itself is untouched.
        assert_eq!(session.turn_log.len(), 40);
        assert!(session.rolling_summary.is_empty());
    }

    #[test]
    fn threshold_folds_old_turns_and_truncates_log() {
        let mut session = GameSession::new(1);
        for i in 0..100 {
            session.record_turn(entry(&format!("act{i}"), None, None));
        }
        assert!(promote_memories(&mut session, 100));
        assert_eq!(session.turn_log.len(), RECENT_TURN_LIMIT);
        assert_eq!(session.turn_log[0].action, "act70");
        assert!(!session.rolling_summary.is_empty());
        assert!(session.rolling_summary.len() <= ROLLING_SUMMARY_LIMIT);
        // Rolling summary keeps the newest old facts under the cap.
        assert!(session.rolling_summary.ends_with("action=act69"));
    }

    #[test]
    fn rolling_summary_deduplicates_repeated_facts() {
        let mut session = GameSession::new(1);
        for _ in 0..100 {
            session.record_turn(entry("attack", Some(true), Some(3)));
        }
        promote_memories(&mut session, 100);
        assert_eq!(session.rolling_summary, "action=attack hit=true damage=3");
    }

    #[test]
    fn citations_number_turns_after_compaction() {
        let mut session = GameSession::new(1);
        for i in 0..100 {
            session.record_turn(entry(&format!("act{i}"), None, None));
        }
        promote_memories(&mut session, 100);
        // turn_index still counts all 100 turns; log holds the last 30.
        let citations = turn_citations(&session, 5);
        assert_eq!(citations.len(), 5);
        assert_eq!(citations[0], "Turn 96: action=act95");
        assert_eq!(citations[4], "Turn 100: action=act99");
    }

    #[test]
    fn compaction_cards_cover_location_and_projects() {
        let mut session = GameSession::new(1).with_location("Ash Market");
        session.rolling_summary = "action=attack".to_string();
        let mut project = Project::new("Signal Booster", "craft", 3);
        project.advance(1);
        let cards = compaction_cards(&session, &[project]);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].entity_type, "location");
        assert_eq!(cards[0].summary_text, "action=attack");
        assert_eq!(cards[1].entity_type, "project");
        assert_eq!(
            cards[1].summary_text,
            "project=Signal Booster status=active progress=1/3"
        );
    }
}
