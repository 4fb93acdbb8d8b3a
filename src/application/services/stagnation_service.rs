//! Stagnation service - injects pressure when play stalls
//!
//! Picks one of up to three escalations from the seeded stream: a fresh
//! opportunity, an advancing clock, or a consequence for an ignored thread.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::debug;

use crate::domain::entities::{Clock, GameSession, NarrativeThread};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagnationAction {
    Opportunity,
    EscalateClock,
    ThreadConsequence,
}

impl StagnationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StagnationAction::Opportunity => "opportunity",
            StagnationAction::EscalateClock => "escalate_clock",
            StagnationAction::ThreadConsequence => "thread_consequence",
        }
    }
}

/// What the stagnation beat did to the world.
#[derive(Debug, Clone)]
pub struct StagnationOutcome {
    pub action: StagnationAction,
    /// Clock state after escalation, when a clock advanced.
    pub escalated_clock: Option<Clock>,
    /// The ignored thread that now bites back, when one was chosen.
    pub consequence_thread: Option<NarrativeThread>,
    /// The high-urgency hook injected into play.
    pub hook: NarrativeThread,
}

/// Pick the escalation for this beat and bump the stagnation counter.
/// The option list length feeds the seed so the choice shifts as clocks
/// fill and threads close.
fn choose_action(
    session: &mut GameSession,
    has_open_threads: bool,
    has_active_clocks: bool,
) -> StagnationAction {
    let mut options = vec![StagnationAction::Opportunity];
    if has_active_clocks {
        options.push(StagnationAction::EscalateClock);
    }
    if has_open_threads {
        options.push(StagnationAction::ThreadConsequence);
    }
    let seed = session
        .seed
        .wrapping_add(session.stagnation_index)
        .wrapping_add(options.len() as u64 * 13);
    let mut rng = StdRng::seed_from_u64(seed);
    let pick = (rng.next_u64() % options.len() as u64) as usize;
    session.stagnation_index += 1;
    options[pick]
}

fn build_hook(
    action: StagnationAction,
    top_interest: &str,
    escalated_clock: Option<&Clock>,
    consequence_thread: Option<&NarrativeThread>,
) -> NarrativeThread {
    let text = match action {
        StagnationAction::EscalateClock => {
            let clock_name = escalated_clock
                .map(|clock| clock.name.as_str())
                .unwrap_or("a looming deadline");
            format!("Tension rises: {clock_name} advances and forces a response.")
        }
        StagnationAction::ThreadConsequence => {
            let thread_text = consequence_thread
                .map(|thread| thread.text.as_str())
                .unwrap_or("an ignored lead");
            format!("Tension rises: ignoring {thread_text} triggers a consequence.")
        }
        StagnationAction::Opportunity => {
            format!("Tension rises: an opportunity in {top_interest} demands attention.")
        }
    };
    NarrativeThread::new("hook", text).with_urgency("high")
}

/// Resolve one stagnation beat. Sets the pacing tag to tension and returns
/// the escalation for the caller to persist and narrate.
pub fn escalate(
    session: &mut GameSession,
    threads: &[NarrativeThread],
    clocks: &mut [Clock],
    top_interest: &str,
) -> StagnationOutcome {
    let open_threads: Vec<&NarrativeThread> = threads.iter().filter(|t| t.is_open()).collect();
    let has_active_clocks = clocks.iter().any(Clock::is_active);
    let action = choose_action(session, !open_threads.is_empty(), has_active_clocks);
    debug!(action = action.as_str(), "stagnation escalation chosen");

    let mut escalated_clock = None;
    if action == StagnationAction::EscalateClock {
        if let Some(clock) = clocks.iter_mut().find(|clock| clock.is_active()) {
            clock.advance(1);
            escalated_clock = Some(clock.clone());
        }
    }

    let consequence_thread = if action == StagnationAction::ThreadConsequence {
        open_threads.first().map(|thread| (*thread).clone())
    } else {
        None
    };

    let hook = build_hook(
        action,
        top_interest,
        escalated_clock.as_ref(),
        consequence_thread.as_ref(),
    );
    session.pacing_tag = Some("tension".to_string());

    StagnationOutcome {
        action,
        escalated_clock,
        consequence_thread,
        hook,
    }
}
