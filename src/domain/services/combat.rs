//! Combat resolver - deterministic single-attack resolution
//!
//! Resolves one attack (called shots, dodge/block/counter reactions) into
//! hit/damage/resource outcomes. Inputs are immutable snapshots; the resolver
//! returns updated copies of both combatants alongside the result.

use serde::{Deserialize, Serialize};

use crate::domain::entities::Combatant;
use crate::domain::entities::Weapon;
use crate::domain::services::dice::{DiceError, DiceSession};
use crate::domain::services::statuses::{StatusLedger, TickKind};
use crate::domain::value_objects::StatusName;

pub const CALLED_SHOT_PENALTY: i64 = 5;
pub const DODGE_BONUS_DEFAULT: i64 = 2;

/// Targeted attack outcomes beyond plain damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalledShotEffect {
    /// Target drops a held item on hit. Narrative-only, no status applied.
    Disarm,
    /// Target movement reduced until end of next turn (one Cold stack).
    Slow,
    /// Target must resist or be Stunned.
    StunAttempt,
}

impl CalledShotEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalledShotEffect::Disarm => "disarm",
            CalledShotEffect::Slow => "slow",
            CalledShotEffect::StunAttempt => "stun_attempt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    Dodge,
    Block,
    Counter,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CombatError {
    #[error("Unknown called shot effect: {0}")]
    UnknownCalledShotEffect(String),
    #[error("Attacker has no weapon for damage roll")]
    NoWeapon,
    #[error(transparent)]
    Dice(#[from] DiceError),
}

/// How a defender reacted, with any resources spent on the reaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReactionChoice {
    pub reaction: Option<Reaction>,
    /// Dodge bonus override; 0 means use the default.
    pub bonus: i64,
    /// Extra absorption granted by a block reaction.
    pub ap: i64,
}

/// Options for a single attack resolution. Roll overrides exist so tests and
/// simulated scenarios can pin the d20 without touching the dice stream.
#[derive(Debug, Clone, Default)]
pub struct AttackOptions {
    pub called_shot: bool,
    pub called_shot_effect: Option<CalledShotEffect>,
    pub reaction: ReactionChoice,
    pub attack_roll_override: Option<i64>,
    pub counter_roll_override: Option<i64>,
}

/// Outcome of a counter strike after a missed attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterResult {
    pub triggered: bool,
    pub hit: bool,
    pub attack_roll: i64,
    pub attack_total: i64,
    pub damage: i64,
    pub ap_before: i64,
    pub ap_after: i64,
    pub hp_before: i64,
    pub hp_after: i64,
}

/// Full outcome of one attack resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResult {
    pub hit: bool,
    pub crit: bool,
    pub attack_roll: i64,
    pub attack_total: i64,
    pub target_ar: i64,
    pub damage: i64,
    pub ap_before: i64,
    pub ap_after: i64,
    pub hp_before: i64,
    pub hp_after: i64,
    pub called_shot_effect: Option<CalledShotEffect>,
    pub counter: Option<CounterResult>,
}

/// Default per-turn action economy.
pub fn base_actions() -> (i64, i64) {
    (1, 1)
}

/// Initiative: d20 + dex (less cold penalty) + initiative bonus.
pub fn roll_initiative(dice: &mut DiceSession, combatant: &Combatant, bonus: i64) -> i64 {
    let effective_dex = combatant.dex - combatant.statuses.total_dex_penalty();
    dice.roll_d20(Some("initiative")) + effective_dex + combatant.initiative_bonus + bonus
}

/// Roll initiative for each combatant and sort descending.
pub fn initiative_order(
    dice: &mut DiceSession,
    combatants: &[Combatant],
) -> Vec<(Combatant, i64)> {
    let mut rolled: Vec<(Combatant, i64)> = combatants
        .iter()
        .map(|c| (c.clone(), roll_initiative(dice, c, 0)))
        .collect();
    rolled.sort_by(|a, b| b.1.cmp(&a.1));
    rolled
}

/// Resolve one attack. Returns the result plus updated snapshots of both
/// combatants (attacker may change when a counter lands).
pub fn resolve_attack(
    dice: &mut DiceSession,
    attacker: &Combatant,
    defender: &Combatant,
    options: &AttackOptions,
) -> Result<(AttackResult, Combatant, Combatant), CombatError> {
    let called_shot_effect = if options.called_shot {
        Some(options.called_shot_effect.unwrap_or(CalledShotEffect::Disarm))
    } else {
        None
    };

    let dodge_bonus = dodge_bonus(&options.reaction);
    let target_ar = defender.armor_rating + dodge_bonus;

    let attack_roll = options
        .attack_roll_override
        .unwrap_or_else(|| dice.roll_d20(Some("attack")));
    let crit = attack_roll >= 19;
    let attack_total = attack_roll + attacker.skill + attacker.attr + attacker.attack_bonus
        - if options.called_shot {
            CALLED_SHOT_PENALTY
        } else {
            0
        };
    let hit = attack_total >= target_ar;

    let base_ap = defender.ap;
    let block_ap = match options.reaction.reaction {
        Some(Reaction::Block) => options.reaction.ap,
        _ => 0,
    };
    let ap_before = base_ap + block_ap;
    let hp_before = defender.hp;
    let mut ap_after = base_ap;
    let mut hp_after = hp_before;
    let mut damage_total = 0;
    let mut updated_statuses = defender.statuses.clone();

    if hit {
        let weapon = attacker.weapon.as_ref().ok_or(CombatError::NoWeapon)?;
        damage_total = roll_damage(
            dice,
            &weapon.damage,
            weapon.bonus + attacker.damage_bonus,
            crit,
        )?;
        if block_ap > 0 {
            (ap_after, hp_after) = apply_damage_with_block(base_ap, hp_before, damage_total, block_ap);
        } else {
            (ap_after, hp_after) = apply_damage(base_ap, hp_before, damage_total);
        }
        if let Some(effect) = called_shot_effect {
            updated_statuses = apply_called_shot_effect(&defender.statuses, effect);
        }
    }

    let mut updated_attacker = attacker.clone();
    let counter = if options.reaction.reaction == Some(Reaction::Counter) && !hit {
        let (counter_result, struck_attacker) = resolve_counter(
            dice,
            options.counter_roll_override,
            attacker,
            defender,
        )?;
        updated_attacker = struck_attacker;
        Some(counter_result)
    } else {
        None
    };

    let result = AttackResult {
        hit,
        crit,
        attack_roll,
        attack_total,
        target_ar,
        damage: damage_total,
        ap_before,
        ap_after,
        hp_before,
        hp_after,
        called_shot_effect: if hit { called_shot_effect } else { None },
        counter,
    };
    let updated_defender = Combatant {
        ap: ap_after,
        hp: hp_after,
        statuses: updated_statuses,
        ..defender.clone()
    };
    Ok((result, updated_attacker, updated_defender))
}

/// Outcome of an end-of-turn status tick on one combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndTurnReport {
    pub hp_delta: i64,
    pub expired: Vec<StatusName>,
}

/// Apply one status tick to a combatant, clamping HP at 0.
pub fn end_turn(combatant: &Combatant, kind: TickKind) -> (Combatant, EndTurnReport) {
    let outcome = combatant.statuses.tick(kind);
    let updated = Combatant {
        hp: (combatant.hp + outcome.hp_delta).max(0),
        statuses: outcome.ledger,
        ..combatant.clone()
    };
    (
        updated,
        EndTurnReport {
            hp_delta: outcome.hp_delta,
            expired: outcome.expired,
        },
    )
}

fn dodge_bonus(reaction: &ReactionChoice) -> i64 {
    match reaction.reaction {
        Some(Reaction::Dodge) if reaction.bonus != 0 => reaction.bonus,
        Some(Reaction::Dodge) => DODGE_BONUS_DEFAULT,
        _ => 0,
    }
}

/// Weapon damage with the crit rule: a critical doubles the dice-sum portion
/// only, the modifier and flat bonuses apply once.
fn roll_damage(
    dice: &mut DiceSession,
    formula: &str,
    bonus: i64,
    crit: bool,
) -> Result<i64, CombatError> {
    let rolled = dice.roll(formula, Some("damage"))?;
    let base_total = match dice.log().last() {
        // Constant formulas have no dice component to double.
        Some(last) if !last.rolls.is_empty() => {
            last.rolls.iter().sum::<i64>() * if crit { 2 } else { 1 } + last.modifier
        }
        _ => rolled,
    };
    Ok(base_total + bonus)
}

fn apply_damage(ap: i64, hp: i64, damage: i64) -> (i64, i64) {
    let remaining_ap = (ap - damage).max(0);
    let damage_to_hp = (damage - ap).max(0);
    let remaining_hp = (hp - damage_to_hp).max(0);
    (remaining_ap, remaining_hp)
}

/// Block absorption is single-use: the bonus AP soaks damage but whatever is
/// left of it does not carry forward, so the returned AP caps at base AP.
fn apply_damage_with_block(base_ap: i64, hp: i64, damage: i64, block_ap: i64) -> (i64, i64) {
    let (remaining_ap, remaining_hp) = apply_damage(base_ap + block_ap, hp, damage);
    (remaining_ap.min(base_ap), remaining_hp)
}

fn resolve_counter(
    dice: &mut DiceSession,
    roll_override: Option<i64>,
    attacker: &Combatant,
    defender: &Combatant,
) -> Result<(CounterResult, Combatant), CombatError> {
    let counter_weapon = defender.weapon.clone().unwrap_or_else(Weapon::unarmed);
    let attack_roll = roll_override.unwrap_or_else(|| dice.roll_d20(Some("counter")));
    let attack_total = attack_roll + defender.skill + defender.attr + defender.attack_bonus;
    let hit = attack_total >= attacker.armor_rating;

    let ap_before = attacker.ap;
    let hp_before = attacker.hp;
    let mut ap_after = ap_before;
    let mut hp_after = hp_before;
    let mut damage_total = 0;

    if hit {
        damage_total = roll_damage(
            dice,
            &counter_weapon.damage,
            counter_weapon.bonus + defender.damage_bonus,
            attack_roll >= 19,
        )?;
        (ap_after, hp_after) = apply_damage(ap_before, hp_before, damage_total);
    }

    let counter_result = CounterResult {
        triggered: true,
        hit,
        attack_roll,
        attack_total,
        damage: damage_total,
        ap_before,
        ap_after,
        hp_before,
        hp_after,
    };
    let updated_attacker = Combatant {
        ap: ap_after,
        hp: hp_after,
        ..attacker.clone()
    };
    Ok((counter_result, updated_attacker))
}

fn apply_called_shot_effect(statuses: &StatusLedger, effect: CalledShotEffect) -> StatusLedger {
    match effect {
        CalledShotEffect::StunAttempt => statuses.apply(StatusName::Stun, 1, 1, Some(1)),
        CalledShotEffect::Slow => statuses.apply(StatusName::Cold, 1, 1, Some(1)),
        CalledShotEffect::Disarm => statuses.clone(),
    }
}

impl std::str::FromStr for CalledShotEffect {
    type Err = CombatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disarm" => Ok(CalledShotEffect::Disarm),
            "slow" => Ok(CalledShotEffect::Slow),
            "stun_attempt" => Ok(CalledShotEffect::StunAttempt),
            _ => Err(CombatError::UnknownCalledShotEffect(s.to_string())),
        }
    }
}
