//! Combatant - one side of an attack resolution

use serde::{Deserialize, Serialize};

use crate::domain::services::statuses::StatusLedger;

/// An equipped weapon: damage formula plus a flat bonus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub damage: String,
    pub bonus: i64,
    pub tags: Vec<String>,
}

impl Weapon {
    pub fn new(name: impl Into<String>, damage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            damage: damage.into(),
            bonus: 0,
            tags: Vec::new(),
        }
    }

    pub fn with_bonus(mut self, bonus: i64) -> Self {
        self.bonus = bonus;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Fallback strike when countering without a weapon in hand.
    pub fn unarmed() -> Self {
        Weapon::new("Counter Strike", "1d4")
    }
}

/// Immutable snapshot of one combatant. The resolver never mutates its
/// inputs; it returns fresh snapshots and the caller owns "current" state.
///
/// AP (absorption points) buffer damage before HP; neither goes below 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub name: String,
    pub dex: i64,
    pub armor_rating: i64,
    pub ap: i64,
    pub hp: i64,
    pub statuses: StatusLedger,
    pub skill: i64,
    pub attr: i64,
    pub attack_bonus: i64,
    pub damage_bonus: i64,
    pub weapon: Option<Weapon>,
    pub initiative_bonus: i64,
}

impl Combatant {
    pub fn new(name: impl Into<String>, armor_rating: i64, ap: i64, hp: i64) -> Self {
        Self {
            name: name.into(),
            dex: 0,
            armor_rating,
            ap,
            hp,
            statuses: StatusLedger::new(),
            skill: 0,
            attr: 0,
            attack_bonus: 0,
            damage_bonus: 0,
            weapon: None,
            initiative_bonus: 0,
        }
    }

    pub fn with_dex(mut self, dex: i64) -> Self {
        self.dex = dex;
        self
    }

    pub fn with_skill(mut self, skill: i64) -> Self {
        self.skill = skill;
        self
    }

    pub fn with_attr(mut self, attr: i64) -> Self {
        self.attr = attr;
        self
    }

    pub fn with_attack_bonus(mut self, bonus: i64) -> Self {
        self.attack_bonus = bonus;
        self
    }

    pub fn with_damage_bonus(mut self, bonus: i64) -> Self {
        self.damage_bonus = bonus;
        self
    }

    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapon = Some(weapon);
        self
    }

    pub fn with_initiative_bonus(mut self, bonus: i64) -> Self {
        self.initiative_bonus = bonus;
        self
    }

    pub fn with_statuses(mut self, statuses: StatusLedger) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn is_down(&self) -> bool {
        self.hp <= 0
    }
}
