//! Player character entity - resources, derived stats, and status state

use serde::{Deserialize, Serialize};

use crate::domain::services::statuses::StatusLedger;
use crate::domain::value_objects::CharacterId;

/// Per-turn action economy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub actions: i64,
    pub reactions: i64,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            actions: 1,
            reactions: 1,
        }
    }
}

impl Resources {
    /// Restore the baseline economy at the top of a turn.
    pub fn refresh(&mut self) {
        *self = Self::default();
    }
}

/// Stats derived from the character sheet rather than chosen directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub hp: i64,
    pub ap: i64,
}

impl Default for DerivedStats {
    fn default() -> Self {
        Self { hp: 10, ap: 0 }
    }
}

/// The player character a session tracks between turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerCharacter {
    pub id: CharacterId,
    pub name: String,
    pub skill: i64,
    pub attr: i64,
    pub dex: i64,
    pub armor_rating: i64,
    pub derived: DerivedStats,
    pub resources: Resources,
    pub powers: Vec<String>,
    pub statuses: StatusLedger,
    /// Most recent attack total, for recap and narration grounding.
    pub last_roll: Option<i64>,
    pub last_damage: Option<i64>,
    pub dead: bool,
}

impl PlayerCharacter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            skill: 0,
            attr: 0,
            dex: 0,
            armor_rating: 10,
            derived: DerivedStats::default(),
            resources: Resources::default(),
            powers: Vec::new(),
            statuses: StatusLedger::new(),
            last_roll: None,
            last_damage: None,
            dead: false,
        }
    }

    pub fn with_skill(mut self, skill: i64) -> Self {
        self.skill = skill;
        self
    }

    pub fn with_attr(mut self, attr: i64) -> Self {
        self.attr = attr;
        self
    }

    pub fn with_dex(mut self, dex: i64) -> Self {
        self.dex = dex;
        self
    }

    pub fn with_armor_rating(mut self, armor_rating: i64) -> Self {
        self.armor_rating = armor_rating;
        self
    }

    pub fn with_hp(mut self, hp: i64) -> Self {
        self.derived.hp = hp;
        self
    }

    pub fn with_ap(mut self, ap: i64) -> Self {
        self.derived.ap = ap;
        self
    }

    pub fn with_power(mut self, power: impl Into<String>) -> Self {
        self.powers.push(power.into());
        self
    }

    pub fn is_down(&self) -> bool {
        self.derived.hp <= 0
    }

    /// Apply incoming damage, armor points absorbing before hit points.
    pub fn take_damage(&mut self, damage: i64) {
        let absorbed = damage.min(self.derived.ap);
        self.derived.ap -= absorbed;
        self.derived.hp = (self.derived.hp - (damage - absorbed)).max(0);
        if self.derived.hp <= 0 {
            self.dead = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_spends_armor_before_hit_points() {
        let mut pc = PlayerCharacter::new("Vex").with_hp(10).with_ap(3);
        pc.take_damage(5);
        assert_eq!(pc.derived.ap, 0);
        assert_eq!(pc.derived.hp, 8);
        assert!(!pc.dead);
    }

    #[test]
    fn lethal_damage_clamps_at_zero_and_marks_death() {
        let mut pc = PlayerCharacter::new("Vex").with_hp(4);
        pc.take_damage(9);
        assert_eq!(pc.derived.hp, 0);
        assert!(pc.dead);
        assert!(pc.is_down());
    }

    #[test]
    fn resources_refresh_to_baseline() {
        let mut pc = PlayerCharacter::new("Vex");
        pc.resources.actions = 0;
        pc.resources.reactions = 0;
        pc.resources.refresh();
        assert_eq!(pc.resources, Resources::default());
    }
}
