//! Dice & roll ledger - seeded RNG with an append-only roll log
//!
//! Every individual die consumes exactly one draw from the generator, which
//! makes replay a matter of discarding the number of dice a previous partial
//! turn already consumed. Two sessions built from the same seed and fed the
//! same calls produce identical results and identical logs.

use std::sync::LazyLock;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};

static DICE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d*)d(\d+)([+-]\d+)?\s*$").expect("valid dice pattern"));
static INTEGER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s*$").expect("valid integer pattern"));

#[derive(Debug, Clone, thiserror::Error)]
pub enum DiceError {
    #[error("Invalid dice formula: {0}")]
    InvalidFormula(String),
}

/// One logged roll: the literal formula, the component dice, and the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollLogEntry {
    pub formula: String,
    pub result: i64,
    pub rolls: Vec<i64>,
    pub modifier: i64,
    pub label: Option<String>,
}

/// Seeded dice generator for one turn evaluation.
pub struct DiceSession {
    seed: u64,
    rng: StdRng,
    log: Vec<RollLogEntry>,
}

impl DiceSession {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            log: Vec::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn log(&self) -> &[RollLogEntry] {
        &self.log
    }

    pub fn into_log(self) -> Vec<RollLogEntry> {
        self.log
    }

    /// Number of dice drawn so far. Bare-integer formulas contribute zero.
    pub fn draws_consumed(&self) -> u64 {
        self.log.iter().map(|entry| entry.rolls.len() as u64).sum()
    }

    /// Discard `draws` dice without logging, restoring the generator to the
    /// position a previous evaluation left it at.
    pub fn fast_forward(&mut self, draws: u64) {
        for _ in 0..draws {
            let _ = self.rng.next_u64();
        }
    }

    fn draw(&mut self, sides: i64) -> i64 {
        debug_assert!(sides >= 1);
        1 + (self.rng.next_u64() % sides as u64) as i64
    }

    pub fn roll_d20(&mut self, label: Option<&str>) -> i64 {
        let result = self.draw(20);
        self.log.push(RollLogEntry {
            formula: "1d20".to_string(),
            result,
            rolls: vec![result],
            modifier: 0,
            label: label.map(str::to_string),
        });
        result
    }

    /// Roll a formula: either a bare non-negative integer or `NdM[+/-K]`.
    pub fn roll(&mut self, formula: &str, label: Option<&str>) -> Result<i64, DiceError> {
        if INTEGER_PATTERN.is_match(formula) {
            let result: i64 = formula
                .trim()
                .parse()
                .map_err(|_| DiceError::InvalidFormula(formula.to_string()))?;
            self.log.push(RollLogEntry {
                formula: result.to_string(),
                result,
                rolls: Vec::new(),
                modifier: 0,
                label: label.map(str::to_string),
            });
            return Ok(result);
        }

        let captures = DICE_PATTERN
            .captures(formula)
            .ok_or_else(|| DiceError::InvalidFormula(formula.to_string()))?;
        let count: i64 = match captures.get(1).map(|m| m.as_str()) {
            Some("") | None => 1,
            Some(text) => text
                .parse()
                .map_err(|_| DiceError::InvalidFormula(formula.to_string()))?,
        };
        let sides: i64 = captures[2]
            .parse()
            .map_err(|_| DiceError::InvalidFormula(formula.to_string()))?;
        let modifier: i64 = match captures.get(3) {
            Some(m) => m
                .as_str()
                .parse()
                .map_err(|_| DiceError::InvalidFormula(formula.to_string()))?,
            None => 0,
        };
        if count <= 0 || sides <= 0 {
            return Err(DiceError::InvalidFormula(formula.to_string()));
        }

        let rolls: Vec<i64> = (0..count).map(|_| self.draw(sides)).collect();
        let total: i64 = rolls.iter().sum::<i64>() + modifier;
        self.log.push(RollLogEntry {
            formula: formula.trim().to_string(),
            result: total,
            rolls,
            modifier,
            label: label.map(str::to_string),
        });
        Ok(total)
    }
}
