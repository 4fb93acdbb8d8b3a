//! Status effect vocabulary - the closed set of timed conditions

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A timed condition a combatant can carry.
///
/// The vocabulary is closed: anything outside it is rejected at the boundary
/// with [`StatusError::Unknown`] rather than coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusName {
    Bleeding,
    Ignited,
    Stun,
    Asphyxiation,
    Toxin,
    Injured,
    Concentration,
    Hidden,
    Cold,
    Disease,
}

impl StatusName {
    pub const ALL: [StatusName; 10] = [
        StatusName::Bleeding,
        StatusName::Ignited,
        StatusName::Stun,
        StatusName::Asphyxiation,
        StatusName::Toxin,
        StatusName::Injured,
        StatusName::Concentration,
        StatusName::Hidden,
        StatusName::Cold,
        StatusName::Disease,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusName::Bleeding => "Bleeding",
            StatusName::Ignited => "Ignited",
            StatusName::Stun => "Stun",
            StatusName::Asphyxiation => "Asphyxiation",
            StatusName::Toxin => "Toxin",
            StatusName::Injured => "Injured",
            StatusName::Concentration => "Concentration",
            StatusName::Hidden => "Hidden",
            StatusName::Cold => "Cold",
            StatusName::Disease => "Disease",
        }
    }

    /// Default duration in turn ticks when an application does not supply one.
    /// `None` means the effect persists until removed (it never auto-expires).
    pub fn default_duration(&self) -> Option<i64> {
        match self {
            StatusName::Bleeding => Some(3),
            StatusName::Ignited => Some(3),
            StatusName::Stun => Some(1),
            StatusName::Asphyxiation => Some(2),
            StatusName::Toxin => Some(3),
            StatusName::Injured => Some(3),
            StatusName::Concentration => None,
            StatusName::Hidden => Some(1),
            StatusName::Cold => Some(3),
            StatusName::Disease => None,
        }
    }
}

impl std::fmt::Display for StatusName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusName {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bleeding" => Ok(StatusName::Bleeding),
            "ignited" => Ok(StatusName::Ignited),
            "stun" => Ok(StatusName::Stun),
            "asphyxiation" => Ok(StatusName::Asphyxiation),
            "toxin" => Ok(StatusName::Toxin),
            "injured" => Ok(StatusName::Injured),
            "concentration" => Ok(StatusName::Concentration),
            "hidden" => Ok(StatusName::Hidden),
            "cold" => Ok(StatusName::Cold),
            "disease" => Ok(StatusName::Disease),
            _ => Err(StatusError::Unknown(s.to_string())),
        }
    }
}

/// One active effect on a combatant.
///
/// `stacks` never drops below 1 once the entry exists; `level` is monotone
/// non-decreasing under apply/ramp; `duration = None` never auto-expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub stacks: i64,
    pub level: i64,
    pub duration: Option<i64>,
}

impl StatusEntry {
    pub fn new(stacks: i64, level: i64, duration: Option<i64>) -> Self {
        Self {
            stacks: stacks.max(1),
            level: level.max(1),
            duration,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StatusError {
    #[error("Unknown status: {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitive_aliases() {
        assert_eq!("bleeding".parse::<StatusName>().unwrap(), StatusName::Bleeding);
        assert_eq!(" COLD ".parse::<StatusName>().unwrap(), StatusName::Cold);
    }

    #[test]
    fn rejects_unknown_status() {
        assert!("petrified".parse::<StatusName>().is_err());
    }

    #[test]
    fn default_durations_match_vocabulary() {
        assert_eq!(StatusName::Stun.default_duration(), Some(1));
        assert_eq!(StatusName::Concentration.default_duration(), None);
        assert_eq!(StatusName::Disease.default_duration(), None);
    }
}
