//! Monitored conditions
//!
//! Each condition is an independent signal with its own confirmation delay
//! and cooldown. The order of [`ConditionType::ALL`] is the order in which a
//! tick evaluates them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Key identifying a monitored signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionType {
    /// No face in frame.
    FaceMissing,
    /// Face present but turned away from the screen.
    NotFocus,
    /// More than one person in frame.
    MultiplePeople,
    /// Sustained recognised speech.
    Noise,
}

impl ConditionType {
    /// All conditions, in evaluation order.
    pub const ALL: [ConditionType; 4] = [
        ConditionType::FaceMissing,
        ConditionType::NotFocus,
        ConditionType::MultiplePeople,
        ConditionType::Noise,
    ];

    /// Wire name, as used in notices and config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::FaceMissing => "faceMissing",
            ConditionType::NotFocus => "notFocus",
            ConditionType::MultiplePeople => "multiplePeople",
            ConditionType::Noise => "noise",
        }
    }

    /// Whether this condition is derived from the video channel.
    pub fn is_visual(&self) -> bool {
        !matches!(self, ConditionType::Noise)
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown condition name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown condition type: {0}")]
pub struct ParseConditionError(pub String);

impl FromStr for ConditionType {
    type Err = ParseConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "faceMissing" | "face_missing" => Ok(ConditionType::FaceMissing),
            "notFocus" | "not_focus" => Ok(ConditionType::NotFocus),
            "multiplePeople" | "multiple_people" => Ok(ConditionType::MultiplePeople),
            "noise" => Ok(ConditionType::Noise),
            other => Err(ParseConditionError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_serde() {
        for condition in ConditionType::ALL {
            let json = serde_json::to_string(&condition).unwrap();
            assert_eq!(json, format!("\"{}\"", condition.as_str()));
            assert_eq!(condition.as_str().parse::<ConditionType>().unwrap(), condition);
        }
    }

    #[test]
    fn test_unknown_condition_rejected() {
        let err = "tabSwitch".parse::<ConditionType>().unwrap_err();
        assert_eq!(err.0, "tabSwitch");
    }

    #[test]
    fn test_only_noise_is_audio() {
        assert!(ConditionType::FaceMissing.is_visual());
        assert!(!ConditionType::Noise.is_visual());
    }
}
