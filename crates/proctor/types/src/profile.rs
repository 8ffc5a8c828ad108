//! Exam policy profiles
//!
//! Profiles select default debounce timing and escalation thresholds:
//! - Standard: the usual unsupervised online exam
//! - Strict: certification exams with a low tolerance for irregularities
//! - Lenient: practice tests, where false positives are costlier than misses
//! - Development: short timings for local testing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy preset for a monitored exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExamProfile {
    #[default]
    Standard,
    Strict,
    Lenient,
    Development,
}

impl ExamProfile {
    /// Does this profile end the exam automatically at the threshold?
    pub fn auto_submits(&self) -> bool {
        !matches!(self, ExamProfile::Development)
    }
}

impl fmt::Display for ExamProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamProfile::Standard => write!(f, "standard"),
            ExamProfile::Strict => write!(f, "strict"),
            ExamProfile::Lenient => write!(f, "lenient"),
            ExamProfile::Development => write!(f, "development"),
        }
    }
}

impl FromStr for ExamProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(ExamProfile::Standard),
            "strict" => Ok(ExamProfile::Strict),
            "lenient" => Ok(ExamProfile::Lenient),
            "development" | "dev" => Ok(ExamProfile::Development),
            other => Err(format!("Unknown exam profile: {}", other)),
        }
    }
}
