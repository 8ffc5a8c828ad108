//! Instantaneous status and session lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Point-in-time readout of the detectors.
///
/// Not debounced: a single bad frame flips the corresponding flag. Consumers
/// that need stable signals use the confirmed violations instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProctorStatus {
    pub face_detected: bool,
    pub looking_center: bool,
    pub single_person: bool,
    pub is_quiet: bool,

    /// Number of faces in the last analysed frame.
    pub person_count: usize,
}

impl ProctorStatus {
    /// Whether every flag is in its good state.
    pub fn is_clean(&self) -> bool {
        self.face_detected && self.looking_center && self.single_person && self.is_quiet
    }
}

impl Default for ProctorStatus {
    fn default() -> Self {
        Self {
            face_detected: true,
            looking_center: true,
            single_person: true,
            is_quiet: true,
            person_count: 1,
        }
    }
}

/// Lifecycle state of a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Created, not yet sampling.
    Idle,
    /// Tick loop active.
    Running,
    /// Terminal; state is frozen.
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Running => write!(f, "running"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}
