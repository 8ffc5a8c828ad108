//! Error types for proctor-engine crate.
//!
//! Perception errors never escape a tick; they are logged and the tick is
//! skipped. The variants here surface from adapters, configuration and
//! session lifecycle calls.

use proctor_types::{SessionId, SessionState};
use thiserror::Error;

/// Errors that can occur while monitoring a session.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A signal source could not produce a reading.
    #[error("signal source {source_name} unavailable: {reason}")]
    SourceUnavailable {
        source_name: &'static str,
        reason: String,
    },

    /// Face detection failed on a frame.
    #[error("face detection failed: {0}")]
    DetectionFailed(String),

    /// Snapshot capture failed.
    #[error("snapshot capture failed: {0}")]
    SnapshotFailed(String),

    /// Perception is not ready yet; monitoring cannot start.
    #[error("perception not ready for session {0}")]
    NotReady(SessionId),

    /// Lifecycle call made in the wrong state.
    #[error("invalid transition for session {session_id}: {from} -> {to}")]
    InvalidTransition {
        session_id: SessionId,
        from: SessionState,
        to: SessionState,
    },

    /// The auto-submit callback may only be registered once.
    #[error("auto-submit callback already registered for session {0}")]
    CallbackAlreadyRegistered(SessionId),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl MonitorError {
    /// Shorthand for [`MonitorError::SourceUnavailable`].
    pub fn unavailable(source_name: &'static str, reason: impl Into<String>) -> Self {
        MonitorError::SourceUnavailable {
            source_name,
            reason: reason.into(),
        }
    }
}

/// Result type for monitoring operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
