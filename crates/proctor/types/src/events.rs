//! Event types for proctoring observability
//!
//! Events are notifications only: there is no acknowledgement or retry
//! contract, and a consumer that falls behind simply misses them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{ConditionType, EvidenceKind, ParticipantId, SessionId};

/// Envelope wrapping all proctoring events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProctorEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Event source
    pub source: EventSource,

    /// Event severity
    pub severity: EventSeverity,

    /// Session the event belongs to
    pub session_id: SessionId,

    /// Participant being monitored
    pub participant: ParticipantId,

    /// The actual event
    pub event: ProctorEvent,
}

impl ProctorEventEnvelope {
    /// Wrap an event, deriving severity from its kind.
    pub fn new(
        event: ProctorEvent,
        source: EventSource,
        session_id: SessionId,
        participant: ParticipantId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source,
            severity: event.severity(),
            session_id,
            participant,
            event,
        }
    }
}

/// Event sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    /// Sampling loop
    Sampler,
    /// Condition debouncer
    Debouncer,
    /// Evidence collector
    Evidence,
    /// Violation aggregator
    Aggregator,
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Critical,
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The participant submitted the exam.
    Submitted,
    /// The exam duration elapsed.
    TimeExpired,
    /// The violation score reached the auto-submit threshold.
    AutoSubmitThreshold,
    /// Monitoring was cancelled by the host.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Submitted => write!(f, "submitted"),
            StopReason::TimeExpired => write!(f, "time_expired"),
            StopReason::AutoSubmitThreshold => write!(f, "auto_submit_threshold"),
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Discriminator of the remote-proctor notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeType {
    #[serde(rename = "VIOLATION")]
    Violation,
}

/// Side-channel notice for remote proctor dashboards.
///
/// Sent whenever a tick's analysis is unclean, whether or not a violation
/// was confirmed. Serializes as `{"type":"VIOLATION","user":..,"violations":[..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationNotice {
    #[serde(rename = "type")]
    pub notice_type: NoticeType,

    pub user: ParticipantId,

    /// Conditions observed bad in the tick.
    pub violations: Vec<ConditionType>,
}

impl ViolationNotice {
    pub fn new(user: ParticipantId, violations: Vec<ConditionType>) -> Self {
        Self {
            notice_type: NoticeType::Violation,
            user,
            violations,
        }
    }
}

/// Proctoring events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProctorEvent {
    /// Sampling loop started.
    SessionStarted,

    /// Sampling loop stopped; state is frozen.
    SessionStopped {
        reason: StopReason,
        final_score: u32,
    },

    /// A condition was confirmed as a violation.
    ViolationConfirmed {
        condition: ConditionType,
        description: String,
        score: u32,
    },

    /// Evidence was appended to the log.
    EvidenceCaptured {
        kind: EvidenceKind,
        description: String,
        has_payload: bool,
    },

    /// Score reached the auto-submit threshold.
    AutoSubmitted {
        score: u32,
        threshold: u32,
    },

    /// Unclean tick notice for remote dashboards.
    Violation(ViolationNotice),
}

impl ProctorEvent {
    pub fn severity(&self) -> EventSeverity {
        match self {
            ProctorEvent::SessionStarted | ProctorEvent::SessionStopped { .. } => {
                EventSeverity::Info
            }
            ProctorEvent::ViolationConfirmed { .. } | ProctorEvent::EvidenceCaptured { .. } => {
                EventSeverity::Warning
            }
            ProctorEvent::AutoSubmitted { .. } => EventSeverity::Critical,
            ProctorEvent::Violation(_) => EventSeverity::Debug,
        }
    }
}
