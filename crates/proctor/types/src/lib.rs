//! Proctor Types - Core types for exam integrity monitoring
//!
//! The proctoring engine watches a participant's camera and microphone for
//! the length of an exam and converts noisy per-frame detector output into a
//! small number of evidenced violations. This crate holds the vocabulary
//! shared by the engine and the daemon that hosts it.
//!
//! ## Key Concepts
//!
//! - **ConditionType**: A monitored signal with its own debounce timing
//! - **EvidenceRecord**: Artifact attached to a confirmed violation
//! - **ProctorStatus**: Instantaneous, undebounced detector readout
//! - **ExamProfile**: Policy presets for different exam settings
//! - **Events**: Notification stream for dashboards and remote proctors

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod condition;
pub mod events;
pub mod evidence;
pub mod ids;
pub mod profile;
pub mod status;

// Re-export main types
pub use condition::{ConditionType, ParseConditionError};
pub use events::{
    EventSeverity, EventSource, NoticeType, ProctorEvent, ProctorEventEnvelope, StopReason,
    ViolationNotice,
};
pub use evidence::{EvidenceKind, EvidencePayload, EvidenceRecord, Snapshot};
pub use ids::{ParticipantId, SessionId};
pub use profile::ExamProfile;
pub use status::{ProctorStatus, SessionState};
