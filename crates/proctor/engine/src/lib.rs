//! # Proctor Engine - Violation Detection and Debounce for Exam Monitoring
//!
//! This crate turns per-frame detector output (faces, landmarks, speech
//! activity) into a small number of confirmed, evidenced violations and an
//! accumulating score that can trigger auto-submission.
//!
//! ## Overview
//!
//! Every tick the sampling loop reads its signal sources, evaluates four
//! conditions and feeds each into its own debouncer:
//!
//! - **faceMissing**: no face in frame
//! - **notFocus**: the first face is turned away from the screen
//! - **multiplePeople**: more than one face in frame
//! - **noise**: the participant is speaking
//!
//! A condition has to stay bad for its confirm delay before it counts, and
//! the same condition cannot count twice within its cooldown. Each
//! confirmation captures evidence and raises the score by one.
//!
//! ## Key Components
//!
//! - [`ProctorSession`] / [`SessionHandle`]: lifecycle and the tick loop
//! - [`ConditionDebouncer`]: confirm-delay and cooldown state machine
//! - [`EvidenceCollector`]: bounded, deduplicated evidence log
//! - [`ViolationAggregator`]: score and auto-submit trigger
//! - [`sources`]: adapter traits for the perception components
//!
//! ## Example
//!
//! ```rust,no_run
//! use proctor_engine::{MonitorConfig, ProctorSession, SignalSources};
//! use proctor_types::{ExamProfile, ParticipantId, SessionId, StopReason};
//!
//! # async fn example(sources: SignalSources) -> proctor_engine::MonitorResult<()> {
//! let config = MonitorConfig::for_profile(ExamProfile::Standard);
//!
//! let mut session = ProctorSession::new(
//!     SessionId::generate(),
//!     ParticipantId::new("candidate-17"),
//!     config,
//!     sources,
//! )?;
//! session.on_auto_submit_threshold_crossed(|notice| {
//!     println!("auto-submitting at score {}", notice.score);
//! })?;
//!
//! let handle = session.start().await?;
//! println!("score so far: {}", handle.violation_score());
//!
//! let summary = handle.stop(StopReason::Submitted).await?;
//! println!("final score: {}", summary.score);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod error;
pub mod evidence;
pub mod predicates;
pub mod session;
pub mod sources;
pub mod speech;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export main types
pub use aggregator::{AggregateOutcome, AutoSubmitCallback, AutoSubmitNotice, ViolationAggregator};
#[cfg(any(test, feature = "test-utils"))]
pub use clock::ManualClock;
pub use clock::{Clock, MonotonicClock, SharedClock};
pub use config::{
    AggregatorConfig, ConditionPolicies, DebounceParams, EvidenceConfig, MonitorConfig,
    PredicateConfig, SamplingConfig, SpeechConfig,
};
pub use debounce::{ConditionDebouncer, ConditionState, DebouncerSet, ViolationOutcome};
pub use error::{MonitorError, MonitorResult};
pub use evidence::{EvidenceCollector, EvidenceLog};
pub use predicates::{ConditionPredicates, ConditionReadings};
pub use session::{ProctorSession, SessionHandle, SessionSnapshot, TickStats};
pub use sources::{
    BoundingBox, FaceDetector, FaceLandmarks, FaceObservation, FrameSource, Point, SignalSources,
    SpeechActivity, SpeechReading, VideoFrame,
};
pub use speech::{SharedSpeechGate, SpeechActivityGate};
