//! Monitoring sessions and the sampling loop.
//!
//! A [`ProctorSession`] is the idle, configurable form of a session. Calling
//! [`ProctorSession::start`] spawns the tick loop and returns a
//! [`SessionHandle`] for reading state and stopping it.
//!
//! All mutable state (debouncers, evidence, score) lives in the loop task and
//! is only touched between awaits of that task. Readers get immutable
//! [`SessionSnapshot`]s through a `watch` channel and notifications through
//! a `broadcast` channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use proctor_types::{
    ConditionType, EventSource, EvidenceKind, EvidencePayload, EvidenceRecord, ParticipantId,
    ProctorEvent, ProctorEventEnvelope, ProctorStatus, SessionId, SessionState, StopReason,
    ViolationNotice,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::aggregator::{AutoSubmitCallback, AutoSubmitNotice, ViolationAggregator};
use crate::clock::{MonotonicClock, SharedClock};
use crate::config::MonitorConfig;
use crate::debounce::DebouncerSet;
use crate::error::{MonitorError, MonitorResult};
use crate::evidence::EvidenceCollector;
use crate::predicates::{ConditionPredicates, ConditionReadings};
use crate::sources::{FaceObservation, SignalSources, SpeechReading};

/// Tick loop statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStats {
    /// Ticks that ran the full analysis.
    pub completed: u64,

    /// Ticks skipped for lack of a frame or a perception failure.
    pub skipped: u64,

    /// Ticks that took longer than the sampling period.
    pub overruns: u64,

    /// Slowest tick seen, in milliseconds.
    pub worst_case_ms: u64,
}

impl TickStats {
    fn record(&mut self, completed: bool, took: Duration, period: Duration) {
        if completed {
            self.completed += 1;
        } else {
            self.skipped += 1;
        }

        if took > period {
            self.overruns += 1;
        }

        self.worst_case_ms = self.worst_case_ms.max(took.as_millis() as u64);
    }
}

/// Immutable view of a session published after every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub participant: ParticipantId,
    pub state: SessionState,
    pub stop_reason: Option<StopReason>,
    pub status: ProctorStatus,
    pub score: u32,

    /// Evidence log, newest first.
    pub evidence: Vec<EvidenceRecord>,

    pub ticks: TickStats,
}

/// A configured session that has not started sampling.
pub struct ProctorSession {
    session_id: SessionId,
    participant: ParticipantId,
    config: MonitorConfig,
    sources: SignalSources,
    clock: SharedClock,
    auto_submit: Option<AutoSubmitCallback>,
    event_tx: broadcast::Sender<ProctorEventEnvelope>,
}

impl ProctorSession {
    /// Create an idle session. Fails on invalid configuration.
    pub fn new(
        session_id: SessionId,
        participant: ParticipantId,
        config: MonitorConfig,
        sources: SignalSources,
    ) -> MonitorResult<Self> {
        config.validate()?;

        let (event_tx, _) = broadcast::channel(256);

        Ok(Self {
            session_id,
            participant,
            config,
            sources,
            clock: Arc::new(MonotonicClock::new()),
            auto_submit: None,
            event_tx,
        })
    }

    /// Replace the clock used for debounce timing.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Publish events on an existing channel instead of a private one.
    pub fn with_event_sender(mut self, event_tx: broadcast::Sender<ProctorEventEnvelope>) -> Self {
        self.event_tx = event_tx;
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Register the callback run once when the score reaches the threshold.
    ///
    /// The callback runs on the loop task and must not block.
    pub fn on_auto_submit_threshold_crossed<F>(&mut self, callback: F) -> MonitorResult<()>
    where
        F: Fn(AutoSubmitNotice) + Send + Sync + 'static,
    {
        if self.auto_submit.is_some() {
            return Err(MonitorError::CallbackAlreadyRegistered(
                self.session_id.clone(),
            ));
        }

        self.auto_submit = Some(Arc::new(callback));
        Ok(())
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProctorEventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Start sampling.
    ///
    /// Refused with [`MonitorError::NotReady`] until the face detector
    /// reports ready. Dropping every clone of the returned handle cancels
    /// the session.
    #[instrument(skip(self), fields(session_id = %self.session_id, participant = %self.participant))]
    pub async fn start(self) -> MonitorResult<SessionHandle> {
        if !self.sources.faces.is_ready().await {
            warn!("Face detector not ready; refusing to start");
            return Err(MonitorError::NotReady(self.session_id));
        }

        let period = self.config.sampling.tick_interval();
        let deadline = self
            .config
            .sampling
            .exam_duration()
            .map(|duration| Instant::now() + duration);

        info!(
            tick_interval_ms = self.config.sampling.tick_interval_ms,
            exam_duration_ms = ?self.config.sampling.exam_duration_ms,
            "Starting proctoring session"
        );

        let (core, snapshot_rx) = self.into_core();
        let (stop_tx, stop_rx) = watch::channel(None);

        let handle = SessionHandle {
            session_id: core.session_id.clone(),
            participant: core.participant.clone(),
            snapshot_rx,
            stop_tx: Arc::new(stop_tx),
            event_tx: core.event_tx.clone(),
        };

        core.emit(ProctorEvent::SessionStarted, EventSource::Sampler);

        tokio::spawn(run_loop(core, stop_rx, period, deadline));

        Ok(handle)
    }

    fn into_core(self) -> (SessionCore, watch::Receiver<SessionSnapshot>) {
        let predicates = ConditionPredicates::new(&self.config.predicates, &self.config.speech);
        let evidence = EvidenceCollector::new(self.sources.frames.clone(), &self.config.evidence);
        let aggregator = ViolationAggregator::new(&self.config.aggregator, self.auto_submit);

        let initial = SessionSnapshot {
            session_id: self.session_id.clone(),
            participant: self.participant.clone(),
            state: SessionState::Running,
            stop_reason: None,
            status: ProctorStatus::default(),
            score: 0,
            evidence: Vec::new(),
            ticks: TickStats::default(),
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        let core = SessionCore {
            session_id: self.session_id,
            participant: self.participant,
            sources: self.sources,
            clock: self.clock,
            predicates,
            debouncers: DebouncerSet::new(&self.config.conditions),
            evidence,
            aggregator,
            status: ProctorStatus::default(),
            ticks: TickStats::default(),
            event_tx: self.event_tx,
            snapshot_tx,
        };

        (core, snapshot_rx)
    }
}

/// Handle to a running or stopped session.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    participant: ParticipantId,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    stop_tx: Arc<watch::Sender<Option<StopReason>>>,
    event_tx: broadcast::Sender<ProctorEventEnvelope>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    /// Latest instantaneous status.
    pub fn proctor_status(&self) -> ProctorStatus {
        self.snapshot_rx.borrow().status
    }

    pub fn violation_score(&self) -> u32 {
        self.snapshot_rx.borrow().score
    }

    /// Evidence log, newest first.
    pub fn evidence_log(&self) -> Vec<EvidenceRecord> {
        self.snapshot_rx.borrow().evidence.clone()
    }

    pub fn state(&self) -> SessionState {
        self.snapshot_rx.borrow().state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProctorEventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Stop the session and wait for the loop to finish.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn stop(&self, reason: StopReason) -> MonitorResult<SessionSnapshot> {
        let current = self.state();
        if current == SessionState::Stopped {
            return Err(MonitorError::InvalidTransition {
                session_id: self.session_id.clone(),
                from: current,
                to: SessionState::Stopped,
            });
        }

        self.stop_tx.send_if_modified(|pending| {
            if pending.is_none() {
                *pending = Some(reason);
                true
            } else {
                false
            }
        });

        Ok(self.stopped().await)
    }

    /// Wait until the session stops for any reason.
    pub async fn stopped(&self) -> SessionSnapshot {
        let mut rx = self.snapshot_rx.clone();
        let result = rx
            .wait_for(|snapshot| snapshot.state == SessionState::Stopped)
            .await
            .map(|snapshot| snapshot.clone());

        match result {
            Ok(snapshot) => snapshot,
            // Loop task is gone; the last published snapshot is final
            Err(_) => self.snapshot_rx.borrow().clone(),
        }
    }
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickOutcome {
    Skipped,
    Completed { auto_submit: bool },
}

/// State owned by the loop task.
struct SessionCore {
    session_id: SessionId,
    participant: ParticipantId,
    sources: SignalSources,
    clock: SharedClock,
    predicates: ConditionPredicates,
    debouncers: DebouncerSet,
    evidence: EvidenceCollector,
    aggregator: ViolationAggregator,
    status: ProctorStatus,
    ticks: TickStats,
    event_tx: broadcast::Sender<ProctorEventEnvelope>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionCore {
    /// Read the sources and analyse them. Perception errors skip the tick.
    async fn tick(&mut self) -> TickOutcome {
        let frame = match self.sources.frames.current_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("No frame available; skipping tick");
                return TickOutcome::Skipped;
            }
            Err(e) => {
                warn!(error = %e, "Frame source failed; skipping tick");
                return TickOutcome::Skipped;
            }
        };

        let faces = match self.sources.faces.detect_faces(&frame).await {
            Ok(faces) => faces,
            Err(e) => {
                warn!(error = %e, sequence = frame.sequence, "Face detection failed; skipping tick");
                return TickOutcome::Skipped;
            }
        };

        let speech = match self.sources.speech.speech_state().await {
            Ok(speech) => speech,
            Err(e) => {
                warn!(error = %e, "Speech activity unavailable; skipping tick");
                return TickOutcome::Skipped;
            }
        };

        let now = self.clock.now();
        let auto_submit = self.analyse(&faces, &speech, now).await;

        TickOutcome::Completed { auto_submit }
    }

    /// Run predicates, debouncers, evidence and scoring for one reading.
    /// Returns whether the auto-submit threshold was reached.
    async fn analyse(
        &mut self,
        faces: &[FaceObservation],
        speech: &SpeechReading,
        now: DateTime<Utc>,
    ) -> bool {
        let readings = self.predicates.evaluate(faces, speech);
        self.status = readings.status();

        let mut auto_submit = false;
        for condition in ConditionType::ALL {
            let outcome = self
                .debouncers
                .evaluate(condition, readings.is_bad(condition), now);

            if outcome.is_confirmed() {
                auto_submit |= self.confirm(condition, &readings, now).await;
            }
        }

        let violations = readings.bad_conditions();
        debug!(
            person_count = readings.person_count,
            bad = violations.len(),
            score = self.aggregator.score(),
            "Tick analysed"
        );

        if !violations.is_empty() {
            let notice = ViolationNotice::new(self.participant.clone(), violations);
            self.emit(ProctorEvent::Violation(notice), EventSource::Sampler);
        }

        auto_submit
    }

    async fn confirm(
        &mut self,
        condition: ConditionType,
        readings: &ConditionReadings,
        now: DateTime<Utc>,
    ) -> bool {
        let description = readings.describe(condition);
        let kind = EvidenceKind::from(condition);

        info!(condition = %condition, description = %description, "Violation confirmed");

        let explicit = match condition {
            ConditionType::Noise => Some(EvidencePayload::Audio {
                transcript: readings.transcript.clone(),
                audio_ref: None,
            }),
            _ => None,
        };

        // Evidence is built before scoring; it records the score it leads to
        let score_at_capture = self.aggregator.score().saturating_add(1);
        if let Some(record) = self
            .evidence
            .capture(kind, condition, description.clone(), explicit, score_at_capture, now)
            .await
        {
            self.emit(
                ProctorEvent::EvidenceCaptured {
                    kind: record.kind,
                    description: record.description,
                    has_payload: record.payload.is_some(),
                },
                EventSource::Evidence,
            );
        }

        let outcome = self.aggregator.on_confirmed_violation();
        self.emit(
            ProctorEvent::ViolationConfirmed {
                condition,
                description,
                score: outcome.new_score,
            },
            EventSource::Debouncer,
        );

        if outcome.should_auto_submit {
            self.emit(
                ProctorEvent::AutoSubmitted {
                    score: outcome.new_score,
                    threshold: self.aggregator.threshold(),
                },
                EventSource::Aggregator,
            );
        }

        outcome.should_auto_submit
    }

    fn emit(&self, event: ProctorEvent, source: EventSource) {
        let envelope = ProctorEventEnvelope::new(
            event,
            source,
            self.session_id.clone(),
            self.participant.clone(),
        );
        // No subscribers is fine
        let _ = self.event_tx.send(envelope);
    }

    fn publish(&self, state: SessionState, stop_reason: Option<StopReason>) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            session_id: self.session_id.clone(),
            participant: self.participant.clone(),
            state,
            stop_reason,
            status: self.status,
            score: self.aggregator.score(),
            evidence: self.evidence.log().to_vec(),
            ticks: self.ticks,
        });
    }

    fn finish(&self, reason: StopReason) {
        self.publish(SessionState::Stopped, Some(reason));

        info!(
            reason = %reason,
            final_score = self.aggregator.score(),
            completed = self.ticks.completed,
            skipped = self.ticks.skipped,
            "Proctoring session stopped"
        );

        self.emit(
            ProctorEvent::SessionStopped {
                reason,
                final_score: self.aggregator.score(),
            },
            EventSource::Sampler,
        );
    }
}

/// Resolves once a stop reason is set, or with `Cancelled` when every
/// handle is gone.
async fn stop_requested(stop_rx: &mut watch::Receiver<Option<StopReason>>) -> StopReason {
    loop {
        if let Some(reason) = *stop_rx.borrow_and_update() {
            return reason;
        }
        if stop_rx.changed().await.is_err() {
            return StopReason::Cancelled;
        }
    }
}

async fn run_loop(
    mut core: SessionCore,
    mut stop_rx: watch::Receiver<Option<StopReason>>,
    period: Duration,
    deadline: Option<Instant>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // First sample one full period after start
    interval.tick().await;

    let expiry = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(expiry);

    let reason = loop {
        tokio::select! {
            biased;
            reason = stop_requested(&mut stop_rx) => break reason,
            _ = &mut expiry => break StopReason::TimeExpired,
            _ = interval.tick() => {}
        }

        let started = Instant::now();
        // A stop abandons the tick in flight, including a confirmation whose
        // evidence is still being captured; it is never scored.
        let outcome = tokio::select! {
            biased;
            reason = stop_requested(&mut stop_rx) => break reason,
            outcome = core.tick() => outcome,
        };

        let completed = matches!(outcome, TickOutcome::Completed { .. });
        core.ticks.record(completed, started.elapsed(), period);
        core.publish(SessionState::Running, None);

        if outcome == (TickOutcome::Completed { auto_submit: true }) {
            break StopReason::AutoSubmitThreshold;
        }
    };

    core.finish(reason);
}
