//! Registry of monitoring sessions hosted by the daemon.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use proctor_engine::{
    MonitorResult, MonotonicClock, ProctorSession, SessionHandle, SessionSnapshot, SharedClock,
};
use proctor_types::{
    ExamProfile, ParticipantId, ProctorEventEnvelope, SessionId, SessionState, StopReason,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::config::{MonitorSettings, PushConfig};
use crate::push_sources::PushSources;

/// A hosted session.
#[derive(Clone)]
pub struct SessionEntry {
    pub handle: SessionHandle,
    pub sources: Arc<PushSources>,
    pub profile: ExamProfile,
    pub auto_submit_threshold: u32,
    pub created_at: DateTime<Utc>,
}

/// Listing row for a hosted session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub participant: ParticipantId,
    pub profile: ExamProfile,
    pub state: SessionState,
    pub score: u32,
    pub created_at: DateTime<Utc>,
}

impl SessionEntry {
    pub fn summary(&self) -> SessionSummary {
        let snapshot = self.handle.snapshot();

        SessionSummary {
            session_id: snapshot.session_id,
            participant: snapshot.participant,
            profile: self.profile,
            state: snapshot.state,
            score: snapshot.score,
            created_at: self.created_at,
        }
    }
}

/// All sessions hosted by this daemon, keyed by id.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionEntry>,
    settings: MonitorSettings,
    push: PushConfig,
    clock: SharedClock,
    event_tx: broadcast::Sender<ProctorEventEnvelope>,
}

impl SessionRegistry {
    pub fn new(
        settings: MonitorSettings,
        push: PushConfig,
        event_tx: broadcast::Sender<ProctorEventEnvelope>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            settings,
            push,
            clock: Arc::new(MonotonicClock::new()),
            event_tx,
        }
    }

    /// Create and start a session for `participant`.
    #[instrument(skip(self, participant), fields(participant = %participant))]
    pub async fn create(
        &self,
        participant: ParticipantId,
        profile: Option<ExamProfile>,
    ) -> MonitorResult<SessionEntry> {
        let profile = profile.unwrap_or(self.settings.profile);
        let config = self.settings.monitor_config(Some(profile));
        let auto_submit_threshold = config.aggregator.auto_submit_threshold;

        let sources = Arc::new(PushSources::new(
            &config.speech,
            self.clock.clone(),
            Duration::from_millis(self.push.max_frame_age_ms),
        ));

        let session_id = SessionId::generate();
        let mut session = ProctorSession::new(
            session_id.clone(),
            participant,
            config,
            sources.signal_sources(),
        )?
        .with_clock(self.clock.clone())
        .with_event_sender(self.event_tx.clone());

        let callback_session = session_id.clone();
        session.on_auto_submit_threshold_crossed(move |notice| {
            warn!(
                session_id = %callback_session,
                score = notice.score,
                threshold = notice.threshold,
                "Auto-submitting exam"
            );
        })?;

        let handle = session.start().await?;

        let entry = SessionEntry {
            handle,
            sources,
            profile,
            auto_submit_threshold,
            created_at: Utc::now(),
        };
        self.sessions.insert(session_id.clone(), entry.clone());

        // Drop the last pushed frame as soon as the session stops for any reason
        let watcher = entry.handle.clone();
        let released = entry.sources.clone();
        tokio::spawn(async move {
            watcher.stopped().await;
            released.release_frame().await;
        });

        info!(session_id = %session_id, profile = %profile, "Session registered");
        Ok(entry)
    }

    pub fn get(&self, session_id: &SessionId) -> Option<SessionEntry> {
        self.sessions.get(session_id).map(|e| e.value().clone())
    }

    /// Summaries of every hosted session.
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<_> = self.sessions.iter().map(|e| e.value().summary()).collect();
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    /// Remove a stopped session. Running sessions are left in place.
    pub fn remove(&self, session_id: &SessionId) -> Option<SessionEntry> {
        let (_, entry) = self.sessions.remove_if(session_id, |_, entry| {
            entry.handle.state() == SessionState::Stopped
        })?;

        info!(session_id = %session_id, "Session removed");
        Some(entry)
    }

    /// Number of sessions still sampling.
    pub fn active_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|e| e.value().handle.state() == SessionState::Running)
            .count()
    }

    /// Stop every running session, e.g. on daemon shutdown.
    pub async fn stop_all(&self, reason: StopReason) -> Vec<SessionSnapshot> {
        let running: Vec<_> = self
            .sessions
            .iter()
            .filter(|e| e.value().handle.state() == SessionState::Running)
            .map(|e| e.value().handle.clone())
            .collect();

        let mut stopped = Vec::with_capacity(running.len());
        for handle in running {
            if let Ok(snapshot) = handle.stop(reason).await {
                stopped.push(snapshot);
            }
        }
        stopped
    }
}
