//! Session lifecycle and read handlers

use super::parse_session_id;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::registry::{SessionEntry, SessionSummary};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use proctor_engine::SessionSnapshot;
use proctor_types::{
    EvidenceRecord, ExamProfile, ParticipantId, ProctorStatus, SessionId, SessionState, StopReason,
};
use serde::{Deserialize, Serialize};

/// Create session request
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub participant: String,
    #[serde(default)]
    pub profile: Option<ExamProfile>,
}

/// Start monitoring a participant
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<SessionSnapshot>)> {
    let participant = request.participant.trim();
    if participant.is_empty() {
        return Err(ApiError::BadRequest("participant must not be empty".to_string()));
    }

    let entry = state
        .registry
        .create(ParticipantId::new(participant), request.profile)
        .await?;

    Ok((StatusCode::CREATED, Json(entry.handle.snapshot())))
}

/// List sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.registry.list())
}

/// Get a session snapshot
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    let entry = find_session(&state, &id)?;
    Ok(Json(entry.handle.snapshot()))
}

/// Get the instantaneous proctor status
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProctorStatus>> {
    let entry = find_session(&state, &id)?;
    Ok(Json(entry.handle.proctor_status()))
}

/// Score response
#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub session_id: SessionId,
    pub score: u32,
    pub threshold: u32,
    pub state: SessionState,
}

/// Get the violation score
pub async fn get_score(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScoreResponse>> {
    let entry = find_session(&state, &id)?;
    let snapshot = entry.handle.snapshot();

    Ok(Json(ScoreResponse {
        session_id: snapshot.session_id,
        score: snapshot.score,
        threshold: entry.auto_submit_threshold,
        state: snapshot.state,
    }))
}

/// Get the evidence log, newest first
pub async fn get_evidence(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<EvidenceRecord>>> {
    let entry = find_session(&state, &id)?;
    Ok(Json(entry.handle.evidence_log()))
}

/// Stop session request
#[derive(Debug, Default, Deserialize)]
pub struct StopSessionRequest {
    #[serde(default)]
    pub reason: Option<StopReason>,
}

/// Stop a session
pub async fn stop_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<StopSessionRequest>>,
) -> ApiResult<Json<SessionSnapshot>> {
    let entry = find_session(&state, &id)?;
    let reason = body
        .and_then(|Json(request)| request.reason)
        .unwrap_or(StopReason::Submitted);

    let snapshot = entry.handle.stop(reason).await?;
    tracing::info!(session_id = %id, reason = %reason, score = snapshot.score, "Stopped session");

    Ok(Json(snapshot))
}

/// Remove a stopped session and everything it holds
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let entry = find_session(&state, &id)?;

    state
        .registry
        .remove(entry.handle.session_id())
        .ok_or_else(|| ApiError::Conflict(format!("Session {} is still running", id)))?;

    Ok(StatusCode::NO_CONTENT)
}

pub(super) fn find_session(state: &AppState, id: &str) -> ApiResult<SessionEntry> {
    let session_id = parse_session_id(id)?;
    state
        .registry
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", id)))
}
