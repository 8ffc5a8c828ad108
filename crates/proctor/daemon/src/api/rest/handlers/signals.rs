//! Handlers for signals pushed by the exam client

use super::sessions::find_session;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::registry::SessionEntry;
use axum::{
    extract::{Path, State},
    Json,
};
use base64::Engine;
use proctor_engine::FaceObservation;
use proctor_types::{SessionState, Snapshot};
use serde::{Deserialize, Serialize};

/// Frame push request
#[derive(Debug, Deserialize)]
pub struct PushFrameRequest {
    /// Faces the client detected in its latest frame
    pub faces: Vec<FaceObservation>,

    #[serde(default)]
    pub width: u32,

    #[serde(default)]
    pub height: u32,

    /// Optional base64 JPEG still of the frame, with or without a
    /// `data:image/jpeg;base64,` prefix
    #[serde(default)]
    pub snapshot: Option<String>,
}

/// Frame push response
#[derive(Debug, Serialize, Deserialize)]
pub struct PushFrameResponse {
    pub accepted: bool,
    pub sequence: u64,
}

/// Push the latest frame's detections
pub async fn push_frame(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PushFrameRequest>,
) -> ApiResult<Json<PushFrameResponse>> {
    let entry = find_running_session(&state, &id)?;

    let snapshot = request
        .snapshot
        .as_deref()
        .map(|encoded| decode_snapshot(encoded, request.width, request.height))
        .transpose()?;

    let sequence = entry
        .sources
        .push_frame(request.width, request.height, request.faces, snapshot)
        .await;

    Ok(Json(PushFrameResponse {
        accepted: true,
        sequence,
    }))
}

/// Speech push request
#[derive(Debug, Deserialize)]
pub struct PushSpeechRequest {
    /// Final transcript from the speech recogniser
    pub transcript: String,
}

/// Speech push response
#[derive(Debug, Serialize, Deserialize)]
pub struct PushSpeechResponse {
    /// Whether the transcript counted as speech
    pub accepted: bool,
}

/// Push a final speech transcript
pub async fn push_speech(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PushSpeechRequest>,
) -> ApiResult<Json<PushSpeechResponse>> {
    let entry = find_running_session(&state, &id)?;
    let accepted = entry.sources.push_transcript(&request.transcript).await;

    Ok(Json(PushSpeechResponse { accepted }))
}

fn find_running_session(state: &AppState, id: &str) -> ApiResult<SessionEntry> {
    let entry = find_session(state, id)?;

    if entry.handle.state() != SessionState::Running {
        return Err(ApiError::Conflict(format!(
            "Session {} is not running",
            id
        )));
    }

    Ok(entry)
}

fn decode_snapshot(encoded: &str, width: u32, height: u32) -> ApiResult<Snapshot> {
    let payload = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded,
    };

    let data = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid snapshot encoding: {}", e)))?;

    Ok(Snapshot::jpeg(width, height, data))
}
