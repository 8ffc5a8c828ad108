//! Event streaming handlers

use super::parse_session_id;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream};
use proctor_types::SessionId;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

/// Stream events query params
#[derive(Debug, Deserialize)]
pub struct StreamEventsQuery {
    /// Only forward events of this session
    pub session_id: Option<String>,
}

/// Stream events via SSE
pub async fn stream_events(
    State(state): State<AppState>,
    Query(query): Query<StreamEventsQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let filter = query
        .session_id
        .as_deref()
        .map(parse_session_id)
        .transpose()?;

    let rx = state.event_tx.subscribe();

    let stream = stream::unfold((rx, filter), |(mut rx, filter)| async move {
        let event = next_event(&mut rx, filter.as_ref()).await?;
        Some((Ok(event), (rx, filter)))
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

async fn next_event(
    rx: &mut broadcast::Receiver<proctor_types::ProctorEventEnvelope>,
    filter: Option<&SessionId>,
) -> Option<Event> {
    loop {
        match rx.recv().await {
            Ok(envelope) => {
                if filter.is_some_and(|id| *id != envelope.session_id) {
                    continue;
                }
                let json = serde_json::to_string(&envelope).unwrap_or_default();
                return Some(Event::default().data(json));
            }
            Err(RecvError::Lagged(_)) => {
                // Client lagged behind, continue
                return Some(Event::default().comment("lagged"));
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
