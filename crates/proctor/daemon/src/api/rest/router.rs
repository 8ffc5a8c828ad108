//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// Create the main API router
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(handlers::health_check))
        // Sessions
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:id", get(handlers::get_session))
        .route("/sessions/:id", delete(handlers::delete_session))
        .route("/sessions/:id/status", get(handlers::get_status))
        .route("/sessions/:id/score", get(handlers::get_score))
        .route("/sessions/:id/evidence", get(handlers::get_evidence))
        .route("/sessions/:id/stop", post(handlers::stop_session))
        // Pushed signals
        .route("/sessions/:id/frames", post(handlers::push_frame))
        .route("/sessions/:id/speech", post(handlers::push_speech))
        // Events
        .route("/events/stream", get(handlers::stream_events));

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(TraceLayer::new_for_http());

    let router = if server.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MonitorSettings, PushConfig};
    use crate::registry::SessionRegistry;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    fn app() -> Router {
        let (event_tx, _) = broadcast::channel(256);
        let registry = Arc::new(SessionRegistry::new(
            MonitorSettings::default(),
            PushConfig::default(),
            event_tx.clone(),
        ));
        create_router(AppState::new(registry, event_tx), &ServerConfig::default())
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");

        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    async fn create(app: &Router) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "participant": "alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["state"], "running");

        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/api/v1/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["active_sessions"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pushed_frames_confirm_violation() {
        let app = app();
        let id = create(&app).await;
        let frames = format!("/api/v1/sessions/{}/frames", id);

        // Nobody in front of the camera for four seconds
        for _ in 0..8 {
            let (status, body) = send(
                &app,
                Method::POST,
                &frames,
                Some(json!({ "faces": [], "width": 640, "height": 480 })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["accepted"], true);

            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        let (_, status) = send(&app, Method::GET, &format!("/api/v1/sessions/{}/status", id), None).await;
        assert_eq!(status["face_detected"], false);
        assert_eq!(status["person_count"], 0);

        let (_, score) = send(&app, Method::GET, &format!("/api/v1/sessions/{}/score", id), None).await;
        assert_eq!(score["score"], 1);
        assert_eq!(score["threshold"], 10);

        let (_, evidence) =
            send(&app, Method::GET, &format!("/api/v1/sessions/{}/evidence", id), None).await;
        assert_eq!(evidence.as_array().unwrap().len(), 1);
        assert_eq!(evidence[0]["kind"], "faceMissing");
        assert_eq!(evidence[0]["description"], "Face not detected");
    }

    #[tokio::test]
    async fn test_speech_push() {
        let app = app();
        let id = create(&app).await;
        let speech = format!("/api/v1/sessions/{}/speech", id);

        let (_, short) = send(&app, Method::POST, &speech, Some(json!({ "transcript": "hmm" }))).await;
        assert_eq!(short["accepted"], false);

        let (_, long) = send(
            &app,
            Method::POST,
            &speech,
            Some(json!({ "transcript": "what is the answer" })),
        )
        .await;
        assert_eq!(long["accepted"], true);
    }

    #[tokio::test]
    async fn test_stop_and_error_codes() {
        let app = app();
        let id = create(&app).await;
        let stop = format!("/api/v1/sessions/{}/stop", id);

        let (status, body) = send(&app, Method::POST, &stop, Some(json!({ "reason": "submitted" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "stopped");
        assert_eq!(body["stop_reason"], "submitted");

        let (status, body) = send(&app, Method::POST, &stop, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{}/frames", id),
            Some(json!({ "faces": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, Method::GET, "/api/v1/sessions/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unknown = format!("/api/v1/sessions/{}", proctor_types::SessionId::generate());
        let (status, body) = send(&app, Method::GET, &unknown, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (_, list) = send(&app, Method::GET, "/api/v1/sessions", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_only_stopped_sessions() {
        let app = app();
        let id = create(&app).await;
        let session = format!("/api/v1/sessions/{}", id);

        let (status, body) = send(&app, Method::DELETE, &session, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (status, _) = send(&app, Method::POST, &format!("{}/stop", session), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::DELETE, &session, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::GET, &session, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, &session, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, list) = send(&app, Method::GET, "/api/v1/sessions", None).await;
        assert!(list.as_array().unwrap().is_empty());
    }
}
