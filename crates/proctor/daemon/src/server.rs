//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::registry::SessionRegistry;
use proctor_types::{ProctorEventEnvelope, StopReason};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Proctor daemon server
pub struct Server {
    config: DaemonConfig,
    registry: Arc<SessionRegistry>,
    event_tx: broadcast::Sender<ProctorEventEnvelope>,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        // Fail early on settings no session could start with
        config.monitor.monitor_config(None).validate()?;

        // Create event channel
        let (event_tx, _) = broadcast::channel(config.push.event_buffer);

        let registry = Arc::new(SessionRegistry::new(
            config.monitor.clone(),
            config.push.clone(),
            event_tx.clone(),
        ));

        Ok(Self {
            config,
            registry,
            event_tx,
        })
    }

    /// Application state for the router
    pub fn state(&self) -> AppState {
        AppState::new(self.registry.clone(), self.event_tx.clone())
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        // Create router
        let app = create_router(self.state(), &self.config.server);

        // Create listener
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Proctor daemon listening on {}", addr);
        tracing::info!("Default exam profile: {}", self.config.monitor.profile);

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Proctor daemon shutting down");

        // Freeze every running session
        let stopped = self.registry.stop_all(StopReason::Cancelled).await;
        tracing::info!(sessions = stopped.len(), "Stopped running sessions");

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
