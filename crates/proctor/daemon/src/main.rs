//! Proctor Daemon - Exam integrity monitoring service
//!
//! The proctor daemon provides:
//! - REST API for starting, inspecting and stopping monitoring sessions
//! - Endpoints for clients pushing face detections and transcripts
//! - Event streaming for remote proctor dashboards

use clap::Parser;
use proctor_daemon::error::{DaemonError, DaemonResult};
use proctor_daemon::{DaemonConfig, Server};
use proctor_types::ExamProfile;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Proctor Daemon CLI
#[derive(Parser)]
#[command(name = "proctord")]
#[command(about = "Proctor Daemon - Exam integrity monitoring service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PROCTOR_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "PROCTOR_LISTEN_ADDR")]
    listen: Option<String>,

    /// Default exam profile
    #[arg(short, long, env = "PROCTOR_PROFILE")]
    profile: Option<String>,

    /// Log level
    #[arg(long, env = "PROCTOR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "PROCTOR_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }

    if let Some(profile) = cli.profile {
        config.monitor.profile = profile
            .parse::<ExamProfile>()
            .map_err(DaemonError::Config)?;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        profile = %config.monitor.profile,
        listen = %config.server.listen_addr,
        "Starting proctord"
    );

    // Create and run server
    let server = Server::new(config)?;
    server.run().await
}
