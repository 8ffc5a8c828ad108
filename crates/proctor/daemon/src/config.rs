//! Configuration for proctord

use proctor_engine::MonitorConfig;
use proctor_types::ExamProfile;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Defaults for new monitoring sessions
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// Pushed-signal handling
    #[serde(default)]
    pub push: PushConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Maximum request body size in bytes (frames carry JPEG snapshots)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            enable_cors: true,
            max_body_size: default_max_body_size(),
        }
    }
}

/// Defaults applied to sessions created over the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Profile used when a request does not name one
    #[serde(default)]
    pub profile: ExamProfile,

    /// Override of the profile's tick interval
    #[serde(default)]
    pub tick_interval_ms: Option<u64>,

    /// Override of the profile's auto-submit threshold
    #[serde(default)]
    pub auto_submit_threshold: Option<u32>,
}

impl MonitorSettings {
    /// Build the engine configuration for a session.
    pub fn monitor_config(&self, profile: Option<ExamProfile>) -> MonitorConfig {
        let mut config = MonitorConfig::for_profile(profile.unwrap_or(self.profile));

        if let Some(tick_interval_ms) = self.tick_interval_ms {
            config.sampling.tick_interval_ms = tick_interval_ms;
        }
        if let Some(threshold) = self.auto_submit_threshold {
            config.aggregator.auto_submit_threshold = threshold;
        }

        config
    }
}

/// Pushed-signal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// A pushed frame older than this is treated as missing
    #[serde(default = "default_max_frame_age")]
    pub max_frame_age_ms: u64,

    /// Capacity of the event broadcast channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            max_frame_age_ms: default_max_frame_age(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_max_body_size() -> usize {
    4 * 1024 * 1024
}

fn default_max_frame_age() -> u64 {
    2000
}

fn default_event_buffer() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `PROCTOR_*` environment variables (`PROCTOR_SERVER__LISTEN_ADDR`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables with PROCTOR_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("PROCTOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
