//! Proctor daemon library
//!
//! This module provides the core components for the proctoring daemon:
//! - REST API handlers
//! - Push-fed signal sources
//! - Session registry
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod push_sources;
pub mod registry;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError};
pub use push_sources::PushSources;
pub use registry::{SessionEntry, SessionRegistry, SessionSummary};
pub use server::Server;
