//! API request handlers

mod events;
mod health;
mod sessions;
mod signals;

pub use events::*;
pub use health::*;
pub use sessions::*;
pub use signals::*;

use crate::error::{ApiError, ApiResult};
use proctor_types::SessionId;

/// Parse a session ID, with or without its `session:` prefix.
fn parse_session_id(id: &str) -> ApiResult<SessionId> {
    SessionId::parse(id).ok_or_else(|| ApiError::BadRequest(format!("Invalid session ID: {}", id)))
}
