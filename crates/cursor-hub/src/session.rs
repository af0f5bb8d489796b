//! Session identifier generation.

use cursor_protocol::SessionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionIdError {
    #[error("session id unavailable: {0}")]
    Unavailable(String),
}

/// Produces a globally unique identifier for every new connection.
pub trait SessionIdSource: Send + Sync + 'static {
    fn new_id(&self) -> Result<SessionId, SessionIdError>;
}

/// Random (v4) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSessionIds;

impl SessionIdSource for UuidSessionIds {
    fn new_id(&self) -> Result<SessionId, SessionIdError> {
        Ok(SessionId::new(uuid::Uuid::new_v4().to_string()))
    }
}
