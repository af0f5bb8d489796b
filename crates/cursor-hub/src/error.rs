//! Hub error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    /// The hub task has exited; nothing can be registered or relayed.
    #[error("hub is not running")]
    Stopped,

    #[error("unknown relay mode: {0} (expected \"single\" or \"broadcast\")")]
    UnknownRelayMode(String),
}
