//! Errors raised while decoding peer frames.

use thiserror::Error;

/// A peer frame that could not be turned into a position.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid position payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not valid UTF-8")]
    NotUtf8,
}
