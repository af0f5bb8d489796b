//! Position events: the unit of relay.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::session::SessionId;

/// What a relayed event means for the receiving peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// The sender's cursor moved to `(x, y)`.
    Move,
    /// The sender is gone; its cursor should be removed.
    Leave,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Leave => "leave",
        }
    }
}

/// The part of a peer frame the server trusts.
///
/// Anything else the peer puts in the object (including its own
/// `sessionId` or `method`) is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PeerPosition {
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
}

impl PeerPosition {
    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(frame)?)
    }

    pub fn decode_bytes(frame: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(frame).map_err(|_| DecodeError::NotUtf8)?;
        Self::decode(text)
    }
}

/// A cursor update as relayed to peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEvent {
    pub x: i64,
    pub y: i64,
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
    pub method: Method,
}

impl PositionEvent {
    /// A move stamped with the sender's identity.
    pub fn moved(sender: &SessionId, position: PeerPosition) -> Self {
        Self {
            x: position.x,
            y: position.y,
            session_id: sender.clone(),
            method: Method::Move,
        }
    }

    /// A leave for `sender`. Leave events carry no position.
    pub fn leave(sender: &SessionId) -> Self {
        Self {
            x: 0,
            y: 0,
            session_id: sender.clone(),
            method: Method::Leave,
        }
    }

    /// Decode a peer text frame and stamp it as a move from `sender`.
    pub fn from_peer(frame: &str, sender: &SessionId) -> Result<Self, DecodeError> {
        PeerPosition::decode(frame).map(|p| Self::moved(sender, p))
    }

    pub fn is_leave(&self) -> bool {
        self.method == Method::Leave
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
