//! Cursor relay wire types.
//!
//! Every WebSocket text frame exchanged with a peer is a single JSON
//! object of the shape `{"x": int, "y": int, "sessionId": string,
//! "method": "move" | "leave"}`. Peers only need to supply `x` and `y`;
//! the server owns `sessionId` and `method`.

pub mod error;
pub mod event;
pub mod session;

pub use error::DecodeError;
pub use event::{Method, PeerPosition, PositionEvent};
pub use session::SessionId;

/// Path the WebSocket upgrade is served on.
pub const WS_PATH: &str = "/ws";
