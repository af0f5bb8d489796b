//! Cursor Transport Layer
//!
//! WebSocket listener for the cursor relay. The transport handles:
//! - HTTP upgrade on `/ws`, the home page on `/` and `/health`
//! - One inbound and one outbound pump per connection
//! - Read/write deadlines and ping-based liveness
//!
//! Registration and relay are delegated to the hub via `HubHandle`.

pub mod config;
pub mod connection;
pub mod error;
pub mod server;

pub use config::{ConnectionConfig, MAX_PONG_WAIT, TransportConfig};
pub use connection::{Connection, Disconnect};
pub use error::TransportError;
pub use server::CursorServer;
