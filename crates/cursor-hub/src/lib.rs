//! Cursor Hub
//!
//! Owns the registry of live connections and the relay path that moves
//! position events from inbound pumps to outbound pumps. The registry is
//! only ever touched by the hub task; everything else talks to it through
//! a [`HubHandle`].

pub mod config;
pub mod error;
pub mod hub;
pub mod session;

pub use config::{HubConfig, RelayMode};
pub use error::HubError;
pub use hub::{Hub, HubHandle, Member, RelayFeed};
pub use session::{SessionIdError, SessionIdSource, UuidSessionIds};
