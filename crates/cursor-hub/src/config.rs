//! Hub configuration.

use std::fmt;
use std::str::FromStr;

use crate::error::HubError;

/// How a relayed event reaches outbound pumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayMode {
    /// Every outbound pump waits on one shared feed; each event goes to
    /// exactly one of them and the submitter waits until it is taken.
    #[default]
    Single,
    /// Every registered connection gets its own copy through a bounded
    /// outbox. Copies for a full outbox are dropped.
    Broadcast,
}

impl fmt::Display for RelayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::Broadcast => f.write_str("broadcast"),
        }
    }
}

impl FromStr for RelayMode {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "broadcast" => Ok(Self::Broadcast),
            _ => Err(HubError::UnknownRelayMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub relay_mode: RelayMode,
    /// Per-connection queue depth in broadcast mode
    pub outbox_capacity: usize,
    /// Depth of the hub's command queue
    pub command_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            relay_mode: RelayMode::Single,
            outbox_capacity: 64,
            command_capacity: 256,
        }
    }
}

impl HubConfig {
    pub fn broadcast() -> Self {
        Self {
            relay_mode: RelayMode::Broadcast,
            ..Self::default()
        }
    }
}
