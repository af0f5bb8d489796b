//! Transport configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::TransportError;

/// Longest read window accepted; deadlines are computed from `Instant::now()`.
pub const MAX_PONG_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-connection timing and size limits.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Time allowed to write one frame to the peer
    pub write_wait: Duration,
    /// Time allowed between frames (data or pong) from the peer
    pub pong_wait: Duration,
    /// Ping interval; must be shorter than `pong_wait`
    pub ping_period: Duration,
    /// Largest message accepted from the peer, in bytes
    pub max_message_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::with_pong_wait(Duration::from_secs(60))
    }
}

impl ConnectionConfig {
    /// Defaults with the read window set to `pong_wait` and pings at 9/10 of it.
    pub fn with_pong_wait(pong_wait: Duration) -> Self {
        Self {
            write_wait: Duration::from_secs(10),
            pong_wait,
            ping_period: pong_wait
                .checked_mul(9)
                .map_or(pong_wait / 10 * 9, |d| d / 10),
            max_message_size: 512,
        }
    }

    pub fn validate(&self) -> Result<(), TransportError> {
        if self.pong_wait > MAX_PONG_WAIT || self.write_wait > MAX_PONG_WAIT {
            return Err(TransportError::InvalidConfig(format!(
                "timeouts must not exceed {MAX_PONG_WAIT:?}"
            )));
        }
        if self.ping_period.is_zero() {
            return Err(TransportError::InvalidConfig("ping period must be non-zero".into()));
        }
        if self.ping_period >= self.pong_wait {
            return Err(TransportError::InvalidConfig(format!(
                "ping period {:?} must be shorter than pong wait {:?}",
                self.ping_period, self.pong_wait
            )));
        }
        if self.write_wait.is_zero() {
            return Err(TransportError::InvalidConfig("write wait must be non-zero".into()));
        }
        if self.max_message_size == 0 {
            return Err(TransportError::InvalidConfig("max message size must be non-zero".into()));
        }
        Ok(())
    }
}

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// HTML file served on `/`; no home route when unset
    pub home_page: Option<PathBuf>,
    pub connection: ConnectionConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 4567,
            hostname: "0.0.0.0".into(),
            home_page: Some(PathBuf::from("home.html")),
            connection: ConnectionConfig::default(),
        }
    }
}
