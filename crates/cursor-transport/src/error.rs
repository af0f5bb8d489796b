//! Transport error types.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid listen address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),

    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("socket error: {0}")]
    Socket(#[from] axum::Error),
}
