//! Cursor Relay — live cursor sharing over WebSocket
//!
//! Every connected peer streams its pointer position to `/ws`; the relay
//! forwards each update, stamped with the sender's session id, so that all
//! participants can draw each other's cursors.
//!
//! Usage:
//!   cursor-relay                                 # Listen on 0.0.0.0:4567
//!   cursor-relay --port 8080                     # Custom port
//!   cursor-relay --relay-mode broadcast          # Copy every update to every peer
//!   cursor-relay --home ./public/home.html       # Custom home page

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use cursor_hub::{Hub, HubConfig, RelayMode};
use cursor_transport::{ConnectionConfig, CursorServer, TransportConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cursor-relay", about = "Cursor Relay — live cursor sharing over WebSocket")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "4567")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "0.0.0.0")]
    hostname: String,

    /// HTML file served on `/`
    #[arg(long, default_value = "home.html")]
    home: PathBuf,

    /// How relayed events reach peers: "single" or "broadcast"
    #[arg(long, default_value = "single")]
    relay_mode: RelayMode,

    /// Per-peer queue depth in broadcast mode
    #[arg(long, default_value = "64")]
    outbox_capacity: usize,

    /// Seconds a peer may stay silent (no data, no pong) before it is dropped
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..=86_400))]
    pong_wait_secs: u64,

    /// Seconds allowed for a single write to a peer
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..=86_400))]
    write_wait_secs: u64,

    /// Largest message accepted from a peer, in bytes
    #[arg(long, default_value = "512")]
    max_message_size: usize,

    /// Milliseconds to wait for leave notifications before exiting
    #[arg(long, default_value = "2000")]
    shutdown_grace_ms: u64,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn hub_config(&self) -> HubConfig {
        HubConfig {
            relay_mode: self.relay_mode,
            outbox_capacity: self.outbox_capacity,
            ..HubConfig::default()
        }
    }

    fn transport_config(&self) -> TransportConfig {
        let connection = ConnectionConfig {
            write_wait: Duration::from_secs(self.write_wait_secs),
            max_message_size: self.max_message_size,
            ..ConnectionConfig::with_pong_wait(Duration::from_secs(self.pong_wait_secs))
        };
        TransportConfig {
            port: self.port,
            hostname: self.hostname.clone(),
            home_page: Some(self.home.clone()),
            connection,
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    if let Some(ref log_path) = cli.log_file {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
        {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false)
                    .init();
                eprintln!("Logging to {}", log_path.display());
                return;
            }
            Err(e) => eprintln!("Failed to open log file {}: {e}", log_path.display()),
        }
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let hub = Hub::spawn(cli.hub_config());

    let mut server = match CursorServer::start(cli.transport_config(), hub.clone()).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start cursor relay: {e}");
            std::process::exit(1);
        }
    };

    info!("Press Ctrl+C to stop (port {})", server.port());
    shutdown_signal().await;

    info!("Shutting down...");
    match hub.shutdown().await {
        Ok(count) => info!("Sent leave for {count} clients"),
        Err(e) => warn!("Hub shutdown failed: {e}"),
    }
    tokio::time::sleep(Duration::from_millis(cli.shutdown_grace_ms)).await;

    server.stop().await;
}
