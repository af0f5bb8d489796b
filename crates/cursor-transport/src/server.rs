//! WebSocket transport server using Axum.
//!
//! Serves the upgrade endpoint, the home page and a health check, and
//! hands every upgraded socket to a [`Connection`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::WebSocket,
    },
    response::{IntoResponse, Json},
    routing::{get, get_service},
};
use cursor_hub::{HubHandle, SessionIdSource, UuidSessionIds};
use cursor_protocol::WS_PATH;
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::services::ServeFile;
use tracing::{error, info, warn};

use crate::config::TransportConfig;
use crate::connection::Connection;
use crate::error::TransportError;

/// Shared state for the transport server.
struct AppState {
    hub: HubHandle,
    ids: Arc<dyn SessionIdSource>,
    config: TransportConfig,
}

/// The running listener.
pub struct CursorServer {
    hub: HubHandle,
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound port
    port: u16,
}

impl CursorServer {
    /// Start listening with random UUID session ids.
    pub async fn start(config: TransportConfig, hub: HubHandle) -> Result<Self, TransportError> {
        Self::start_with_ids(config, hub, Arc::new(UuidSessionIds)).await
    }

    /// Start listening with a custom session id source.
    pub async fn start_with_ids(
        config: TransportConfig,
        hub: HubHandle,
        ids: Arc<dyn SessionIdSource>,
    ) -> Result<Self, TransportError> {
        config.connection.validate()?;

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let state = Arc::new(AppState {
            hub: hub.clone(),
            ids,
            config: config.clone(),
        });

        let mut app = Router::new()
            .route(WS_PATH, get(ws_upgrade_handler))
            .route("/health", get(health_handler));
        if let Some(home) = &config.home_page {
            app = app.route("/", get_service(ServeFile::new(home)));
        }
        let app = app.with_state(state);

        let addr: SocketAddr = format!("{}:{}", config.hostname, config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        info!(
            "Cursor relay listening on ws://{}:{}{WS_PATH} (relay mode: {})",
            config.hostname,
            actual_port,
            hub.relay_mode()
        );

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
            {
                error!("Listener failed: {e}");
            }
        });

        Ok(Self {
            hub,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port: actual_port,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Stop accepting new connections and wait for the listener to exit.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Cursor relay stopped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let limit = state.config.connection.max_message_size;
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_failed_upgrade(|e: axum::Error| warn!("WebSocket upgrade failed: {e}"))
        .on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let clients = state.hub.members().await.map(|m| m.len()).unwrap_or(0);
    Json(json!({
        "status": "ok",
        "clients": clients,
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Connection Handler
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    let session_id = match state.ids.new_id() {
        Ok(id) => id,
        Err(e) => {
            error!("Connection setup failed: {e}");
            return;
        }
    };

    Connection::new(session_id, state.hub.clone(), state.config.connection.clone())
        .run(socket)
        .await;
}
