//! One peer connection and its pump pair.
//!
//! The inbound pump turns peer frames into move events and detects
//! disconnection; the outbound pump writes relayed events and pings.
//! Both share a cancellation token so that whichever side stops first
//! takes the other one down with it.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseCode, Message, WebSocket, close_code};
use cursor_hub::{HubHandle, RelayFeed};
use cursor_protocol::{PeerPosition, PositionEvent, SessionId};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{Instant, interval_at, timeout, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::error::TransportError;

/// Close code a peer reports when the connection dropped without a close frame.
const ABNORMAL_CLOSURE: CloseCode = 1006;

/// Why the inbound pump stopped reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disconnect {
    /// The peer sent a close frame (with its code, if any).
    Closed(Option<CloseCode>),
    /// The stream ended without a close frame.
    Ended,
    /// Nothing (not even a pong) arrived within the read window.
    Timeout,
    /// The socket reported an error.
    Error(String),
    /// The outbound pump stopped first.
    Cancelled,
}

impl Disconnect {
    /// Whether this disconnect deserves a diagnostic rather than a debug line.
    pub fn is_unexpected(&self) -> bool {
        match self {
            Self::Closed(None) => false,
            Self::Closed(Some(code)) => {
                !matches!(*code, close_code::NORMAL | close_code::AWAY | ABNORMAL_CLOSURE)
            }
            Self::Error(_) => true,
            Self::Ended | Self::Timeout | Self::Cancelled => false,
        }
    }
}

/// A live peer session.
pub struct Connection {
    session_id: SessionId,
    hub: HubHandle,
    config: ConnectionConfig,
}

impl Connection {
    pub fn new(session_id: SessionId, hub: HubHandle, config: ConnectionConfig) -> Self {
        Self {
            session_id,
            hub,
            config,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Register with the hub and pump the socket until either side stops.
    /// Returns once the leave has been relayed and the socket is closed.
    pub async fn run(self, socket: WebSocket) -> Disconnect {
        let id = self.session_id.clone();
        let (member, feed) = self.hub.attach(id.clone());
        self.hub.register(member).await;
        info!("Client connected: {id}");

        let (sink, mut stream) = socket.split();
        let closed = CancellationToken::new();

        let writer = tokio::spawn(write_pump(
            sink,
            feed,
            self.config.clone(),
            closed.clone(),
            id.clone(),
        ));

        let reason = self.read_pump(&mut stream, &closed).await;
        if reason.is_unexpected() {
            warn!("Client {id} disconnected unexpectedly: {reason:?}");
        } else {
            debug!("Client {id} closed: {reason:?}");
        }

        self.hub.relay(PositionEvent::leave(&id)).await;
        self.hub.deregister(&id).await;
        closed.cancel();
        let _ = writer.await;

        info!("Client disconnected: {id}");
        reason
    }

    async fn read_pump(
        &self,
        stream: &mut SplitStream<WebSocket>,
        closed: &CancellationToken,
    ) -> Disconnect {
        let id = &self.session_id;
        let mut deadline = Instant::now() + self.config.pong_wait;

        loop {
            let frame = tokio::select! {
                _ = closed.cancelled() => return Disconnect::Cancelled,
                frame = timeout_at(deadline, stream.next()) => frame,
            };

            let message = match frame {
                Err(_) => return Disconnect::Timeout,
                Ok(None) => return Disconnect::Ended,
                Ok(Some(Err(e))) => return Disconnect::Error(e.to_string()),
                Ok(Some(Ok(message))) => message,
            };

            let decoded = match message {
                Message::Text(text) => PositionEvent::from_peer(text.as_str(), id),
                Message::Binary(bytes) => {
                    PeerPosition::decode_bytes(&bytes).map(|p| PositionEvent::moved(id, p))
                }
                // Any control frame counts as life; replies to pings are
                // queued by the socket itself.
                Message::Pong(_) | Message::Ping(_) => {
                    deadline = Instant::now() + self.config.pong_wait;
                    continue;
                }
                Message::Close(frame) => return Disconnect::Closed(frame.map(|f| f.code)),
            };

            deadline = Instant::now() + self.config.pong_wait;
            match decoded {
                Ok(event) => self.hub.relay(event).await,
                Err(e) => warn!("Dropping frame from {id}: {e}"),
            }
        }
    }
}

async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut feed: RelayFeed,
    config: ConnectionConfig,
    closed: CancellationToken,
    id: SessionId,
) {
    let mut ticker = interval_at(Instant::now() + config.ping_period, config.ping_period);

    loop {
        tokio::select! {
            biased;

            _ = closed.cancelled() => {
                let _ = send(&mut sink, Message::Close(None), config.write_wait).await;
                break;
            }

            // Ahead of the feed so a busy relay cannot starve pings.
            _ = ticker.tick() => {
                if let Err(e) = send(&mut sink, Message::Ping(Bytes::new()), config.write_wait).await {
                    debug!("Ping to {id} failed: {e}");
                    break;
                }
            }

            event = feed.next() => {
                let Some(event) = event else {
                    debug!("Relay closed for {id}");
                    let _ = send(&mut sink, Message::Close(None), config.write_wait).await;
                    break;
                };
                let text = match event.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode event for {id}: {e}");
                        continue;
                    }
                };
                if let Err(e) = send(&mut sink, Message::Text(text.into()), config.write_wait).await {
                    debug!("Write to {id} failed: {e}");
                    break;
                }
            }
        }
    }

    closed.cancel();
}

async fn send(
    sink: &mut SplitSink<WebSocket, Message>,
    message: Message,
    write_wait: Duration,
) -> Result<(), TransportError> {
    timeout(write_wait, sink.send(message))
        .await
        .map_err(|_| TransportError::WriteTimeout(write_wait))??;
    Ok(())
}
