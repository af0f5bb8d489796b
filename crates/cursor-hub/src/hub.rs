//! The hub task and its handle.
//!
//! Registration, deregistration, shutdown and (in broadcast mode) relay
//! requests all travel over one ordered command channel, so a connection's
//! register is always processed before its deregister and a sender's moves
//! before its leave.

use std::collections::HashMap;
use std::sync::Arc;

use cursor_protocol::{PositionEvent, SessionId};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::{HubConfig, RelayMode};
use crate::error::HubError;

/// An event handed to one outbound pump. `accepted` fires once a pump
/// has taken it off the shared feed.
struct Delivery {
    event: PositionEvent,
    accepted: oneshot::Sender<()>,
}

type SharedFeed = Arc<Mutex<mpsc::Receiver<Delivery>>>;

enum HubCommand {
    Register(Member),
    Deregister(SessionId),
    Relay(PositionEvent),
    Shutdown(oneshot::Sender<usize>),
    Members(oneshot::Sender<Vec<SessionId>>),
}

/// Membership record kept in the registry. The hub never owns the socket.
#[derive(Debug)]
pub struct Member {
    session_id: SessionId,
    /// Private queue of the connection's outbound pump (broadcast mode only)
    outbox: Option<mpsc::Sender<PositionEvent>>,
}

impl Member {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}

/// Where an outbound pump takes its next event from.
pub struct RelayFeed {
    inner: FeedInner,
}

enum FeedInner {
    Shared(SharedFeed),
    Outbox(mpsc::Receiver<PositionEvent>),
}

impl RelayFeed {
    /// Wait for the next event. `None` means the relay source is closed.
    ///
    /// Cancel safe: dropping the future before it completes never loses
    /// an event.
    pub async fn next(&mut self) -> Option<PositionEvent> {
        match &mut self.inner {
            FeedInner::Shared(feed) => {
                let mut rx = feed.lock().await;
                let delivery = rx.recv().await?;
                // The submitter may have stopped waiting; the event is still ours.
                let _ = delivery.accepted.send(());
                Some(delivery.event)
            }
            FeedInner::Outbox(rx) => rx.recv().await,
        }
    }
}

/// The submission side of the relay path.
#[derive(Clone)]
enum RelayPath {
    Single(mpsc::Sender<Delivery>),
    Broadcast(mpsc::Sender<HubCommand>),
}

impl RelayPath {
    async fn submit(&self, event: PositionEvent) {
        match self {
            Self::Single(tx) => {
                let (accepted, taken) = oneshot::channel();
                if tx.send(Delivery { event, accepted }).await.is_err() {
                    warn!("Relay feed closed; event dropped");
                    return;
                }
                let _ = taken.await;
            }
            Self::Broadcast(tx) => {
                if tx.send(HubCommand::Relay(event)).await.is_err() {
                    warn!("Hub stopped; event dropped");
                }
            }
        }
    }
}

/// The hub task state. Created and started with [`Hub::spawn`].
pub struct Hub {
    commands: mpsc::Receiver<HubCommand>,
    /// Used only to submit shutdown leaves; weak so dropping every handle stops the hub.
    commands_weak: mpsc::WeakSender<HubCommand>,
    single_tx: Option<mpsc::Sender<Delivery>>,
    registry: HashMap<SessionId, Member>,
}

impl Hub {
    /// Start the hub task and return a handle to it.
    pub fn spawn(config: HubConfig) -> HubHandle {
        let (commands_tx, commands) = mpsc::channel(config.command_capacity.max(1));

        let (relay, shared, single_tx) = match config.relay_mode {
            RelayMode::Single => {
                let (tx, rx) = mpsc::channel(1);
                (
                    RelayPath::Single(tx.clone()),
                    Some(Arc::new(Mutex::new(rx))),
                    Some(tx),
                )
            }
            RelayMode::Broadcast => (RelayPath::Broadcast(commands_tx.clone()), None, None),
        };

        let hub = Hub {
            commands,
            commands_weak: commands_tx.downgrade(),
            single_tx,
            registry: HashMap::new(),
        };
        tokio::spawn(hub.run());

        HubHandle {
            commands: commands_tx,
            relay,
            shared,
            config,
        }
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        debug!("Hub stopped ({} clients registered)", self.registry.len());
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(member) => {
                let id = member.session_id.clone();
                if self.registry.contains_key(&id) {
                    debug!("Client already registered: {id}");
                } else {
                    self.registry.insert(id.clone(), member);
                    info!("Client registered: {id} (total: {})", self.registry.len());
                }
            }
            HubCommand::Deregister(id) => {
                if self.registry.remove(&id).is_some() {
                    info!("Client deregistered: {id} (total: {})", self.registry.len());
                }
            }
            HubCommand::Relay(event) => self.fan_out(event),
            HubCommand::Shutdown(reply) => {
                let count = self.shutdown();
                let _ = reply.send(count);
            }
            HubCommand::Members(reply) => {
                let _ = reply.send(self.registry.keys().cloned().collect());
            }
        }
    }

    fn fan_out(&self, event: PositionEvent) {
        let mut recipients = 0usize;
        for member in self.registry.values() {
            let Some(outbox) = &member.outbox else { continue };
            match outbox.try_send(event.clone()) {
                Ok(()) => recipients += 1,
                Err(mpsc::error::TrySendError::Full(leave)) if leave.is_leave() => {
                    // A lost leave would leave a stale cursor behind for good;
                    // wait for room off the hub task instead.
                    debug!("Outbox full for {}; queueing leave", member.session_id);
                    let outbox = outbox.clone();
                    tokio::spawn(async move {
                        let _ = outbox.send(leave).await;
                    });
                    recipients += 1;
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        "Outbox full for {}; dropped {} from {}",
                        member.session_id,
                        event.method.as_str(),
                        event.session_id
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("Outbox closed for {}", member.session_id);
                }
            }
        }
        debug!(
            "Relayed {} from {} to {recipients} clients",
            event.method.as_str(),
            event.session_id
        );
    }

    /// Schedule one leave per registered client, each in its own task.
    fn shutdown(&self) -> usize {
        let path = match &self.single_tx {
            Some(tx) => RelayPath::Single(tx.clone()),
            None => match self.commands_weak.upgrade() {
                Some(tx) => RelayPath::Broadcast(tx),
                None => return 0,
            },
        };

        for id in self.registry.keys() {
            let path = path.clone();
            let leave = PositionEvent::leave(id);
            info!("Sending leave for {id}");
            tokio::spawn(async move { path.submit(leave).await });
        }
        self.registry.len()
    }
}

/// Cloneable client side of the hub.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    relay: RelayPath,
    shared: Option<SharedFeed>,
    config: HubConfig,
}

impl HubHandle {
    pub fn relay_mode(&self) -> RelayMode {
        self.config.relay_mode
    }

    /// Build the membership record for a new connection together with the
    /// feed its outbound pump should consume.
    pub fn attach(&self, session_id: SessionId) -> (Member, RelayFeed) {
        match &self.shared {
            Some(shared) => (
                Member {
                    session_id,
                    outbox: None,
                },
                RelayFeed {
                    inner: FeedInner::Shared(shared.clone()),
                },
            ),
            None => {
                let (tx, rx) = mpsc::channel(self.config.outbox_capacity.max(1));
                (
                    Member {
                        session_id,
                        outbox: Some(tx),
                    },
                    RelayFeed {
                        inner: FeedInner::Outbox(rx),
                    },
                )
            }
        }
    }

    /// Add a connection to the registry. Registering twice is harmless.
    pub async fn register(&self, member: Member) {
        if self.commands.send(HubCommand::Register(member)).await.is_err() {
            warn!("Hub stopped; registration dropped");
        }
    }

    /// Remove a connection from the registry if it is present.
    pub async fn deregister(&self, session_id: &SessionId) {
        let command = HubCommand::Deregister(session_id.clone());
        if self.commands.send(command).await.is_err() {
            warn!("Hub stopped; deregistration of {session_id} dropped");
        }
    }

    /// Submit an event for delivery.
    ///
    /// In single mode this waits, without bound, until an outbound pump
    /// takes the event. In broadcast mode it waits only for the hub to
    /// accept the command.
    pub async fn relay(&self, event: PositionEvent) {
        self.relay.submit(event).await;
    }

    /// Submit a leave for every registered connection. Returns how many
    /// were scheduled.
    pub async fn shutdown(&self) -> Result<usize, HubError> {
        let (reply, count) = oneshot::channel();
        self.commands
            .send(HubCommand::Shutdown(reply))
            .await
            .map_err(|_| HubError::Stopped)?;
        count.await.map_err(|_| HubError::Stopped)
    }

    /// Snapshot of the registry.
    pub async fn members(&self) -> Result<Vec<SessionId>, HubError> {
        let (reply, members) = oneshot::channel();
        self.commands
            .send(HubCommand::Members(reply))
            .await
            .map_err(|_| HubError::Stopped)?;
        members.await.map_err(|_| HubError::Stopped)
    }
}
