//! Broadcast hub: one supervising task owns the connection set.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use uuid::Uuid;

use crate::protocol::ServerMessage;

enum HubCommand {
    Join {
        id: Uuid,
        outbox: mpsc::UnboundedSender<String>,
    },
    Leave {
        id: Uuid,
    },
    Broadcast {
        payload: String,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the hub task. Cheap to clone.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubCommand>,
}

/// A registered connection: its id plus the frames queued for it.
pub struct Membership {
    pub id: Uuid,
    pub inbox: mpsc::UnboundedReceiver<String>,
    pub outbox: mpsc::UnboundedSender<String>,
}

/// Spawn the hub on the current runtime.
pub fn spawn_hub() -> HubHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_hub(rx));
    HubHandle { tx }
}

async fn run_hub(mut rx: mpsc::UnboundedReceiver<HubCommand>) {
    let mut clients: HashMap<Uuid, mpsc::UnboundedSender<String>> = HashMap::new();
    while let Some(cmd) = rx.recv().await {
        match cmd {
            HubCommand::Join { id, outbox } => {
                clients.insert(id, outbox);
                info!(client = %id, total = clients.len(), "client connected");
            }
            HubCommand::Leave { id } => {
                if clients.remove(&id).is_some() {
                    info!(client = %id, total = clients.len(), "client disconnected");
                }
            }
            HubCommand::Broadcast { payload } => {
                // A closed recipient is dropped; the others still get the frame.
                clients.retain(|id, outbox| {
                    let alive = outbox.send(payload.clone()).is_ok();
                    if !alive {
                        debug!(client = %id, "dropping closed client");
                    }
                    alive
                });
            }
            HubCommand::Count { reply } => {
                let _ = reply.send(clients.len());
            }
        }
    }
}

impl HubHandle {
    /// Register a new connection.
    pub fn join(&self) -> Membership {
        let id = Uuid::new_v4();
        let (outbox, inbox) = mpsc::unbounded_channel();
        let _ = self.tx.send(HubCommand::Join {
            id,
            outbox: outbox.clone(),
        });
        Membership { id, inbox, outbox }
    }

    pub fn leave(&self, id: Uuid) {
        let _ = self.tx.send(HubCommand::Leave { id });
    }

    pub fn broadcast(&self, message: &ServerMessage) {
        let _ = self.tx.send(HubCommand::Broadcast {
            payload: message.to_json(),
        });
    }

    pub async fn client_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(HubCommand::Count { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
