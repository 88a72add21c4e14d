//! One task per room, owning that room's engine.
//!
//! Connections talk to the room over an unbounded command channel, so
//! messages from different connections interleave only at message
//! boundaries. Outbound JSON goes back through one unbounded channel per
//! connection.

use mural_core::{Audience, ClientMessage, Engine, EngineConfig, JoinRequest, ServerMessage, ViewId};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Per-connection outbound queue of serialized server messages.
pub type Outbox = mpsc::UnboundedSender<String>;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room task has stopped")]
    Closed,
    #[error("{0}")]
    Rejected(String),
}

enum Command {
    Join {
        request: JoinRequest,
        outbox: Outbox,
        reply: oneshot::Sender<Result<ViewId, String>>,
    },
    Inbound {
        view: ViewId,
        message: ClientMessage,
    },
    Disconnect {
        view: ViewId,
    },
}

/// Cheap handle to a running room task.
#[derive(Clone)]
pub struct RoomHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl RoomHandle {
    /// Start a room task with a fresh engine.
    pub fn spawn(name: String, config: EngineConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_room(name, Engine::new(config), rx));
        Self { tx }
    }

    /// Admit a view. Its outbox receives the snapshot before this returns.
    pub async fn join(&self, request: JoinRequest, outbox: Outbox) -> Result<ViewId, RoomError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Join { request, outbox, reply })
            .map_err(|_| RoomError::Closed)?;
        response
            .await
            .map_err(|_| RoomError::Closed)?
            .map_err(RoomError::Rejected)
    }

    pub fn send(&self, view: ViewId, message: ClientMessage) -> Result<(), RoomError> {
        self.tx
            .send(Command::Inbound { view, message })
            .map_err(|_| RoomError::Closed)
    }

    pub fn disconnect(&self, view: ViewId) {
        let _ = self.tx.send(Command::Disconnect { view });
    }
}

async fn run_room(name: String, mut engine: Engine, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut peers: HashMap<ViewId, Outbox> = HashMap::new();
    info!(room = %name, "Room started");

    while let Some(command) = rx.recv().await {
        match command {
            Command::Join { request, outbox, reply } => match engine.join(&request) {
                Ok(view) => {
                    peers.insert(view, outbox);
                    let _ = reply.send(Ok(view));
                    info!(room = %name, %view, peers = peers.len(), "View joined");
                }
                Err(e) => {
                    let _ = reply.send(Err(e.to_string()));
                }
            },
            Command::Inbound { view, message } => {
                let leaving = matches!(message, ClientMessage::Leave);
                if let Err(e) = engine.handle(view, message) {
                    warn!(room = %name, %view, "Rejected message: {e}");
                    send_error(&peers, view, e.to_string());
                }
                if leaving {
                    peers.remove(&view);
                }
            }
            Command::Disconnect { view } => {
                if engine.leave(view) {
                    debug!(room = %name, %view, "View disconnected");
                }
                peers.remove(&view);
            }
        }
        flush(&mut engine, &peers);
    }
}

fn send_error(peers: &HashMap<ViewId, Outbox>, view: ViewId, reason: String) {
    let Some(outbox) = peers.get(&view) else {
        return;
    };
    match (ServerMessage::Error { reason }).to_json() {
        Ok(json) => {
            let _ = outbox.send(json);
        }
        Err(e) => error!("Failed to encode error message: {e}"),
    }
}

/// Serialize each queued envelope once and hand it to every matching peer.
fn flush(engine: &mut Engine, peers: &HashMap<ViewId, Outbox>) {
    for envelope in engine.take_outgoing() {
        let json = match envelope.message.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode outbound message: {e}");
                continue;
            }
        };
        match envelope.audience {
            Audience::Only(view) => {
                if let Some(outbox) = peers.get(&view) {
                    let _ = outbox.send(json);
                }
            }
            audience => {
                for (view, outbox) in peers {
                    if audience.includes(*view) {
                        let _ = outbox.send(json.clone());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_delivers_snapshot_first() {
        let room = RoomHandle::spawn("test".into(), EngineConfig::default());
        let (outbox, mut inbox) = mpsc::unbounded_channel();
        let view = room.join(JoinRequest::new(800.0, 600.0), outbox).await.unwrap();

        let first = inbox.recv().await.unwrap();
        let message: ServerMessage = serde_json::from_str(&first).unwrap();
        assert!(matches!(message, ServerMessage::FullSnapshot { view_id, .. } if view_id == view));
    }

    #[tokio::test]
    async fn test_rejected_join() {
        let room = RoomHandle::spawn("test".into(), EngineConfig::default());
        let (outbox, _inbox) = mpsc::unbounded_channel();
        let result = room.join(JoinRequest::default(), outbox).await;
        assert!(matches!(result, Err(RoomError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_bad_message_answered_with_error() {
        let room = RoomHandle::spawn("test".into(), EngineConfig::default());
        let (outbox, mut inbox) = mpsc::unbounded_channel();
        let view = room.join(JoinRequest::new(800.0, 600.0), outbox).await.unwrap();
        inbox.recv().await.unwrap();

        room.send(view, ClientMessage::Join(JoinRequest::new(1.0, 1.0))).unwrap();
        let reply: ServerMessage = serde_json::from_str(&inbox.recv().await.unwrap()).unwrap();
        assert!(matches!(reply, ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn test_leave_closes_outbox() {
        let room = RoomHandle::spawn("test".into(), EngineConfig::default());
        let (outbox, mut inbox) = mpsc::unbounded_channel();
        let view = room.join(JoinRequest::new(800.0, 600.0), outbox).await.unwrap();
        inbox.recv().await.unwrap();

        room.send(view, ClientMessage::Leave).unwrap();
        // The room drops our sender; anything queued before is still delivered.
        while inbox.recv().await.is_some() {}
    }
}
