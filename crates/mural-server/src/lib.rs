//! Mural WebSocket Server
//!
//! Hosts one shared scene per room. Each connection joins a room through
//! `GET /ws?room=<name>` and must open with a `JOIN` message:
//!
//! ```json
//! { "type": "JOIN", "width": 1280, "height": 720, "group": "wall" }
//! ```
//!
//! Every later text frame is a client message for the room's engine; server
//! messages come back as text frames.

pub mod config;
pub mod room;

use axum::{
    Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use mural_core::{ClientMessage, ProtocolError, ServerMessage};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

pub use config::{ConfigError, ServerConfig};
pub use room::{RoomError, RoomHandle};

/// Shared application state.
pub struct AppState {
    config: ServerConfig,
    /// Rooms live for the life of the process.
    rooms: DashMap<String, RoomHandle>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            rooms: DashMap::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get or start a room.
    pub fn room(&self, name: &str) -> RoomHandle {
        self.rooms
            .entry(name.to_string())
            .or_insert_with(|| RoomHandle::spawn(name.to_string(), self.config.engine))
            .clone()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "Mural Server - Connect via WebSocket at /ws?room=<name>"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct WsParams {
    room: Option<String>,
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let room = params
        .room
        .filter(|room| !room.trim().is_empty())
        .unwrap_or_else(|| state.config.default_room.clone());
    ws.on_upgrade(move |socket| handle_socket(socket, state, room))
}

type WsSender = SplitSink<WebSocket, Message>;

async fn send_message(sender: &mut WsSender, message: &ServerMessage) -> bool {
    match message.to_json() {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("Failed to encode message: {e}");
            false
        }
    }
}

async fn reject(sender: &mut WsSender, reason: String) {
    send_message(sender, &ServerMessage::Error { reason }).await;
    let _ = sender.send(Message::Close(None)).await;
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room_name: String) {
    let (mut sender, mut receiver) = socket.split();

    // The first text frame must be a JOIN.
    let request = loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => match ClientMessage::from_json(&text) {
                Ok(ClientMessage::Join(request)) => break request,
                Ok(_) => {
                    reject(&mut sender, ProtocolError::NotJoined.to_string()).await;
                    return;
                }
                Err(e) => {
                    reject(&mut sender, e.to_string()).await;
                    return;
                }
            },
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
            Some(Ok(_)) => {}
        }
    };

    let room = state.room(&room_name);
    let (outbox, mut inbox) = mpsc::unbounded_channel::<String>();
    let view = match room.join(request, outbox).await {
        Ok(view) => view,
        Err(e) => {
            warn!(room = %room_name, "Join refused: {e}");
            reject(&mut sender, e.to_string()).await;
            return;
        }
    };
    info!(room = %room_name, %view, "New connection");

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match ClientMessage::from_json(&text) {
                        Ok(message) => {
                            if room.send(view, message).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(%view, "Invalid message: {e}");
                            let error = ServerMessage::Error {
                                reason: e.to_string(),
                            };
                            if !send_message(&mut sender, &error).await {
                                break;
                            }
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore binary and ping/pong
                    Some(Err(e)) => {
                        warn!(%view, "WebSocket error: {e}");
                        break;
                    }
                }
            }

            // Forward room output to the client
            out = inbox.recv() => {
                match out {
                    Some(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    // The room dropped us, e.g. after LEAVE.
                    None => break,
                }
            }
        }
    }

    room.disconnect(view);
    info!(room = %room_name, %view, "Connection closed");
}
