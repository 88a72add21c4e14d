use futures_util::{SinkExt, StreamExt};
use mural_server::{AppState, ServerConfig, app};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(AppState::new(ServerConfig::default()));
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, room: &str) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws?room={room}")).await.unwrap();
    client
}

async fn send(client: &mut Client, value: Value) {
    client.send(Message::text(value.to_string())).await.unwrap();
}

/// Next text frame as JSON, skipping control frames.
async fn recv(client: &mut Client) -> Value {
    let next = async {
        loop {
            let msg = client.next().await.unwrap().unwrap();
            if msg.is_text() {
                return serde_json::from_str::<Value>(msg.to_text().unwrap()).unwrap();
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), next).await.unwrap()
}

async fn recv_type(client: &mut Client, kind: &str) -> Value {
    loop {
        let msg = recv(client).await;
        if msg["type"] == kind {
            return msg;
        }
    }
}

#[tokio::test]
async fn test_join_receives_snapshot_and_peers_are_announced() {
    let addr = start_server().await;

    let mut first = connect(addr, "board").await;
    send(&mut first, json!({"type": "JOIN", "width": 800, "height": 600})).await;
    let snapshot = recv(&mut first).await;
    assert_eq!(snapshot["type"], "FULL_SNAPSHOT");
    let first_id = snapshot["view_id"].clone();
    assert_eq!(snapshot["views"].as_array().unwrap().len(), 1);

    let mut second = connect(addr, "board").await;
    send(&mut second, json!({"type": "JOIN", "width": 640, "height": 480})).await;
    let snapshot = recv(&mut second).await;
    assert_eq!(snapshot["type"], "FULL_SNAPSHOT");
    assert_eq!(snapshot["views"].as_array().unwrap().len(), 2);

    let added = recv(&mut first).await;
    assert_eq!(added["type"], "ADD_VIEW");
    assert_eq!(added["view"]["id"], snapshot["view_id"]);
    assert_ne!(added["view"]["id"], first_id);
}

#[tokio::test]
async fn test_spawn_and_drag_reach_other_views() {
    let addr = start_server().await;

    let mut a = connect(addr, "drag").await;
    send(&mut a, json!({"type": "JOIN", "width": 800, "height": 600})).await;
    recv_type(&mut a, "FULL_SNAPSHOT").await;

    let mut b = connect(addr, "drag").await;
    send(&mut b, json!({"type": "JOIN", "width": 800, "height": 600})).await;
    recv_type(&mut b, "FULL_SNAPSHOT").await;

    let spec = json!({
        "x": 100, "y": 100,
        "hitbox": {"shape": "rectangle", "x": -50, "y": -50, "width": 100, "height": 100},
        "interactions": ["drag"],
    });
    send(&mut a, json!({"type": "SPAWN", "spec": spec})).await;
    let added = recv_type(&mut b, "ADD_ITEM").await;
    let id = added["item"]["id"].clone();

    send(&mut a, json!({"type": "POINTER_DOWN", "pointer_id": 1, "x": 100, "y": 100})).await;
    send(&mut a, json!({"type": "POINTER_MOVE", "pointer_id": 1, "x": 130, "y": 100})).await;

    let locked = recv_type(&mut b, "UD_ITEM").await;
    assert_eq!(locked["id"], id);
    assert!(locked["patch"]["locked_by"].is_number());
    let moved = recv_type(&mut b, "UD_ITEM").await;
    assert_eq!(moved["patch"]["x"], 130.0);
}

#[tokio::test]
async fn test_first_message_must_be_join() {
    let addr = start_server().await;
    let mut client = connect(addr, "strict").await;
    send(&mut client, json!({"type": "RELEASE"})).await;
    let reply = recv(&mut client).await;
    assert_eq!(reply["type"], "ERROR");
}

#[tokio::test]
async fn test_join_without_height_is_refused() {
    let addr = start_server().await;
    let mut client = connect(addr, "strict").await;
    send(&mut client, json!({"type": "JOIN", "width": 800})).await;
    let reply = recv(&mut client).await;
    assert_eq!(reply["type"], "ERROR");
    assert!(reply["reason"].as_str().unwrap().contains("height"));
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    let addr = start_server().await;

    let mut a = connect(addr, "one").await;
    send(&mut a, json!({"type": "JOIN", "width": 800, "height": 600})).await;
    recv_type(&mut a, "FULL_SNAPSHOT").await;

    let mut b = connect(addr, "two").await;
    send(&mut b, json!({"type": "JOIN", "width": 800, "height": 600})).await;
    let snapshot = recv_type(&mut b, "FULL_SNAPSHOT").await;
    assert_eq!(snapshot["views"].as_array().unwrap().len(), 1);
}
