//! End-to-end tests: real listener, WebSocket clients, HTTP event ingress.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use pollcast::api::build_app;
use pollcast::app_state::AppState;
use pollcast::domain::ConnectionState;
use pollcast::ws::ConnectionSettings;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> (SocketAddr, AppState) {
    let state = AppState::new(ConnectionSettings {
        outbound_capacity: 16,
        send_timeout: Duration::from_millis(200),
    });
    let app = build_app(state.clone());
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, state)
}

async fn connect(addr: SocketAddr, query: &str) -> Client {
    let url = format!("ws://{addr}/ws{query}");
    let Ok((client, _)) = connect_async(url.as_str()).await else {
        panic!("ws connect failed for {url}");
    };
    client
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let Ok(Some(Ok(msg))) = tokio::time::timeout(Duration::from_secs(5), client.next()).await
        else {
            panic!("no message within timeout");
        };
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap_or_default(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame {other:?}"),
        }
    }
}

async fn assert_silent(client: &mut Client) {
    let waited = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(waited.is_err(), "expected no message, got {waited:?}");
}

async fn post_vote(addr: SocketAddr, poll_id: &str, yes: u64) -> Value {
    let body = json!({
        "topicKey": poll_id,
        "options": [
            { "id": "yes", "text": "Yes", "voteCount": yes },
            { "id": "no", "text": "No", "voteCount": 0 }
        ]
    });
    let Ok(resp) = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/events/vote-committed"))
        .json(&body)
        .send()
        .await
    else {
        panic!("event post failed");
    };
    assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);
    resp.json().await.unwrap_or_default()
}

#[tokio::test]
async fn poll_client_gets_ack_with_topic() {
    let (addr, _state) = spawn_server().await;
    let mut client = connect(addr, "?pollId=p1").await;

    let ack = next_json(&mut client).await;
    assert_eq!(ack["type"], "CONNECTION_ESTABLISHED");
    assert_eq!(ack["topic"], "p1");
}

#[tokio::test]
async fn vote_reaches_poll_and_general_clients_once() {
    let (addr, _state) = spawn_server().await;
    let mut poll_client = connect(addr, "?pollId=p1").await;
    let mut general = connect(addr, "").await;
    let _ = next_json(&mut poll_client).await;
    let general_ack = next_json(&mut general).await;
    assert!(general_ack.get("topic").is_none());

    let report = post_vote(addr, "p1", 3).await;
    assert_eq!(report["recipients"], 2);

    for client in [&mut poll_client, &mut general] {
        let update = next_json(client).await;
        assert_eq!(update["type"], "VOTE_UPDATE");
        assert_eq!(update["pollId"], "p1");
        assert_eq!(update["options"][0]["voteCount"], 3);
        assert!(update["timestamp"].is_string());
        assert_silent(client).await;
    }
}

#[tokio::test]
async fn other_poll_reaches_only_general_client() {
    let (addr, _state) = spawn_server().await;
    let mut poll_client = connect(addr, "?pollId=p1").await;
    let mut general = connect(addr, "").await;
    let _ = next_json(&mut poll_client).await;
    let _ = next_json(&mut general).await;

    post_vote(addr, "p2", 1).await;

    assert_eq!(next_json(&mut general).await["pollId"], "p2");
    assert_silent(&mut poll_client).await;
}

#[tokio::test]
async fn updates_arrive_in_publish_order() {
    let (addr, _state) = spawn_server().await;
    let mut client = connect(addr, "?pollId=p1").await;
    let _ = next_json(&mut client).await;

    post_vote(addr, "p1", 1).await;
    post_vote(addr, "p1", 2).await;

    assert_eq!(next_json(&mut client).await["options"][0]["voteCount"], 1);
    assert_eq!(next_json(&mut client).await["options"][0]["voteCount"], 2);
}

#[tokio::test]
async fn echo_probe() {
    let (addr, _state) = spawn_server().await;
    let mut client = connect(addr, "").await;
    let _ = next_json(&mut client).await;

    assert!(client.send(Message::text("ping?")).await.is_ok());
    let echo = next_json(&mut client).await;
    assert_eq!(echo["type"], "MESSAGE_ECHO");
    assert_eq!(echo["message"], "ping?");
    assert!(echo["timestamp"].is_string());
}

#[tokio::test]
async fn disconnected_client_is_purged_and_others_still_receive() {
    let (addr, state) = spawn_server().await;
    let mut leaving = connect(addr, "?pollId=p1").await;
    let mut staying = connect(addr, "?pollId=p1").await;
    let _ = next_json(&mut leaving).await;
    let _ = next_json(&mut staying).await;

    assert!(leaving.close(None).await.is_ok());
    drop(leaving);

    let mut purged = false;
    for _ in 0..50 {
        if state.subscriptions.connection_count().await == 1 {
            purged = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(purged, "closed client still registered");

    let report = post_vote(addr, "p1", 5).await;
    assert_eq!(report["recipients"], 1);
    assert_eq!(next_json(&mut staying).await["options"][0]["voteCount"], 5);
}

#[tokio::test]
async fn health_counts_connections() {
    let (addr, _state) = spawn_server().await;
    let mut a = connect(addr, "?pollId=p1").await;
    let mut b = connect(addr, "").await;
    let _ = next_json(&mut a).await;
    let _ = next_json(&mut b).await;

    let Ok(resp) = reqwest::get(format!("http://{addr}/health")).await else {
        panic!("health request failed");
    };
    let health: Value = resp.json().await.unwrap_or_default();
    assert_eq!(health["status"], "OK");
    assert_eq!(health["websocketConnections"]["p1"], 1);
    assert_eq!(health["websocketConnections"]["*"], 1);
    assert_eq!(health["totalConnections"], 2);
}

#[tokio::test]
async fn malformed_handshake_is_rejected_before_upgrade() {
    let (addr, state) = spawn_server().await;

    let Ok(resp) = reqwest::Client::new()
        .get(format!("http://{addr}/ws?pollId=bad%2Fid"))
        .header("connection", "upgrade")
        .header("upgrade", "websocket")
        .header("sec-websocket-version", "13")
        .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
        .send()
        .await
    else {
        panic!("request failed");
    };
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap_or_default();
    assert_eq!(body["error"]["code"], 5001);
    assert_eq!(state.subscriptions.connection_count().await, 0);

    let empty = connect_async(format!("ws://{addr}/ws?pollId=").as_str()).await;
    assert!(empty.is_err());
}

#[tokio::test]
async fn shutdown_closes_every_connection() {
    let (addr, state) = spawn_server().await;
    let mut a = connect(addr, "?pollId=p1").await;
    let mut b = connect(addr, "").await;
    let _ = next_json(&mut a).await;
    let _ = next_json(&mut b).await;

    let registry = std::sync::Arc::clone(state.subscriptions.registry());
    let Some(key) = registry.topic_keys().await.into_iter().next() else {
        panic!("no topics registered");
    };
    let tracked = registry.subscribers_of(&key).await;

    assert_eq!(state.subscriptions.shutdown().await, 2);
    assert!(tracked.iter().all(|c| c.state() == ConnectionState::Closed));
    assert!(registry.topic_keys().await.is_empty());

    for client in [&mut a, &mut b] {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next()).await;
        let Ok(frame) = frame else {
            panic!("client not closed");
        };
        assert!(matches!(frame, None | Some(Ok(Message::Close(_))) | Some(Err(_))));
    }

    let rejected = connect_async(format!("ws://{addr}/ws").as_str()).await;
    assert!(rejected.is_err());
}
