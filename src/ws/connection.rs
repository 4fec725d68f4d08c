//! Socket read/write loops for a single WebSocket connection.
//!
//! The writer task drains the connection's outbound queue into the socket
//! sink. The reader loop answers inbound frames with an echo and ends on a
//! close frame, a transport error, or the connection being closed from
//! elsewhere (failed broadcast, shutdown). Every exit runs the manager's
//! cleanup.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};

use super::subscription::SubscriptionManager;
use crate::domain::{Connection, ConnectionState, Payload, TopicKey};

/// Why the reader loop stopped.
enum Exit {
    /// Client closed or the stream ended.
    Remote,
    /// Connection was closed on the server side.
    Local,
    /// Echo could not be queued.
    SendFailed,
    /// Transport reported an error.
    Transport(axum::Error),
}

/// Registers the socket on `topic` and runs it until it closes.
pub async fn run_connection(socket: WebSocket, manager: Arc<SubscriptionManager>, topic: TopicKey) {
    let (outbound, queue) = manager.outbound_channel();
    let connection = match manager.on_connect(topic, outbound).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!(error = %e, "ws handshake rejected after upgrade");
            let mut socket = socket;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let (ws_tx, mut ws_rx) = socket.split();
    let send_timeout = manager.settings().send_timeout;
    let writer = tokio::spawn(write_loop(
        ws_tx,
        queue,
        Arc::clone(&connection),
        send_timeout,
    ));
    let mut state = connection.watch_state();

    let exit = loop {
        tokio::select! {
            msg = ws_rx.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(Message::Binary(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
                    Some(Ok(Message::Close(_))) | None => break Exit::Remote,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => break Exit::Transport(e),
                };
                if manager.on_message(&connection, &text).await.is_err() {
                    break Exit::SendFailed;
                }
            }
            () = closed(&mut state) => break Exit::Local,
        }
    };

    match exit {
        Exit::Transport(e) => manager.on_error(&connection, &e).await,
        Exit::SendFailed => manager.on_error(&connection, &"echo send failed").await,
        Exit::Remote | Exit::Local => manager.on_disconnect(&connection).await,
    }

    if let Err(e) = writer.await {
        tracing::warn!(conn_id = %connection.id(), error = %e, "ws writer task failed");
    }
    tracing::debug!(conn_id = %connection.id(), "ws connection closed");
}

/// Resolves once the connection reaches `Closed`.
async fn closed(state: &mut watch::Receiver<ConnectionState>) {
    let _ = state.wait_for(|s| *s == ConnectionState::Closed).await;
}

/// Forwards queued payloads to the socket until the queue is released.
///
/// A write stuck on a peer that stopped reading is abandoned as soon as the
/// connection is closed, and the closing frame gets at most `send_timeout`.
async fn write_loop<S>(
    mut ws_tx: S,
    mut queue: mpsc::Receiver<Payload>,
    connection: Arc<Connection>,
    send_timeout: Duration,
) where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    let mut state = connection.watch_state();
    while let Some(payload) = queue.recv().await {
        tokio::select! {
            biased;
            sent = ws_tx.send(Message::text(&*payload)) => {
                if let Err(e) = sent {
                    tracing::debug!(conn_id = %connection.id(), error = %e, "ws write failed");
                    connection.close();
                    return;
                }
            }
            () = closed(&mut state) => {
                tracing::debug!(conn_id = %connection.id(), "ws write abandoned on close");
                return;
            }
        }
    }
    // Queue released by `Connection::close`: say goodbye.
    let goodbye = async {
        let _ = ws_tx.send(Message::Close(None)).await;
        let _ = ws_tx.close().await;
    };
    if tokio::time::timeout(send_timeout, goodbye).await.is_err() {
        tracing::debug!(conn_id = %connection.id(), "ws close frame timed out");
    }
}
