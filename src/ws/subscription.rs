//! Connection lifecycle: handshake, registration, echo, and cleanup.
//!
//! [`SubscriptionManager`] is the owner of every live [`Connection`]. It
//! registers new connections into the shared [`TopicRegistry`], purges them
//! from it on close or error, and closes all of them on shutdown.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::{RwLock, mpsc};
use utoipa::IntoParams;

use super::messages::{ServerMessage, Stamped};
use crate::domain::{
    Connection, ConnectionId, Payload, PollId, RegistrySnapshot, TopicKey, TopicRegistry,
};
use crate::error::{HandshakeError, SendError};

/// Query parameters of `GET /ws`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HandshakeRequest {
    /// Poll to follow. Omit to receive updates for every poll.
    pub poll_id: Option<String>,
}

impl HandshakeRequest {
    /// Resolves the topic this request subscribes to.
    ///
    /// # Errors
    ///
    /// Returns a [`HandshakeError`] if `pollId` is present but malformed.
    pub fn topic_key(&self) -> Result<TopicKey, HandshakeError> {
        self.poll_id
            .as_deref()
            .map(PollId::parse)
            .transpose()
            .map(TopicKey::from)
    }
}

/// Per-connection delivery settings.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// Capacity of each connection's outbound queue.
    pub outbound_capacity: usize,
    /// Longest a send may wait for queue capacity before the connection is
    /// declared dead.
    pub send_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            outbound_capacity: 64,
            send_timeout: Duration::from_millis(1000),
        }
    }
}

/// Owns live connections and keeps the [`TopicRegistry`] in sync with them.
#[derive(Debug)]
pub struct SubscriptionManager {
    registry: Arc<TopicRegistry>,
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
    settings: ConnectionSettings,
    accepting: AtomicBool,
}

impl SubscriptionManager {
    /// Creates a manager registering into `registry`.
    #[must_use]
    pub fn new(registry: Arc<TopicRegistry>, settings: ConnectionSettings) -> Self {
        Self {
            registry,
            connections: RwLock::new(HashMap::new()),
            settings,
            accepting: AtomicBool::new(true),
        }
    }

    /// Returns the shared topic registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// Returns the per-connection delivery settings.
    #[must_use]
    pub const fn settings(&self) -> ConnectionSettings {
        self.settings
    }

    /// Creates the outbound queue for a new connection.
    #[must_use]
    pub fn outbound_channel(&self) -> (mpsc::Sender<Payload>, mpsc::Receiver<Payload>) {
        mpsc::channel(self.settings.outbound_capacity.max(1))
    }

    /// Returns `true` until [`SubscriptionManager::shutdown`] is called.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Registers a new connection on `topic` and acknowledges it.
    ///
    /// The acknowledgment is queued after registration, so a broadcast
    /// racing the handshake is never missed. A failed acknowledgment tears
    /// the connection down through [`SubscriptionManager::on_error`] but is
    /// not reported to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::ShuttingDown`] once shutdown has begun.
    pub async fn on_connect(
        &self,
        topic: TopicKey,
        outbound: mpsc::Sender<Payload>,
    ) -> Result<Arc<Connection>, HandshakeError> {
        if !self.is_accepting() {
            return Err(HandshakeError::ShuttingDown);
        }

        let connection = Arc::new(Connection::open(
            topic.clone(),
            outbound,
            self.settings.send_timeout,
        ));
        {
            let mut connections = self.connections.write().await;
            // Re-check under the guard: shutdown drains this map while
            // holding it.
            if !self.is_accepting() {
                connection.close();
                return Err(HandshakeError::ShuttingDown);
            }
            connections.insert(connection.id(), Arc::clone(&connection));
            self.registry.subscribe(topic.clone(), &connection).await;
        }
        tracing::info!(conn_id = %connection.id(), %topic, "ws client connected");

        let ack = ServerMessage::connection_established(topic.poll_id());
        match serde_json::to_string(&ack) {
            Ok(json) => {
                if let Err(e) = connection.send(Payload::from(json)).await {
                    tracing::warn!(conn_id = %connection.id(), "failed to deliver connection ack");
                    self.on_error(&connection, &e).await;
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize connection ack"),
        }

        Ok(connection)
    }

    /// Answers an inbound message with a timestamped echo.
    ///
    /// Has no effect on topic state.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Dead`] if the echo could not be queued.
    pub async fn on_message(&self, connection: &Connection, raw: &str) -> Result<(), SendError> {
        tracing::debug!(conn_id = %connection.id(), len = raw.len(), "ws message received");
        let echo = ServerMessage::MessageEcho {
            message: raw.to_string(),
        };
        let json = serde_json::to_string(&Stamped::now(&echo)).map_err(|e| {
            tracing::warn!(error = %e, "failed to serialize echo");
            SendError::Dead
        })?;
        connection.send(Payload::from(json)).await
    }

    /// Purges `connection` from the registry and closes it.
    ///
    /// Idempotent: repeated calls for the same connection are no-ops.
    pub async fn on_disconnect(&self, connection: &Connection) {
        let owned = self
            .connections
            .write()
            .await
            .remove(&connection.id())
            .is_some();
        let purged = self.registry.unsubscribe_all(connection).await;
        let closed = connection.close();
        if owned || purged > 0 || closed {
            let connected_ms = (Utc::now() - connection.opened_at()).num_milliseconds();
            tracing::info!(
                conn_id = %connection.id(),
                topic = %connection.topic(),
                connected_ms,
                "ws client disconnected"
            );
        }
    }

    /// Logs `err` and runs the same cleanup as
    /// [`SubscriptionManager::on_disconnect`].
    pub async fn on_error(&self, connection: &Connection, err: &(dyn fmt::Display + Sync)) {
        tracing::warn!(conn_id = %connection.id(), error = %err, "ws connection error");
        self.on_disconnect(connection).await;
    }

    /// Stops accepting handshakes and closes every owned connection.
    ///
    /// Returns the number of connections closed. When this returns, every
    /// previously open connection is `Closed`.
    pub async fn shutdown(&self) -> usize {
        let drained: Vec<Arc<Connection>> = {
            let mut connections = self.connections.write().await;
            self.accepting.store(false, Ordering::Release);
            connections.drain().map(|(_, connection)| connection).collect()
        };
        let mut closed = 0;
        for connection in &drained {
            self.registry.unsubscribe_all(connection).await;
            if connection.close() {
                closed += 1;
            }
        }
        tracing::info!(closed, "closed all ws connections");
        closed
    }

    /// Returns the number of owned connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns per-topic connection counts.
    pub async fn stats(&self) -> RegistrySnapshot {
        self.registry.snapshot().await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::ConnectionState;

    fn manager() -> SubscriptionManager {
        SubscriptionManager::new(
            Arc::new(TopicRegistry::new()),
            ConnectionSettings {
                outbound_capacity: 8,
                send_timeout: Duration::from_millis(50),
            },
        )
    }

    fn poll(raw: &str) -> TopicKey {
        let Ok(id) = PollId::parse(raw) else {
            panic!("valid id rejected");
        };
        TopicKey::Poll(id)
    }

    async fn connect(
        mgr: &SubscriptionManager,
        topic: TopicKey,
    ) -> (Arc<Connection>, mpsc::Receiver<Payload>) {
        let (tx, rx) = mgr.outbound_channel();
        let Ok(conn) = mgr.on_connect(topic, tx).await else {
            panic!("connect rejected");
        };
        (conn, rx)
    }

    fn json(payload: Option<Payload>) -> serde_json::Value {
        let Some(payload) = payload else {
            panic!("expected a message");
        };
        serde_json::from_str(&payload).unwrap_or_default()
    }

    #[test]
    fn handshake_without_poll_is_all_topics() {
        let req = HandshakeRequest::default();
        assert_eq!(req.topic_key(), Ok(TopicKey::AllTopics));
    }

    #[test]
    fn handshake_with_poll() {
        let req = HandshakeRequest {
            poll_id: Some("p1".to_string()),
        };
        assert_eq!(req.topic_key(), Ok(poll("p1")));
    }

    #[test]
    fn handshake_with_empty_poll_is_rejected() {
        let req = HandshakeRequest {
            poll_id: Some(String::new()),
        };
        assert_eq!(req.topic_key(), Err(HandshakeError::EmptyPollId));
    }

    #[tokio::test]
    async fn connect_registers_then_acks() {
        let mgr = manager();
        let (conn, mut rx) = connect(&mgr, poll("p1")).await;

        assert_eq!(mgr.connection_count().await, 1);
        assert_eq!(mgr.registry().subscribers_of(&poll("p1")).await.len(), 1);

        let ack = json(rx.recv().await);
        assert_eq!(ack["type"], "CONNECTION_ESTABLISHED");
        assert_eq!(ack["topic"], "p1");
        assert!(conn.is_open());
    }

    #[tokio::test]
    async fn connect_general_acks_without_topic() {
        let mgr = manager();
        let (_conn, mut rx) = connect(&mgr, TopicKey::AllTopics).await;
        let ack = json(rx.recv().await);
        assert!(ack.get("topic").is_none());
        assert!(mgr.registry().contains_topic(&TopicKey::AllTopics).await);
    }

    #[tokio::test]
    async fn lost_ack_tears_connection_down() {
        let mgr = manager();
        let (tx, rx) = mgr.outbound_channel();
        drop(rx);
        let Ok(conn) = mgr.on_connect(poll("p1"), tx).await else {
            panic!("lost ack rejected the handshake");
        };

        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(mgr.connection_count().await, 0);
        assert_eq!(mgr.stats().await.total, 0);
        assert!(conn.topics().is_empty());
    }

    #[tokio::test]
    async fn echo_wraps_message_with_timestamp() {
        let mgr = manager();
        let (conn, mut rx) = connect(&mgr, TopicKey::AllTopics).await;
        let _ack = rx.recv().await;

        assert!(mgr.on_message(&conn, "hello").await.is_ok());
        let echo = json(rx.recv().await);
        assert_eq!(echo["type"], "MESSAGE_ECHO");
        assert_eq!(echo["message"], "hello");
        assert!(echo["timestamp"].is_string());
        assert_eq!(mgr.registry().snapshot().await.total, 1);
    }

    #[tokio::test]
    async fn disconnect_purges_and_closes() {
        let mgr = manager();
        let (conn, _rx) = connect(&mgr, poll("p1")).await;

        mgr.on_disconnect(&conn).await;
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(mgr.connection_count().await, 0);
        assert!(!mgr.registry().contains_topic(&poll("p1")).await);

        // Second cleanup is a no-op.
        mgr.on_disconnect(&conn).await;
        mgr.on_error(&conn, &"late error").await;
        assert_eq!(mgr.connection_count().await, 0);
    }

    #[tokio::test]
    async fn shutdown_closes_everything_and_rejects_new() {
        let mgr = manager();
        let (a, _ra) = connect(&mgr, poll("p1")).await;
        let (b, _rb) = connect(&mgr, TopicKey::AllTopics).await;

        assert_eq!(mgr.shutdown().await, 2);
        assert_eq!(a.state(), ConnectionState::Closed);
        assert_eq!(b.state(), ConnectionState::Closed);
        assert!(mgr.registry().topic_keys().await.is_empty());
        assert!(!mgr.is_accepting());

        let (tx, _rx) = mgr.outbound_channel();
        let rejected = mgr.on_connect(poll("p2"), tx).await;
        assert_eq!(rejected.err(), Some(HandshakeError::ShuttingDown));
    }

    #[tokio::test]
    async fn stats_reports_counts() {
        let mgr = manager();
        let (_a, _ra) = connect(&mgr, poll("p1")).await;
        let (_b, _rb) = connect(&mgr, poll("p1")).await;
        let (_c, _rc) = connect(&mgr, TopicKey::AllTopics).await;

        let stats = mgr.stats().await;
        assert_eq!(stats.topics.get("p1"), Some(&2));
        assert_eq!(stats.topics.get("*"), Some(&1));
        assert_eq!(stats.total, 3);
    }
}
