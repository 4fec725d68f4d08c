//! A single live client connection, the unit of delivery and failure.
//!
//! [`Connection`] is transport-agnostic: its transport handle is the
//! sending half of a bounded queue drained by the socket writer task (see
//! [`crate::ws::connection`]). One queue per connection keeps delivery FIFO
//! for that connection.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use super::TopicKey;
use crate::error::SendError;

/// Serialized message ready to be written to a socket. Shared between all
/// recipients of one publish.
pub type Payload = Arc<str>;

/// Opaque identity of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Liveness of a connection.
///
/// `Open → Closed` is the only transition. It happens on explicit close,
/// a failed or timed out send, or a transport close/error event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Deliverable.
    Open,
    /// Terminal; the transport handle has been released.
    Closed,
}

/// One live duplex channel to a client.
///
/// Owned by the [`crate::ws::SubscriptionManager`]; the
/// [`super::TopicRegistry`] only keeps weak references to it.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    topic: TopicKey,
    opened_at: DateTime<Utc>,
    send_timeout: Duration,
    state: watch::Sender<ConnectionState>,
    outbound: Mutex<Option<mpsc::Sender<Payload>>>,
    /// Topic keys this connection is registered under. Maintained by the
    /// registry while it holds its write guard.
    topics: Mutex<HashSet<TopicKey>>,
}

impl Connection {
    /// Wraps a transport handle in a new `Open` connection bound to `topic`.
    ///
    /// `send_timeout` bounds how long [`Connection::send`] waits for room in
    /// the outbound queue.
    #[must_use]
    pub fn open(topic: TopicKey, outbound: mpsc::Sender<Payload>, send_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Open);
        Self {
            id: ConnectionId::new(),
            topic,
            opened_at: Utc::now(),
            send_timeout,
            state,
            outbound: Mutex::new(Some(outbound)),
            topics: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the connection identity.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the topic chosen at handshake time.
    #[must_use]
    pub const fn topic(&self) -> &TopicKey {
        &self.topic
    }

    /// Returns when the connection was opened.
    #[must_use]
    pub const fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Returns the current liveness state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns `true` while the connection is `Open`.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Returns a receiver that observes state transitions, used by the
    /// socket loops to stop when the connection is closed elsewhere.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Queues `payload` for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Dead`] if the connection is not `Open`, the
    /// transport has gone away, or the outbound queue stayed full for
    /// longer than the send timeout. The latter two also close the
    /// connection.
    pub async fn send(&self, payload: Payload) -> Result<(), SendError> {
        let Some(outbound) = self.sender() else {
            return Err(SendError::Dead);
        };
        if outbound
            .send_timeout(payload, self.send_timeout)
            .await
            .is_err()
        {
            self.close();
            return Err(SendError::Dead);
        }
        Ok(())
    }

    /// Transitions to `Closed` and releases the transport handle.
    ///
    /// Idempotent. Returns `true` only for the call that performed the
    /// transition.
    pub fn close(&self) -> bool {
        let transitioned = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Closed {
                false
            } else {
                *state = ConnectionState::Closed;
                true
            }
        });
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        transitioned
    }

    /// Snapshot of the topic keys this connection is registered under.
    #[must_use]
    pub fn topics(&self) -> HashSet<TopicKey> {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn track_topic(&self, topic: TopicKey) -> bool {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(topic)
    }

    pub(crate) fn untrack_topic(&self, topic: &TopicKey) -> bool {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(topic)
    }

    pub(crate) fn take_topics(&self) -> HashSet<TopicKey> {
        std::mem::take(&mut *self.topics.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn sender(&self) -> Option<mpsc::Sender<Payload>> {
        if !self.is_open() {
            return None;
        }
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
