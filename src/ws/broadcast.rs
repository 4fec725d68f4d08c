//! Fan-out of update events to subscribed connections.
//!
//! [`Broadcaster`] snapshots the delivery set from the [`TopicRegistry`]
//! under its read guard, releases it, and only then sends. A recipient whose
//! send fails is torn down through [`SubscriptionManager::on_error`]; the
//! remaining recipients are unaffected and the caller never sees the
//! failure.
//!
//! [`TopicRegistry`]: crate::domain::TopicRegistry

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use utoipa::ToSchema;

use super::messages::Stamped;
use super::subscription::SubscriptionManager;
use crate::domain::{Connection, Payload, TopicKey};
use crate::error::SendError;

/// Outcome of one publish, for logging and introspection only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PublishReport {
    /// Size of the computed delivery set.
    pub recipients: usize,
    /// Connections the payload was queued on.
    pub delivered: usize,
    /// Connections found dead and torn down.
    pub dropped: usize,
}

/// Best-effort multicast of events to topic subscribers.
///
/// Cheap to clone; command handlers receive one at construction instead of
/// reaching for shared global state.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    manager: Arc<SubscriptionManager>,
    /// Serializes delivery passes so two publishes reaching the same
    /// connection are queued in call order.
    ///
    /// Shared across topics: a recipient whose queue is full holds up the
    /// next pass, for any topic, for at most one send timeout before it is
    /// declared dead.
    delivery: Arc<Mutex<()>>,
}

impl Broadcaster {
    /// Creates a broadcaster delivering to connections owned by `manager`.
    #[must_use]
    pub fn new(manager: Arc<SubscriptionManager>) -> Self {
        Self {
            manager,
            delivery: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the subscription manager recipients are looked up in.
    #[must_use]
    pub fn manager(&self) -> &Arc<SubscriptionManager> {
        &self.manager
    }

    /// Serializes `event` merged with a delivery timestamp and sends it to
    /// every subscriber of `topic` and of the all-topics key.
    ///
    /// A connection subscribed under both keys receives one copy. An event
    /// that fails to serialize is logged and dropped.
    pub async fn publish<E: Serialize>(&self, topic: &TopicKey, event: &E) -> PublishReport {
        match serde_json::to_string(&Stamped::now(event)) {
            Ok(json) => self.publish_payload(topic, Payload::from(json)).await,
            Err(e) => {
                tracing::warn!(%topic, error = %e, "failed to serialize event");
                PublishReport::default()
            }
        }
    }

    /// Sends an already-serialized payload to the delivery set of `topic`.
    pub async fn publish_payload(&self, topic: &TopicKey, payload: Payload) -> PublishReport {
        let dead: Vec<(Arc<Connection>, SendError)>;
        let recipients;
        {
            let _pass = self.delivery.lock().await;
            let targets = self.manager.registry().delivery_set(topic).await;
            recipients = targets.len();

            let results = join_all(
                targets
                    .iter()
                    .map(|connection| connection.send(Arc::clone(&payload))),
            )
            .await;

            dead = targets
                .into_iter()
                .zip(results)
                .filter_map(|(connection, result)| result.err().map(|e| (connection, e)))
                .collect();
        }

        for (connection, err) in &dead {
            self.manager.on_error(connection, err).await;
        }

        let report = PublishReport {
            recipients,
            delivered: recipients.saturating_sub(dead.len()),
            dropped: dead.len(),
        };
        tracing::debug!(
            %topic,
            recipients = report.recipients,
            delivered = report.delivered,
            dropped = report.dropped,
            "broadcast event"
        );
        report
    }
}
