//! Topic key → subscriber set mapping.
//!
//! [`TopicRegistry`] is the single shared mutable structure of the fan-out
//! path. A topic entry exists exactly while its subscriber set is non-empty:
//! entries are created by the first `subscribe` and pruned by the
//! `unsubscribe` that empties them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use super::{Connection, ConnectionId, TopicKey};

type SubscriberSet = HashMap<ConnectionId, Weak<Connection>>;

/// Per-topic connection counts at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    /// Registered connections keyed by topic label (`*` for all-topics).
    pub topics: BTreeMap<String, usize>,
    /// Sum over all topics.
    pub total: usize,
}

/// Registry of subscribers per [`TopicKey`].
///
/// # Concurrency
///
/// One `RwLock` guards the whole mapping. Reads return owned snapshots so
/// callers never deliver while holding the guard. Each [`Connection`] keeps
/// the set of keys it is registered under, updated under the write guard,
/// so [`TopicRegistry::unsubscribe_all`] touches only that connection's
/// topics.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: RwLock<HashMap<TopicKey, SubscriberSet>>,
}

impl TopicRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `connection` to the subscriber set for `topic`, creating the
    /// entry if absent.
    ///
    /// Returns `false` if the connection was already subscribed.
    pub async fn subscribe(&self, topic: TopicKey, connection: &Arc<Connection>) -> bool {
        let mut map = self.topics.write().await;
        let subscribers = map.entry(topic.clone()).or_default();
        let inserted = subscribers
            .insert(connection.id(), Arc::downgrade(connection))
            .is_none();
        if inserted {
            connection.track_topic(topic);
        }
        inserted
    }

    /// Removes `connection` from `topic`, pruning the entry if it becomes
    /// empty. No-op if the connection was not subscribed.
    pub async fn unsubscribe(&self, topic: &TopicKey, connection: &Connection) -> bool {
        let mut map = self.topics.write().await;
        let removed = remove_from(&mut map, topic, connection.id());
        connection.untrack_topic(topic);
        removed
    }

    /// Removes `connection` from every topic it belongs to.
    ///
    /// Returns the number of topic sets it was removed from.
    pub async fn unsubscribe_all(&self, connection: &Connection) -> usize {
        let mut map = self.topics.write().await;
        let mut removed = 0;
        for topic in connection.take_topics() {
            if remove_from(&mut map, &topic, connection.id()) {
                removed += 1;
            }
        }
        removed
    }

    /// Returns the live subscribers of `topic`; empty if the key is unknown.
    pub async fn subscribers_of(&self, topic: &TopicKey) -> Vec<Arc<Connection>> {
        let map = self.topics.read().await;
        map.get(topic)
            .map(|subscribers| subscribers.values().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    /// Returns the union of the subscribers of `topic` and of
    /// [`TopicKey::AllTopics`], deduplicated by connection identity, taken
    /// under a single read guard.
    pub async fn delivery_set(&self, topic: &TopicKey) -> Vec<Arc<Connection>> {
        let map = self.topics.read().await;
        let all_topics = TopicKey::AllTopics;
        let mut recipients: HashMap<ConnectionId, Arc<Connection>> = HashMap::new();
        for key in [topic, &all_topics] {
            let Some(subscribers) = map.get(key) else {
                continue;
            };
            for (id, weak) in subscribers {
                if recipients.contains_key(id) {
                    continue;
                }
                if let Some(connection) = weak.upgrade() {
                    recipients.insert(*id, connection);
                }
            }
        }
        recipients.into_values().collect()
    }

    /// Returns `true` if `topic` currently has an entry.
    pub async fn contains_topic(&self, topic: &TopicKey) -> bool {
        self.topics.read().await.contains_key(topic)
    }

    /// Returns all topic keys currently present.
    pub async fn topic_keys(&self) -> Vec<TopicKey> {
        self.topics.read().await.keys().cloned().collect()
    }

    /// Returns per-topic subscriber counts and their total.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        let map = self.topics.read().await;
        let topics: BTreeMap<String, usize> = map
            .iter()
            .map(|(key, subscribers)| (key.to_string(), subscribers.len()))
            .collect();
        let total = topics.values().sum();
        RegistrySnapshot { topics, total }
    }
}

fn remove_from(
    map: &mut HashMap<TopicKey, SubscriberSet>,
    topic: &TopicKey,
    id: ConnectionId,
) -> bool {
    let Some(subscribers) = map.get_mut(topic) else {
        return false;
    };
    let removed = subscribers.remove(&id).is_some();
    if subscribers.is_empty() {
        map.remove(topic);
    }
    removed
}
