//! Domain layer: identifiers, connections, and the topic registry.
//!
//! This module holds the transport-agnostic model of the fan-out engine:
//! poll and topic identity, the [`Connection`] delivery handle, the
//! [`TopicRegistry`] mapping topics to subscribers, and the vote event
//! consumed from the persistence layer.

pub mod connection;
pub mod poll_id;
pub mod topic_key;
pub mod topic_registry;
pub mod vote_event;

pub use connection::{Connection, ConnectionId, ConnectionState, Payload};
pub use poll_id::PollId;
pub use topic_key::TopicKey;
pub use topic_registry::{RegistrySnapshot, TopicRegistry};
pub use vote_event::{OptionTally, VoteCommitted};
