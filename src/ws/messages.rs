//! WebSocket wire messages sent from server to client.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{OptionTally, PollId};

/// Server → client message, discriminated by `type`.
///
/// Timestamps are not part of the variants; messages that carry one are
/// wrapped in [`Stamped`] at send time.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Acknowledges a handshake and names the joined topic.
    ConnectionEstablished {
        /// Poll joined, absent for the all-topics feed.
        #[serde(skip_serializing_if = "Option::is_none")]
        topic: Option<PollId>,
        /// Human-readable confirmation.
        message: String,
    },
    /// Liveness probe reply carrying the client's original text.
    MessageEcho {
        /// Text received from the client.
        message: String,
    },
    /// Fresh vote counts for a poll.
    VoteUpdate {
        /// Poll the counts belong to.
        #[serde(rename = "pollId")]
        poll_id: PollId,
        /// Count per option.
        options: Vec<OptionTally>,
    },
}

impl ServerMessage {
    /// Builds the handshake acknowledgment for a connection that joined
    /// `topic` (`None` for all topics).
    #[must_use]
    pub fn connection_established(topic: Option<&PollId>) -> Self {
        let message = match topic {
            Some(_) => "Connected to real-time updates for this poll",
            None => "Connected for general updates",
        };
        Self::ConnectionEstablished {
            topic: topic.cloned(),
            message: message.to_string(),
        }
    }

    /// Returns the message type as a static string slice.
    #[must_use]
    pub const fn type_str(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished { .. } => "CONNECTION_ESTABLISHED",
            Self::MessageEcho { .. } => "MESSAGE_ECHO",
            Self::VoteUpdate { .. } => "VOTE_UPDATE",
        }
    }
}

/// Any serializable message merged with a delivery `timestamp` field.
#[derive(Debug, Serialize)]
pub struct Stamped<'a, E: Serialize> {
    #[serde(flatten)]
    event: &'a E,
    timestamp: DateTime<Utc>,
}

impl<'a, E: Serialize> Stamped<'a, E> {
    /// Wraps `event` with the current time.
    #[must_use]
    pub fn now(event: &'a E) -> Self {
        Self::at(event, Utc::now())
    }

    /// Wraps `event` with an explicit time.
    #[must_use]
    pub const fn at(event: &'a E, timestamp: DateTime<Utc>) -> Self {
        Self { event, timestamp }
    }
}
