//! Keys partitioning the broadcast space.

use std::fmt;

use super::PollId;

/// Label used for [`TopicKey::AllTopics`] in introspection output.
///
/// `*` is not a valid [`PollId`] character, so the label never collides
/// with a poll's own entry.
pub const ALL_TOPICS_LABEL: &str = "*";

/// A topic a connection can be subscribed to.
///
/// Connections that name a poll at handshake time listen on
/// [`TopicKey::Poll`]; connections that name none listen on
/// [`TopicKey::AllTopics`] and receive every poll's updates. The
/// all-topics key is its own variant, so no poll identifier can alias it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopicKey {
    /// Updates for one poll.
    Poll(PollId),
    /// Updates for every poll.
    AllTopics,
}

impl TopicKey {
    /// Returns the poll identifier, or `None` for the all-topics key.
    #[must_use]
    pub const fn poll_id(&self) -> Option<&PollId> {
        match self {
            Self::Poll(id) => Some(id),
            Self::AllTopics => None,
        }
    }
}

impl From<PollId> for TopicKey {
    fn from(id: PollId) -> Self {
        Self::Poll(id)
    }
}

impl From<Option<PollId>> for TopicKey {
    fn from(id: Option<PollId>) -> Self {
        id.map_or(Self::AllTopics, Self::Poll)
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poll(id) => write!(f, "{id}"),
            Self::AllTopics => f.write_str(ALL_TOPICS_LABEL),
        }
    }
}
