//! Vote service: turns committed votes into `VOTE_UPDATE` broadcasts.

use crate::domain::{TopicKey, VoteCommitted};
use crate::ws::{Broadcaster, PublishReport, ServerMessage};

/// Entry point the persistence layer notifies after a vote commits.
///
/// Holds its [`Broadcaster`] explicitly; vote command handlers get a
/// `VoteService` at construction time.
#[derive(Debug, Clone)]
pub struct VoteService {
    broadcaster: Broadcaster,
}

impl VoteService {
    /// Creates a new `VoteService`.
    #[must_use]
    pub fn new(broadcaster: Broadcaster) -> Self {
        Self { broadcaster }
    }

    /// Returns a reference to the inner [`Broadcaster`].
    #[must_use]
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Publishes the resulting tallies of a committed vote to the poll's
    /// subscribers and to every all-topics subscriber.
    ///
    /// Delivery is best-effort; the report is informational.
    pub async fn vote_committed(&self, event: VoteCommitted) -> PublishReport {
        let topic = TopicKey::Poll(event.poll_id.clone());
        let total_votes = event.total_votes();
        let message = ServerMessage::VoteUpdate {
            poll_id: event.poll_id,
            options: event.options,
        };

        let report = self.broadcaster.publish(&topic, &message).await;
        tracing::info!(
            message_type = message.type_str(),
            poll_id = %topic,
            total_votes,
            recipients = report.recipients,
            dropped = report.dropped,
            "vote update broadcast"
        );
        report
    }
}
