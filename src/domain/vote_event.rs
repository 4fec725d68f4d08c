//! The single event consumed from the persistence layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::PollId;

/// Current vote count of one poll option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    /// Option identifier as assigned by the persistence layer.
    pub id: String,
    /// Option label.
    pub text: String,
    /// Votes recorded for this option after the commit.
    pub vote_count: u64,
}

/// Emitted by the persistence layer after a vote transaction commits.
///
/// Carries the full tally of the poll so a client never has to merge
/// deltas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteCommitted {
    /// Poll the vote was cast on.
    pub poll_id: PollId,
    /// Resulting counts for every option of the poll.
    pub options: Vec<OptionTally>,
}

impl VoteCommitted {
    /// Sum of all option counts.
    #[must_use]
    pub fn total_votes(&self) -> u64 {
        self.options
            .iter()
            .fold(0_u64, |acc, option| acc.saturating_add(option.vote_count))
    }
}
