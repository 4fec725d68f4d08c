//! DTOs for the vote event ingress endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{OptionTally, PollId, VoteCommitted};
use crate::error::GatewayError;
use crate::ws::PublishReport;

/// Request body for `POST /api/v1/events/vote-committed`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteCommittedRequest {
    /// Poll the vote was committed on.
    pub topic_key: String,
    /// Resulting counts for every option of the poll.
    pub options: Vec<OptionTally>,
}

impl TryFrom<VoteCommittedRequest> for VoteCommitted {
    type Error = GatewayError;

    fn try_from(req: VoteCommittedRequest) -> Result<Self, Self::Error> {
        let poll_id = PollId::parse(&req.topic_key)
            .map_err(|e| GatewayError::InvalidRequest(format!("topicKey: {e}")))?;
        Ok(Self {
            poll_id,
            options: req.options,
        })
    }
}

/// Response body for `POST /api/v1/events/vote-committed` (202 Accepted).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    /// Poll the update was published for.
    #[schema(value_type = String)]
    pub poll_id: PollId,
    /// Outcome of the fan-out.
    #[serde(flatten)]
    pub report: PublishReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(topic_key: &str) -> VoteCommittedRequest {
        VoteCommittedRequest {
            topic_key: topic_key.to_string(),
            options: Vec::new(),
        }
    }

    #[test]
    fn valid_request_converts() {
        let event = VoteCommitted::try_from(request("p1"));
        assert!(event.is_ok());
    }

    #[test]
    fn invalid_topic_key_is_rejected() {
        let result = VoteCommitted::try_from(request("p 1"));
        assert!(matches!(result, Err(GatewayError::InvalidRequest(_))));
    }

    #[test]
    fn request_deserializes_camel_case() {
        let body = r#"{"topicKey":"p1","options":[{"id":"o","text":"T","voteCount":2}]}"#;
        let parsed: Result<VoteCommittedRequest, _> = serde_json::from_str(body);
        assert!(parsed.is_ok_and(|req| req.options.len() == 1 && req.topic_key == "p1"));
    }
}
