//! Validated poll identifier.
//!
//! [`PollId`] is a newtype over the identifier string the persistence layer
//! assigns to a poll. Validation happens once at the edge (handshake query
//! or event ingress) so everything past it can treat the value as trusted.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::HandshakeError;

/// Maximum accepted identifier length in characters.
pub const MAX_POLL_ID_LEN: usize = 128;

/// Identifier of a single poll.
///
/// Accepts 1 to [`MAX_POLL_ID_LEN`] ASCII alphanumerics, `-` or `_`, which
/// covers UUIDs, cuids and numeric keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PollId(String);

impl PollId {
    /// Validates and wraps a raw identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`HandshakeError`] if the value is empty, too long, or
    /// contains a character outside `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self, HandshakeError> {
        if raw.is_empty() {
            return Err(HandshakeError::EmptyPollId);
        }
        if raw.chars().count() > MAX_POLL_ID_LEN {
            return Err(HandshakeError::PollIdTooLong {
                max: MAX_POLL_ID_LEN,
            });
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(HandshakeError::InvalidPollIdCharacter(bad));
        }
        Ok(Self(raw.to_string()))
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PollId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
