//! Error types for vote ingestion and event framing.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Reasons a vote is rejected before it changes any state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoteError {
    /// The request body could not be decoded.
    #[error("malformed vote body: {0}")]
    Decode(String),

    /// A required field was present but empty.
    #[error("invalid vote: {0} must not be empty")]
    InvalidVote(&'static str),

    /// Tally mode only: this voter has already cast their vote.
    #[error("voter {0:?} has already voted")]
    DuplicateVoter(String),
}

impl VoteError {
    /// HTTP status the caller sees for this rejection.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::InvalidVote(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateVoter(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for VoteError {
    fn into_response(self) -> Response {
        let body = match self {
            Self::Decode(_) | Self::InvalidVote(_) => "Invalid vote data",
            Self::DuplicateVoter(_) => "Voter has already voted",
        };
        (self.status(), body).into_response()
    }
}

/// Failure to turn a snapshot into an outbound payload.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("failed to serialize {kind} event: {source}")]
    Serialization {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A write to a live connection failed. The connection is pruned either way.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The socket side has gone away.
    #[error("connection {0} is closed")]
    Closed(u64),

    /// The subscriber stopped reading and its outbound buffer is full.
    #[error("connection {0} is not keeping up")]
    Backlogged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            VoteError::Decode("eof".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VoteError::InvalidVote("voter").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VoteError::DuplicateVoter("a".to_string()).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            VoteError::InvalidVote("voter").to_string(),
            "invalid vote: voter must not be empty"
        );
    }
}
