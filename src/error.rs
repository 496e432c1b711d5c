//! Failure taxonomy for a single query.
//!
//! Every variant except [`QueryError::Remote`] is a transport-level failure:
//! the service never produced a usable answer. `Remote` means a response
//! arrived but its status was not a success.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Connection refused, DNS failure, body read aborted, and the like.
    #[error("{0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    /// Success status, but the body was not a valid answer.
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    /// The awaiting task went away before the call settled.
    #[error("request interrupted before completion")]
    Interrupted,

    #[error("service returned HTTP {status}")]
    Remote { status: u16, detail: Option<String> },
}

impl QueryError {
    pub fn is_transport(&self) -> bool {
        !matches!(self, QueryError::Remote { .. })
    }

    /// Text shown to the user in the failure notice.
    pub fn user_message(&self) -> String {
        match self {
            QueryError::Remote {
                detail: Some(detail),
                ..
            } => format!("Error: {}", detail),
            QueryError::Remote {
                status,
                detail: None,
            } => format!("Error: unknown error (HTTP {})", status),
            other => format!("Query failed: {}", other),
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            QueryError::Timeout
        } else if e.is_decode() {
            QueryError::MalformedBody(e.to_string())
        } else {
            QueryError::Transport(e.to_string())
        }
    }
}
