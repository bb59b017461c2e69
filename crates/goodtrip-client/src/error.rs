use thiserror::Error;

use crate::planning::TripValidationError;

pub type ClientResult<T> = Result<T, ClientError>;

/// Coarse classification of a failed call, for callers that only need to
/// pick a presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Rejected,
    Decode,
    Validation,
    NotAuthenticated,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response: no connectivity, timeout, TLS.
    #[error("network failure: {message}")]
    Transport { message: String },

    /// The server answered with a non-success status.
    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body didn't match the expected shape.
    #[error("unexpected response body: {message}")]
    Decode { message: String },

    #[error(transparent)]
    Validation(#[from] TripValidationError),

    /// An authenticated call was attempted without an active session.
    #[error("not logged in")]
    NotAuthenticated,

    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Rejected { .. } => ErrorKind::Rejected,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Status code for rejected calls.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::rejected(status.as_u16(), err.to_string())
        } else {
            Self::transport(err.to_string())
        }
    }
}
