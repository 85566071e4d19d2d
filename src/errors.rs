use reqwest::StatusCode;
use thiserror::Error;

use crate::models::PhotoId;

/// Failures talking to the remote photo service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),
}

impl ClientError {
    /// Build an error from a non-success response, preferring the server's
    /// own `message` (or `error`) field over the status text.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .or_else(|| value.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_owned()
            });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(message),
            _ => ClientError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

/// Failures of feed store operations.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("photo {0} is not loaded")]
    UnknownPhoto(PhotoId),

    #[error("a like for photo {0} is still in flight")]
    LikePending(PhotoId),

    #[error("{0}")]
    Validation(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("request timed out")]
    Timeout,

    #[error("page was replaced before the request completed")]
    Stale,

    #[error("request task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}
