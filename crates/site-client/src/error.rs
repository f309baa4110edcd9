use crate::session::EntityKey;
use site_core::ValidationError;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to the site API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Transport(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Timeouts, dropped connections and 5xx responses are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout(_) | ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::NotFound { .. } | ApiError::Decode(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{entity} is still saving")]
    Busy { entity: EntityKey },
    #[error("cancelled")]
    Cancelled,
}

impl MutationError {
    /// Whether a request was attempted and failed, as opposed to being refused locally.
    pub fn reached_server(&self) -> bool {
        matches!(self, MutationError::Api(_))
    }
}
