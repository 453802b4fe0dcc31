use std::time::Duration;

use thiserror::Error;

use crate::queue::QueueError;
use crate::repository::RepoError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Failures from the external API clients.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("client misconfigured: {0}")]
    Config(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    #[error("daily quota exhausted (needed {cost} units)")]
    QuotaExhausted { cost: u32 },
    #[error("unauthorized")]
    Unauthorized,
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Parse(String),
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}

/// Result of a single logical call against an external API.
///
/// Expected conditions get their own variants so callers branch on them
/// instead of inspecting errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    Success(T),
    NotFound,
    RateLimited { retry_after: Duration },
    QuotaExhausted { cost: u32 },
    Failed(ApiError),
}

impl<T> CallOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallOutcome<U> {
        match self {
            CallOutcome::Success(value) => CallOutcome::Success(f(value)),
            CallOutcome::NotFound => CallOutcome::NotFound,
            CallOutcome::RateLimited { retry_after } => CallOutcome::RateLimited { retry_after },
            CallOutcome::QuotaExhausted { cost } => CallOutcome::QuotaExhausted { cost },
            CallOutcome::Failed(err) => CallOutcome::Failed(err),
        }
    }

    /// Not-found becomes `Ok(None)`; throttling and failures become errors.
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        match self {
            CallOutcome::Success(value) => Ok(Some(value)),
            CallOutcome::NotFound => Ok(None),
            CallOutcome::RateLimited { retry_after } => Err(ApiError::RateLimited { retry_after }),
            CallOutcome::QuotaExhausted { cost } => Err(ApiError::QuotaExhausted { cost }),
            CallOutcome::Failed(err) => Err(err),
        }
    }
}

/// Errors surfaced by orchestration entry points that callers must act on.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Repository(#[from] RepoError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("artist {0} not found")]
    ArtistNotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
}

impl ServiceError {
    /// Quota or rate-limit rejection; the same work can succeed later.
    pub fn is_throttled(&self) -> bool {
        matches!(
            self,
            ServiceError::Api(ApiError::QuotaExhausted { .. } | ApiError::RateLimited { .. })
        )
    }
}
