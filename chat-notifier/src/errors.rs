//! Error hierarchy for chat-notifier.
//!
//! `NotifierError` is what callers of [`crate::Notifier::notify`] see.
//! Transport and API failures are `DeliveryError`; persistence failures are
//! `StoreError`.

use thiserror::Error;

pub type NotifierResult<T> = Result<T, NotifierError>;

#[derive(Debug, Error)]
pub enum NotifierError {
    /// Slack send or update failed.
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// Pointer or channel mapping storage failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A pointer for this pull request was stored concurrently; the message
    /// just sent is orphaned.
    #[error("notification pointer already exists for repository {repository_id} pull request {pull_request_id}")]
    PointerConflict {
        repository_id: u64,
        pull_request_id: u64,
    },
}

/// Slack Web API failure.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Slack answered `ok: false`, e.g. `channel_not_found`, `message_not_found`.
    #[error("slack {method} failed: {error}")]
    Api { method: &'static str, error: String },

    /// Non-2xx status from Slack.
    #[error("slack {method} returned http status {status}")]
    HttpStatus { method: &'static str, status: u16 },

    /// `ok: true` but a field needed for the pointer is missing.
    #[error("slack {method} response missing {field}")]
    MissingField {
        method: &'static str,
        field: &'static str,
    },

    #[error("timeout")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("http client error: {0}")]
    HttpClient(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DeliveryError::Timeout
        } else if e.is_decode() {
            DeliveryError::InvalidResponse(e.to_string())
        } else {
            DeliveryError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Unique key already taken; the caller decides whether that is a conflict.
    #[error("duplicate key for repository {repository_id} pull request {pull_request_id}")]
    Duplicate {
        repository_id: u64,
        pull_request_id: u64,
    },

    #[error("store lock poisoned")]
    Poisoned,
}
