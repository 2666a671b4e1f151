use axum::{
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chat_notifier::NotifierError;
use git_context_engine::GitContextEngineError;
use thiserror::Error;
use tracing::{error, warn};

use crate::core::app_state::ConfigError;
use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error(transparent)]
    Config(#[from] ConfigError),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    // --- Pipeline ---
    #[error(transparent)]
    Engine(#[from] GitContextEngineError),

    #[error(transparent)]
    Notifier(#[from] NotifierError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Bind(_) | AppError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            AppError::Engine(e) => match e {
                GitContextEngineError::RemoteFetch { .. } | GitContextEngineError::Provider(_) => {
                    StatusCode::BAD_GATEWAY
                }
                GitContextEngineError::MalformedDiff(_)
                | GitContextEngineError::InvalidTimestamp(_)
                | GitContextEngineError::IncompleteResource { .. }
                | GitContextEngineError::UnsupportedState(_) => StatusCode::UNPROCESSABLE_ENTITY,
                GitContextEngineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },

            AppError::Notifier(e) => match e {
                NotifierError::Delivery(_) => StatusCode::BAD_GATEWAY,
                NotifierError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                NotifierError::PointerConflict { .. } => StatusCode::CONFLICT,
            },
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",

            AppError::Engine(e) => match e {
                GitContextEngineError::RemoteFetch { .. } | GitContextEngineError::Provider(_) => {
                    "REMOTE_FETCH_FAILED"
                }
                GitContextEngineError::MalformedDiff(_) => "MALFORMED_DIFF",
                GitContextEngineError::InvalidTimestamp(_)
                | GitContextEngineError::IncompleteResource { .. } => "INVALID_MERGE_REQUEST",
                GitContextEngineError::UnsupportedState(_) => "UNSUPPORTED_STATE",
                GitContextEngineError::Config(_) => "CONFIG_ERROR",
            },

            AppError::Notifier(e) => match e {
                NotifierError::Delivery(_) => "DELIVERY_FAILED",
                NotifierError::Store(_) => "STORE_ERROR",
                NotifierError::PointerConflict { .. } => "POINTER_CONFLICT",
            },
        }
    }

    fn details(&self) -> Vec<ApiErrorDetail> {
        match self {
            AppError::Engine(GitContextEngineError::RemoteFetch { resource, cause }) => {
                vec![ApiErrorDetail::at(format!("gitlab.{resource}"), cause.to_string())]
            }
            AppError::Engine(GitContextEngineError::IncompleteResource { resource, field }) => {
                vec![ApiErrorDetail::at(
                    format!("gitlab.{resource}.{field}"),
                    "field is required for this state",
                )]
            }
            AppError::Unauthorized(header) => {
                vec![ApiErrorDetail::at(*header, "does not match the configured secret")]
            }
            _ => Vec::new(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        if status.is_server_error() {
            error!(code, error = %self, "request failed");
        } else {
            warn!(code, error = %self, "request rejected");
        }
        ApiResponse::<()>::error(code, self.to_string(), self.details())
            .into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<FormRejection> for AppError {
    fn from(err: FormRejection) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
