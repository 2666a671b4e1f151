//! HTTP surface of the merge request notifier.
//!
//! `POST /webhooks/gitlab` turns GitLab merge request hooks into one Slack
//! message per pull request. The Slack routes (approve button, channel
//! mapping command) are mounted only when a verification token is configured.

pub mod core;
pub mod error_handler;
mod routes;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;
use tracing::{error, info};

pub use crate::core::app_state::{AppConfig, AppState, ConfigError};
pub use crate::error_handler::{AppError, AppResult};

use crate::routes::{
    gitlab_webhook::gitlab_webhook_route::gitlab_webhook_route,
    health_route::health_route,
    slack::{
        slack_command_route::slack_command_route,
        slack_interactivity_route::slack_interactivity_route,
    },
};

/// Builds the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_route))
        .route("/webhooks/gitlab", post(gitlab_webhook_route));

    if state.config.slack_verification_token.is_some() {
        app = app
            .route("/slack/interactivity", post(slack_interactivity_route))
            .route("/slack/command", post(slack_command_route));
    }

    app.with_state(state)
}

pub async fn start(config: AppConfig) -> Result<(), AppError> {
    let address = config.api_address.clone();
    let state = Arc::new(AppState::from_config(config)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(AppError::Bind)?;
    info!(%address, "listening");

    // Graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn health_reports_ok() {
        let app = TestApp::start().await;
        let (status, body) = app.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "data": { "status": "ok" } }));
    }
}
