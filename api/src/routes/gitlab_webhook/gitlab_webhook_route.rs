use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use git_context_engine::{MERGE_REQUEST_HOOK, MergeRequestWebhook, build_pull_request};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::{AppError, AppResult},
    routes::gitlab_webhook::gitlab_webhook_response::{GitLabWebhookResponse, IgnoredResponse},
};

pub const GITLAB_EVENT_HEADER: &str = "X-Gitlab-Event";
pub const GITLAB_TOKEN_HEADER: &str = "X-Gitlab-Token";

fn ignored(reason: &'static str) -> Response {
    ApiResponse::success(IgnoredResponse::because(reason))
        .into_response_with_status(StatusCode::ACCEPTED)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

/// POST /webhooks/gitlab
///
/// Receives a GitLab "Merge Request Hook", builds the pull request from the
/// GitLab API and creates or updates its Slack message.
/// Hooks that carry nothing to notify are acknowledged with 202 so GitLab
/// does not retry them.
#[instrument(name = "gitlab_webhook_route", skip(state, headers, body))]
pub async fn gitlab_webhook_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let event = header(&headers, GITLAB_EVENT_HEADER).unwrap_or_default();
    if event != MERGE_REQUEST_HOOK {
        warn!(event, "ignoring unsupported GitLab event");
        return Ok(ignored("unsupported event"));
    }

    let token = header(&headers, GITLAB_TOKEN_HEADER).unwrap_or_default();
    if token != state.config.gitlab_webhook_secret {
        return Err(AppError::Unauthorized(GITLAB_TOKEN_HEADER));
    }

    let hook: MergeRequestWebhook = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid merge request hook: {e}")))?;
    let repository_id = hook.repository_id();
    let pull_request_id = hook.iid();

    if hook.lifecycle_state().is_none() {
        debug!(
            repository_id,
            pull_request_id,
            state = %hook.object_attributes.state,
            "ignoring merge request state"
        );
        return Ok(ignored("unsupported state"));
    }

    let channel = match state.notifier.store().get_channel(repository_id) {
        Ok(Some(channel)) => channel,
        Ok(None) => match &state.config.slack_default_channel {
            Some(channel) => channel.clone(),
            None => {
                warn!(repository_id, "no Slack channel configured for repository");
                return Ok(ignored("no channel configured"));
            }
        },
        Err(e) => return Err(chat_notifier::NotifierError::from(e).into()),
    };

    let _guard = state.locks.acquire(repository_id, pull_request_id).await;
    debug!(repository_id, pull_request_id, %channel, "delivery lock acquired");

    let pr = build_pull_request(&state.gitlab, &hook).await.map_err(|e| {
        error!(repository_id, pull_request_id, error = %e, "pull request build failed");
        AppError::from(e)
    })?;

    let outcome = state.notifier.notify(&channel, &pr).await.map_err(|e| {
        error!(repository_id, pull_request_id, error = %e, "notification delivery failed");
        AppError::from(e)
    })?;

    info!(
        repository_id,
        pull_request_id,
        state = pr.state().as_str(),
        ?outcome,
        "webhook delivered"
    );

    Ok(ApiResponse::success(GitLabWebhookResponse {
        repository_id,
        pull_request_id,
        state: pr.state(),
        outcome,
    })
    .into_response_with_status(StatusCode::OK))
}
