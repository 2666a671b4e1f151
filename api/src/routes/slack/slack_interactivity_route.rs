use std::sync::Arc;

use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chat_notifier::{APPROVE_ACTION_ID, parse_approve_value};
use git_context_engine::ChangeRequestId;
use tracing::{info, instrument, warn};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::slack::slack_request::{InteractionPayload, InteractivityForm},
};

/// Payload token must equal the configured verification token.
pub(crate) fn verify_token(state: &AppState, token: Option<&str>) -> AppResult<()> {
    match (&state.config.slack_verification_token, token) {
        (Some(expected), Some(got)) if expected == got => Ok(()),
        _ => Err(AppError::Unauthorized("token")),
    }
}

/// POST /slack/interactivity
///
/// Handles the "Approve this" button of opened pull request messages.
#[instrument(name = "slack_interactivity_route", skip_all)]
pub async fn slack_interactivity_route(
    State(state): State<Arc<AppState>>,
    form: Result<Form<InteractivityForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(form) = form?;
    let payload: InteractionPayload = serde_json::from_str(&form.payload)
        .map_err(|e| AppError::BadRequest(format!("invalid interaction payload: {e}")))?;
    verify_token(&state, payload.token.as_deref())?;

    let approve = payload
        .actions
        .iter()
        .find(|a| a.action_id == APPROVE_ACTION_ID);
    let Some(action) = approve.filter(|_| payload.kind == "block_actions") else {
        warn!(kind = %payload.kind, "unhandled Slack interaction");
        return Ok(StatusCode::OK.into_response());
    };

    let value = action.value.as_deref().unwrap_or_default();
    let (repository_id, pull_request_id) = parse_approve_value(value)
        .ok_or_else(|| AppError::BadRequest(format!("invalid approve value: {value:?}")))?;

    state
        .gitlab
        .approve(&ChangeRequestId::new(repository_id.to_string(), pull_request_id))
        .await?;

    info!(
        repository_id,
        pull_request_id,
        user = payload
            .user
            .as_ref()
            .map(|u| u.username.as_deref().unwrap_or(&u.id))
            .unwrap_or_default(),
        "merge request approved from Slack"
    );
    Ok(StatusCode::OK.into_response())
}
