use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    response::{IntoResponse, Response},
};
use git_context_engine::{
    GitContextEngineError,
    errors::{ProviderError, RemoteResource},
};
use tracing::{info, instrument};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::slack::{
        slack_interactivity_route::verify_token,
        slack_request::{SlashCommandForm, SlashCommandReply},
    },
};

const USAGE: &str = "Usage: pass a GitLab project id or `group/project` path to notify this channel about its merge requests.";

/// POST /slack/command
///
/// Maps a GitLab project to the channel the command was typed in.
/// Slack renders any 200 body as the reply, so user mistakes are answered
/// with 200 and an ephemeral text.
#[instrument(name = "slack_command_route", skip_all)]
pub async fn slack_command_route(
    State(state): State<Arc<AppState>>,
    form: Result<Form<SlashCommandForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(command) = form?;
    verify_token(&state, Some(command.token.as_str()))?;

    let project_ref = command.text.trim();
    if project_ref.is_empty() {
        return Ok(reply(USAGE));
    }

    let project = match state.gitlab.get_project(project_ref).await {
        Ok(project) => project,
        Err(GitContextEngineError::RemoteFetch {
            resource: RemoteResource::Project,
            cause: ProviderError::NotFound,
        }) => {
            return Ok(reply(format!(
                "GitLab project `{project_ref}` was not found for the configured token."
            )));
        }
        Err(e) => return Err(e.into()),
    };

    state
        .notifier
        .store()
        .set_channel(project.id, &command.channel_id, &project.name)
        .map_err(|e| AppError::from(chat_notifier::NotifierError::from(e)))?;

    info!(
        repository_id = project.id,
        channel = %command.channel_id,
        user = command.user_id.as_deref().unwrap_or_default(),
        "repository mapped to channel"
    );
    Ok(reply(format!(
        "Merge requests of *{}* will be posted to this channel.",
        project.name
    )))
}

fn reply(text: impl Into<String>) -> Response {
    Json(SlashCommandReply::ephemeral(text)).into_response()
}

#[cfg(test)]
mod tests {
    use crate::test_support::{TestApp, VERIFICATION_TOKEN};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    async fn command(app: &TestApp, token: &str, text: &str) -> (StatusCode, Value) {
        let (status, body) = app
            .post_form(
                "/slack/command",
                &[
                    ("token", token),
                    ("command", "/mr-notify"),
                    ("channel_id", "CTEAM"),
                    ("user_id", "U1"),
                    ("text", text),
                ],
            )
            .await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn maps_project_to_channel() {
        let app = TestApp::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/acme%2Fwidgets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 42, "name": "widgets", "web_url": "https://gitlab.test/acme/widgets"
            })))
            .expect(1)
            .mount(&app.gitlab)
            .await;

        let (status, body) = command(&app, VERIFICATION_TOKEN, " acme/widgets ").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response_type"], "ephemeral");
        assert!(body["text"].as_str().unwrap().contains("*widgets*"));
        assert_eq!(
            app.state.notifier.store().get_channel(42).unwrap().as_deref(),
            Some("CTEAM")
        );
    }

    #[tokio::test]
    async fn empty_text_gets_usage() {
        let app = TestApp::start().await;
        let (status, body) = command(&app, VERIFICATION_TOKEN, "  ").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["text"].as_str().unwrap().starts_with("Usage:"));
    }

    #[tokio::test]
    async fn unknown_project_is_reported_to_the_user() {
        let app = TestApp::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&app.gitlab)
            .await;

        let (status, body) = command(&app, VERIFICATION_TOKEN, "999").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["text"].as_str().unwrap().contains("not found"));
        assert!(app.state.notifier.store().get_channel(999).unwrap().is_none());
    }

    #[tokio::test]
    async fn gitlab_outage_is_bad_gateway() {
        let app = TestApp::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&app.gitlab)
            .await;

        let (status, body) = command(&app, VERIFICATION_TOKEN, "42").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "REMOTE_FETCH_FAILED");
    }

    #[tokio::test]
    async fn wrong_token_is_unauthorized() {
        let app = TestApp::start().await;
        let (status, _) = command(&app, "forged", "42").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
