//! In-process app wired to wiremock GitLab and Slack servers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::core::app_state::{AppConfig, AppState};

pub const WEBHOOK_SECRET: &str = "s3cret";
pub const VERIFICATION_TOKEN: &str = "vtok";

pub struct TestApp {
    pub gitlab: MockServer,
    pub slack: MockServer,
    pub state: Arc<AppState>,
    router: Router,
}

pub fn hook_body(state: &str) -> Value {
    json!({
        "object_kind": "merge_request",
        "user": { "name": "Ada", "username": "ada" },
        "project": { "id": 42, "name": "widgets" },
        "object_attributes": {
            "iid": 3, "target_project_id": 42, "author_id": 7,
            "state": state, "title": "Fix parser", "description": "",
            "url": "https://gitlab.test/acme/widgets/-/merge_requests/3"
        }
    })
}

impl TestApp {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let gitlab = MockServer::start().await;
        let slack = MockServer::start().await;
        let mut config = AppConfig {
            api_address: "127.0.0.1:0".into(),
            gitlab_api_base: gitlab.uri(),
            gitlab_token: "glpat".into(),
            gitlab_webhook_secret: WEBHOOK_SECRET.into(),
            gitlab_fetch_timeout: Duration::from_secs(2),
            slack_api_base: slack.uri(),
            slack_bot_token: "xoxb".into(),
            slack_default_channel: Some("CDEFAULT".into()),
            slack_verification_token: Some(VERIFICATION_TOKEN.into()),
            notify_db_path: chat_notifier::IN_MEMORY.into(),
        };
        tweak(&mut config);

        let state = Arc::new(AppState::from_config(config).unwrap());
        let router = crate::router(state.clone());
        Self {
            gitlab,
            slack,
            state,
            router,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn post_hook(
        &self,
        event: Option<&str>,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut request = Request::post("/webhooks/gitlab").header(CONTENT_TYPE, "application/json");
        if let Some(event) = event {
            request = request.header("X-Gitlab-Event", event);
        }
        if let Some(token) = token {
            request = request.header("X-Gitlab-Token", token);
        }
        let request = request.body(Body::from(body.to_string())).unwrap();
        let (status, text) = self.send(request).await;
        (status, serde_json::from_str(&text).unwrap_or(Value::Null))
    }

    /// Form-encoded POST; `fields` are encoded here.
    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> (StatusCode, String) {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let request = Request::post(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let (status, text) = self.send(request).await;
        (status, serde_json::from_str(&text).unwrap_or(Value::Null))
    }

    /// GitLab resources for project 42, merge request 3.
    pub async fn mount_gitlab_merge_request(&self) {
        let routes = [
            (
                "/users/7",
                json!({ "id": 7, "name": "Ada", "web_url": "https://gitlab.test/ada" }),
            ),
            (
                "/projects/42",
                json!({ "id": 42, "name": "widgets", "web_url": "https://gitlab.test/acme/widgets" }),
            ),
            (
                "/projects/42/merge_requests/3",
                json!({
                    "iid": 3, "state": "merged",
                    "created_at": "2024-03-01T10:00:00Z",
                    "merged_at": "2024-03-01T11:01:01Z",
                    "merged_by": { "name": "Mallory" }
                }),
            ),
            (
                "/projects/42/merge_requests/3/changes",
                json!({ "changes": [{
                    "old_path": "src/lib.rs", "new_path": "src/lib.rs",
                    "diff": "@@ -1 +1 @@\n-a\n+b\n",
                    "new_file": false, "deleted_file": false, "renamed_file": false
                }]}),
            ),
            (
                "/projects/42/merge_requests/3/approvals",
                json!({ "approved_by": [{ "user": { "name": "Bob" } }] }),
            ),
        ];
        for (route, body) in routes {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&self.gitlab)
                .await;
        }
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
