pub mod errors;
pub mod git_providers;
pub mod normalize;
pub mod parser;
pub mod patch;
pub mod pull_request;
pub mod webhook;

use tracing::{debug, info};

pub use crate::{
    errors::{GitContextEngineError, GitContextEngineResult},
    git_providers::{ChangeRequestId, GitLabClient, ProviderConfig},
    pull_request::{FileAction, PullRequest, PullRequestFile, PullRequestState},
    webhook::{MERGE_REQUEST_HOOK, MergeRequestWebhook},
};

/// Builds the canonical pull request for one merge request hook delivery.
///
/// The HTTP layer calls this after it has authenticated the hook. Steps:
///   * reject lifecycle states that carry no notification
///   * fetch user, project, merge request, changes and approvals concurrently
///   * normalize the bundle (diff reconstruction, state-dependent fields)
pub async fn build_pull_request(
    client: &GitLabClient,
    webhook: &MergeRequestWebhook,
) -> GitContextEngineResult<PullRequest> {
    let attrs = &webhook.object_attributes;
    if webhook.lifecycle_state().is_none() {
        return Err(GitContextEngineError::UnsupportedState(attrs.state.clone()));
    }

    info!(
        project = attrs.target_project_id,
        iid = attrs.iid,
        state = %attrs.state,
        "build_pull_request started"
    );

    let id = webhook.change_request_id();
    let bundle = client.fetch_all(webhook.author_id(), &id).await?;
    debug!(
        project = %id.project,
        iid = id.iid,
        files = bundle.changes.changes.len(),
        approvals = bundle.approvals.approved_by.len(),
        "bundle fetched from GitLab"
    );

    let pr = normalize::normalize(webhook, &bundle)?;

    info!(
        project = pr.repository_id(),
        iid = pr.external_id(),
        state = pr.state().as_str(),
        files = pr.changes().len(),
        "pull request built"
    );

    Ok(pr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hook(state: &str) -> MergeRequestWebhook {
        serde_json::from_value(serde_json::json!({
            "object_kind": "merge_request",
            "object_attributes": {
                "iid": 5, "target_project_id": 9, "author_id": 1,
                "state": state, "title": "Bump deps",
                "url": "https://gitlab.test/g/p/-/merge_requests/5"
            }
        }))
        .unwrap()
    }

    async fn mount(server: &MockServer, route: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn builds_merged_pull_request_end_to_end() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/users/1",
            serde_json::json!({"id": 1, "name": "Ada", "web_url": "https://gitlab.test/ada"}),
        )
        .await;
        mount(
            &server,
            "/projects/9",
            serde_json::json!({"id": 9, "name": "p", "web_url": "https://gitlab.test/g/p"}),
        )
        .await;
        mount(
            &server,
            "/projects/9/merge_requests/5",
            serde_json::json!({
                "iid": 5, "state": "merged",
                "created_at": "2024-05-01T08:00:00Z",
                "merged_at": "2024-05-01T08:02:05Z",
                "merged_by": {"name": "Bob"}
            }),
        )
        .await;
        mount(
            &server,
            "/projects/9/merge_requests/5/changes",
            serde_json::json!({"changes": [{
                "old_path": "Cargo.toml", "new_path": "Cargo.toml",
                "diff": "@@ -1 +1 @@\n-a = 1\n+a = 2\n",
                "new_file": false, "deleted_file": false, "renamed_file": false
            }]}),
        )
        .await;
        mount(
            &server,
            "/projects/9/merge_requests/5/approvals",
            serde_json::json!({"approved_by": [{"user": {"name": "Eve"}}]}),
        )
        .await;

        let client = GitLabClient::new(
            reqwest::Client::new(),
            server.uri(),
            "t".into(),
            Duration::from_secs(2),
        );
        let pr = build_pull_request(&client, &hook("merged")).await.unwrap();

        assert_eq!(pr.state(), PullRequestState::Merged);
        assert_eq!(pr.merged_by(), Some("Bob"));
        assert_eq!(pr.time_to_merge_seconds(), Some(125));
        assert_eq!(pr.approvals(), ["Eve"]);
        assert_eq!(pr.changes()[0].action(), FileAction::Changed);
    }

    #[tokio::test]
    async fn unsupported_state_makes_no_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = GitLabClient::new(
            reqwest::Client::new(),
            server.uri(),
            "t".into(),
            Duration::from_secs(2),
        );
        let err = build_pull_request(&client, &hook("locked")).await.unwrap_err();
        assert!(matches!(err, GitContextEngineError::UnsupportedState(_)));
    }
}
