//! GitLab "Merge Request Hook" payload (subset).

use serde::{Deserialize, Serialize};

use crate::git_providers::ChangeRequestId;
use crate::pull_request::PullRequestState;

/// Value of the `X-Gitlab-Event` header for merge request hooks.
pub const MERGE_REQUEST_HOOK: &str = "Merge Request Hook";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequestWebhook {
    #[serde(default)]
    pub object_kind: String,
    #[serde(default)]
    pub user: Option<WebhookUser>,
    #[serde(default)]
    pub project: Option<WebhookProject>,
    pub object_attributes: WebhookAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookUser {
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookProject {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAttributes {
    pub iid: u64,
    pub target_project_id: u64,
    pub author_id: u64,
    pub state: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub merged_at: Option<String>,
    /// Hook action, e.g. `open`, `update`, `approved`, `merge`.
    #[serde(default)]
    pub action: Option<String>,
}

impl MergeRequestWebhook {
    /// Lifecycle state as declared by the hook; the single source of truth for state.
    pub fn lifecycle_state(&self) -> Option<PullRequestState> {
        PullRequestState::from_webhook(&self.object_attributes.state)
    }

    pub fn change_request_id(&self) -> ChangeRequestId {
        ChangeRequestId::new(
            self.object_attributes.target_project_id.to_string(),
            self.object_attributes.iid,
        )
    }

    pub fn repository_id(&self) -> u64 {
        self.object_attributes.target_project_id
    }

    pub fn iid(&self) -> u64 {
        self.object_attributes.iid
    }

    pub fn author_id(&self) -> u64 {
        self.object_attributes.author_id
    }
}
