//! GitLab REST v4 resource shapes (subset) and the aggregated bundle.
//!
//! Timestamps stay as strings here; the normalizer owns their parsing so
//! a bad value surfaces as a timestamp error instead of a decode failure.

use serde::{Deserialize, Serialize};

/// A unique reference to a merge request inside GitLab.
///
/// * `project` – numeric ID or "group/project".
/// * `iid`     – merge request IID, scoped to the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequestId {
    pub project: String,
    pub iid: u64,
}

impl ChangeRequestId {
    pub fn new(project: impl Into<String>, iid: u64) -> Self {
        Self {
            project: project.into(),
            iid,
        }
    }
}

/// `GET /users/:id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabUser {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    pub web_url: String,
}

/// `GET /projects/:id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    pub name: String,
    pub web_url: String,
    #[serde(default)]
    pub path_with_namespace: Option<String>,
}

/// User reference embedded in other resources (`merged_by`, `closed_by`, approvers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabUserRef {
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// `GET /projects/:id/merge_requests/:iid`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabMergeRequest {
    pub iid: u64,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub merged_by: Option<GitLabUserRef>,
    /// Newer GitLab versions report the merger here instead of `merged_by`.
    #[serde(default)]
    pub merge_user: Option<GitLabUserRef>,
    #[serde(default)]
    pub closed_by: Option<GitLabUserRef>,
}

impl GitLabMergeRequest {
    pub fn merger(&self) -> Option<&GitLabUserRef> {
        self.merged_by.as_ref().or(self.merge_user.as_ref())
    }
}

/// One file entry of `GET /projects/:id/merge_requests/:iid/changes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeDescriptor {
    pub old_path: String,
    pub new_path: String,
    #[serde(default)]
    pub diff: String,
    #[serde(default)]
    pub new_file: bool,
    #[serde(default)]
    pub deleted_file: bool,
    #[serde(default)]
    pub renamed_file: bool,
    /// File mode on the target side, e.g. "100644".
    #[serde(default)]
    pub b_mode: Option<String>,
}

impl ChangeDescriptor {
    /// GitLab replaces the hunk text of binary files with a `Binary files ... differ` note.
    pub fn is_binary_marker_present(&self) -> bool {
        crate::parser::is_binary_diff(&self.diff)
    }
}

/// `GET /projects/:id/merge_requests/:iid/changes`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitLabChanges {
    #[serde(default)]
    pub changes: Vec<ChangeDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabApprover {
    pub user: GitLabUserRef,
}

/// `GET /projects/:id/merge_requests/:iid/approvals`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitLabApprovals {
    #[serde(default)]
    pub approved_by: Vec<GitLabApprover>,
}

/// All five resources for one merge request, fetched together.
///
/// Only ever built complete; see `GitLabClient::fetch_all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MrBundle {
    pub user: GitLabUser,
    pub project: GitLabProject,
    pub merge_request: GitLabMergeRequest,
    pub changes: GitLabChanges,
    pub approvals: GitLabApprovals,
}
