//! Canonical pull request record produced from one webhook delivery.

use serde::{Deserialize, Serialize};

use crate::parser::PatchedFile;

/// Lifecycle phase of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    Opened,
    Merged,
    Closed,
}

impl PullRequestState {
    /// Maps the `object_attributes.state` value of a merge request hook.
    ///
    /// Returns `None` for states that carry no notification (`locked`, ...).
    pub fn from_webhook(state: &str) -> Option<Self> {
        match state {
            "opened" | "reopened" => Some(Self::Opened),
            "merged" => Some(Self::Merged),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Merged => "merged",
            Self::Closed => "closed",
        }
    }
}

/// What happened to a file in the change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Created,
    Removed,
    Renamed,
    Changed,
}

/// One file of the pull request with its parsed diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestFile {
    filename: String,
    action: FileAction,
    diff: PatchedFile,
}

impl PullRequestFile {
    pub(crate) fn new(filename: String, action: FileAction, diff: PatchedFile) -> Self {
        Self {
            filename,
            action,
            diff,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn action(&self) -> FileAction {
        self.action
    }

    pub fn diff(&self) -> &PatchedFile {
        &self.diff
    }

    pub fn lines_added(&self) -> usize {
        self.diff.added()
    }

    pub fn lines_removed(&self) -> usize {
        self.diff.removed()
    }
}

/// Canonical pull request entity.
///
/// Built once per delivery by [`crate::normalize::normalize`] and never
/// mutated afterwards; the accessors are the only way to read it.
/// State-dependent fields hold their invariants by construction:
/// `merged_by`/`time_to_merge_seconds` exist only when merged, `closed_by`
/// only when closed, and `approval_count` is always `approvals.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    pub(crate) external_id: u64,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) state: PullRequestState,
    pub(crate) author_name: String,
    pub(crate) author_url: String,
    pub(crate) repository_id: u64,
    pub(crate) repository_name: String,
    pub(crate) repository_url: String,
    pub(crate) pr_url: String,
    pub(crate) closed_by: Option<String>,
    pub(crate) merged_by: Option<String>,
    pub(crate) time_to_merge_seconds: Option<u64>,
    pub(crate) approvals: Vec<String>,
    pub(crate) changes: Vec<PullRequestFile>,
}

impl PullRequest {
    /// Merge request IID, unique within the repository.
    pub fn external_id(&self) -> u64 {
        self.external_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> PullRequestState {
        self.state
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub fn author_url(&self) -> &str {
        &self.author_url
    }

    pub fn repository_id(&self) -> u64 {
        self.repository_id
    }

    pub fn repository_name(&self) -> &str {
        &self.repository_name
    }

    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    pub fn pr_url(&self) -> &str {
        &self.pr_url
    }

    pub fn closed_by(&self) -> Option<&str> {
        self.closed_by.as_deref()
    }

    pub fn merged_by(&self) -> Option<&str> {
        self.merged_by.as_deref()
    }

    pub fn time_to_merge_seconds(&self) -> Option<u64> {
        self.time_to_merge_seconds
    }

    /// Approver display names in the order GitLab returned them.
    pub fn approvals(&self) -> &[String] {
        &self.approvals
    }

    pub fn approval_count(&self) -> usize {
        self.approvals.len()
    }

    pub fn changes(&self) -> &[PullRequestFile] {
        &self.changes
    }
}
