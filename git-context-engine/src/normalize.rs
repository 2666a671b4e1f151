//! Assembles the canonical [`PullRequest`] from a webhook delivery and the
//! aggregated GitLab resources.
//!
//! The webhook's declared state decides the lifecycle branch. The merge
//! request resource only supplies state-dependent details (closer, merger,
//! timestamps); its own `state` field is never consulted.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

use crate::errors::{GitContextEngineError, GitContextEngineResult, RemoteResource, TimestampError};
use crate::git_providers::MrBundle;
use crate::patch;
use crate::pull_request::{PullRequest, PullRequestState};
use crate::webhook::MergeRequestWebhook;

/// Builds the pull request or fails as a whole; nothing partial escapes.
pub fn normalize(
    webhook: &MergeRequestWebhook,
    bundle: &MrBundle,
) -> GitContextEngineResult<PullRequest> {
    let attrs = &webhook.object_attributes;
    let state = webhook
        .lifecycle_state()
        .ok_or_else(|| GitContextEngineError::UnsupportedState(attrs.state.clone()))?;

    let approvals: Vec<String> = bundle
        .approvals
        .approved_by
        .iter()
        .map(|a| a.user.name.clone())
        .collect();

    let mr = &bundle.merge_request;
    let (closed_by, merged_by, time_to_merge_seconds) = match state {
        PullRequestState::Opened => (None, None, None),
        PullRequestState::Closed => {
            let closer = mr
                .closed_by
                .as_ref()
                .ok_or(GitContextEngineError::IncompleteResource {
                    resource: RemoteResource::MergeRequest,
                    field: "closed_by",
                })?;
            (Some(closer.name.clone()), None, None)
        }
        PullRequestState::Merged => {
            let merger = mr.merger().ok_or(GitContextEngineError::IncompleteResource {
                resource: RemoteResource::MergeRequest,
                field: "merged_by",
            })?;
            let seconds = time_to_merge(mr.created_at.as_deref(), mr.merged_at.as_deref())?;
            (None, Some(merger.name.clone()), Some(seconds))
        }
    };

    let changes = patch::reconstruct(&bundle.changes.changes)?;

    debug!(
        project = bundle.project.id,
        iid = attrs.iid,
        state = state.as_str(),
        files = changes.len(),
        approvals = approvals.len(),
        "pull request normalized"
    );

    Ok(PullRequest {
        external_id: attrs.iid,
        title: attrs.title.clone(),
        description: attrs.description.clone().unwrap_or_default(),
        state,
        author_name: bundle.user.name.clone(),
        author_url: bundle.user.web_url.clone(),
        repository_id: attrs.target_project_id,
        repository_name: bundle.project.name.clone(),
        repository_url: bundle.project.web_url.clone(),
        pr_url: attrs.url.clone(),
        closed_by,
        merged_by,
        time_to_merge_seconds,
        approvals,
        changes,
    })
}

/// `merged_at - created_at` in whole seconds.
pub fn time_to_merge(
    created_at: Option<&str>,
    merged_at: Option<&str>,
) -> Result<u64, TimestampError> {
    let created = parse_timestamp("created_at", created_at)?;
    let merged = parse_timestamp("merged_at", merged_at)?;

    let seconds = (merged - created).num_seconds();
    u64::try_from(seconds).map_err(|_| TimestampError::Inverted {
        created_at: created.to_rfc3339(),
        merged_at: merged.to_rfc3339(),
    })
}

/// Accepts the API's RFC 3339 form and the hook's `YYYY-MM-DD HH:MM:SS UTC` form.
pub fn parse_timestamp(
    field: &'static str,
    value: Option<&str>,
) -> Result<DateTime<Utc>, TimestampError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(TimestampError::Missing { field })?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Some(naive) = value.strip_suffix(" UTC") {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S") {
            return Ok(dt.and_utc());
        }
    }

    Err(TimestampError::Unparsable {
        field,
        value: value.to_string(),
    })
}
