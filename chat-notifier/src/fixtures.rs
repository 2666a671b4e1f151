//! Pull requests for tests, built through the real normalizer.

use git_context_engine::git_providers::*;
use git_context_engine::normalize::{normalize, parse_timestamp};
use git_context_engine::{MergeRequestWebhook, PullRequest};

fn webhook(state: &str) -> MergeRequestWebhook {
    serde_json::from_value(serde_json::json!({
        "object_kind": "merge_request",
        "object_attributes": {
            "iid": 3, "target_project_id": 42, "author_id": 7,
            "state": state, "title": "Fix parser",
            "url": "https://gitlab.test/acme/widgets/-/merge_requests/3"
        }
    }))
    .unwrap()
}

fn user(name: &str) -> GitLabUserRef {
    GitLabUserRef {
        name: name.into(),
        username: None,
    }
}

fn bundle(changes: Vec<ChangeDescriptor>) -> MrBundle {
    MrBundle {
        user: GitLabUser {
            id: 7,
            name: "Ada".into(),
            username: None,
            web_url: "https://gitlab.test/ada".into(),
        },
        project: GitLabProject {
            id: 42,
            name: "widgets".into(),
            web_url: "https://gitlab.test/acme/widgets".into(),
            path_with_namespace: None,
        },
        merge_request: GitLabMergeRequest {
            iid: 3,
            state: None,
            created_at: Some("2024-03-01T10:00:00Z".into()),
            merged_at: None,
            closed_at: None,
            merged_by: None,
            merge_user: None,
            closed_by: None,
        },
        changes: GitLabChanges { changes },
        approvals: GitLabApprovals {
            approved_by: vec![
                GitLabApprover { user: user("Bob") },
                GitLabApprover { user: user("Eve") },
            ],
        },
    }
}

/// One modified file with `added` and `removed` lines in a single hunk.
pub fn change(name: &str, added: usize, removed: usize) -> ChangeDescriptor {
    let mut diff = format!("@@ -1,{removed} +1,{added} @@\n");
    diff.push_str(&"-old\n".repeat(removed));
    diff.push_str(&"+new\n".repeat(added));
    ChangeDescriptor {
        old_path: name.into(),
        new_path: name.into(),
        diff,
        ..Default::default()
    }
}

pub fn opened(files: &[(&str, usize, usize)]) -> PullRequest {
    let changes = files.iter().map(|(n, a, r)| change(n, *a, *r)).collect();
    normalize(&webhook("opened"), &bundle(changes)).unwrap()
}

pub fn opened_with_diff(name: &str, diff: &str) -> PullRequest {
    let c = ChangeDescriptor {
        old_path: name.into(),
        new_path: name.into(),
        diff: diff.into(),
        ..Default::default()
    };
    normalize(&webhook("opened"), &bundle(vec![c])).unwrap()
}

pub fn merged(merger: &str, after_secs: i64) -> PullRequest {
    let mut b = bundle(vec![change("a.rs", 1, 1)]);
    let created = parse_timestamp("created_at", Some("2024-03-01T10:00:00Z")).unwrap();
    let merged_at = created + chrono::Duration::seconds(after_secs);
    b.merge_request.merged_at = Some(merged_at.to_rfc3339());
    b.merge_request.merged_by = Some(user(merger));
    normalize(&webhook("merged"), &b).unwrap()
}

pub fn closed(closer: &str) -> PullRequest {
    let mut b = bundle(vec![change("a.rs", 1, 1)]);
    b.merge_request.closed_by = Some(user(closer));
    normalize(&webhook("closed"), &b).unwrap()
}
