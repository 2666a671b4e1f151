use chat_notifier::NotifyOutcome;
use git_context_engine::PullRequestState;
use serde::Serialize;

/// Body of a delivered notification.
#[derive(Debug, Serialize)]
pub struct GitLabWebhookResponse {
    pub repository_id: u64,
    pub pull_request_id: u64,
    pub state: PullRequestState,
    pub outcome: NotifyOutcome,
}

/// Body of an acknowledged but ignored hook.
#[derive(Debug, Serialize)]
pub struct IgnoredResponse {
    pub ignored: bool,
    pub reason: &'static str,
}

impl IgnoredResponse {
    pub fn because(reason: &'static str) -> Self {
        Self {
            ignored: true,
            reason,
        }
    }
}
