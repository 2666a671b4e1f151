//! Notify-once delivery: one Slack message per (repository_id, pull_request_id),
//! created on the first delivery and updated in place afterwards.
//!
//! Lookup-then-create is not atomic. Callers serialize deliveries per pull
//! request; the store's unique key turns a lost cross-process race into
//! [`NotifierError::PointerConflict`] instead of a second pointer.

use git_context_engine::PullRequest;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{NotifierError, NotifierResult, StoreError};
use crate::render::render;
use crate::slack::SlackClient;
use crate::store::{NotificationPointer, NotifyStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    slack: SlackClient,
    store: NotifyStore,
}

impl Notifier {
    pub fn new(slack: SlackClient, store: NotifyStore) -> Self {
        Self { slack, store }
    }

    pub fn store(&self) -> &NotifyStore {
        &self.store
    }

    /// Renders `pr` and creates or updates its message.
    ///
    /// `channel` is only used on create; updates go to the stored channel.
    pub async fn notify(&self, channel: &str, pr: &PullRequest) -> NotifierResult<NotifyOutcome> {
        let repository_id = pr.repository_id();
        let pull_request_id = pr.external_id();
        let message = render(pr);
        debug!(
            repository_id,
            pull_request_id,
            state = pr.state().as_str(),
            blocks = message.blocks.len(),
            "message rendered"
        );

        match self.store.get_pointer(repository_id, pull_request_id)? {
            Some(pointer) => {
                self.slack
                    .update_message(&pointer.channel, &pointer.message_ts, &message)
                    .await?;
                info!(
                    repository_id,
                    pull_request_id,
                    channel = %pointer.channel,
                    ts = %pointer.message_ts,
                    "notification updated"
                );
                Ok(NotifyOutcome::Updated)
            }
            None => {
                let posted = self.slack.post_message(channel, &message).await?;
                let pointer = NotificationPointer {
                    repository_id,
                    pull_request_id,
                    channel: posted.channel,
                    message_ts: posted.ts,
                };
                match self.store.insert_pointer(&pointer) {
                    Ok(()) => {}
                    Err(StoreError::Duplicate { .. }) => {
                        warn!(
                            repository_id,
                            pull_request_id,
                            channel = %pointer.channel,
                            ts = %pointer.message_ts,
                            "pointer stored concurrently; sent message is orphaned"
                        );
                        return Err(NotifierError::PointerConflict {
                            repository_id,
                            pull_request_id,
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
                info!(
                    repository_id,
                    pull_request_id,
                    channel = %pointer.channel,
                    ts = %pointer.message_ts,
                    "notification created"
                );
                Ok(NotifyOutcome::Created)
            }
        }
    }
}
