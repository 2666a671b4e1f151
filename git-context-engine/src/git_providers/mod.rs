//! GitLab provider access.
//!
//! The only provider wired in is GitLab (REST v4). `ProviderConfig` is the
//! runtime configuration and `GitLabClient` the HTTP wrapper that fetches
//! and aggregates merge request resources.

pub mod gitlab;
pub mod types;

pub use gitlab::GitLabClient;
pub use types::*;

use std::time::Duration;

/// Default per-resource deadline for aggregated fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration for the provider client.
///
/// Usually injected from environment or higher-level application settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API base, e.g. "https://gitlab.com/api/v4".
    pub base_api: String,
    /// Access token sent as `PRIVATE-TOKEN`.
    pub token: String,
    /// Deadline applied to each remote fetch independently.
    pub fetch_timeout: Duration,
}

impl ProviderConfig {
    pub fn new(base_api: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_api: base_api.into(),
            token: token.into(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
