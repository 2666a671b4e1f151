use std::time::Duration;

use chat_notifier::{Notifier, NotifyStore, SlackClient, SlackConfig};
use git_context_engine::{GitLabClient, ProviderConfig};
use thiserror::Error;
use tracing::info;

use crate::core::delivery_locks::DeliveryLocks;
use crate::error_handler::AppError;

/// Configuration problems detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} has invalid format: {value:?} ({expected})")]
    InvalidFormat {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind address, e.g. "0.0.0.0:8080".
    pub api_address: String,
    /// API base for GitLab, e.g. "https://gitlab.com/api/v4".
    pub gitlab_api_base: String,
    /// Token for GitLab API ("PRIVATE-TOKEN" PAT or project access token).
    pub gitlab_token: String,
    /// Expected `X-Gitlab-Token` of incoming hooks.
    pub gitlab_webhook_secret: String,
    pub gitlab_fetch_timeout: Duration,
    pub slack_api_base: String,
    pub slack_bot_token: String,
    /// Channel used when a repository has no mapping.
    pub slack_default_channel: Option<String>,
    /// Enables the Slack routes when set.
    pub slack_verification_token: Option<String>,
    /// SQLite file, or ":memory:".
    pub notify_db_path: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |key: &str| {
            get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| optional(key).ok_or(ConfigError::MissingVar(key));

        let timeout_secs = match optional("GITLAB_FETCH_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                var: "GITLAB_FETCH_TIMEOUT_SECS",
                value: raw,
            })?,
            None => 10,
        };

        let config = Self {
            api_address: optional("API_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".into()),
            gitlab_api_base: http_url(
                "GITLAB_API_BASE",
                optional("GITLAB_API_BASE").unwrap_or_else(|| "https://gitlab.com/api/v4".into()),
            )?,
            gitlab_token: required("GITLAB_TOKEN")?,
            gitlab_webhook_secret: required("GITLAB_WEBHOOK_SECRET")?,
            gitlab_fetch_timeout: Duration::from_secs(timeout_secs),
            slack_api_base: http_url(
                "SLACK_API_BASE",
                optional("SLACK_API_BASE")
                    .unwrap_or_else(|| chat_notifier::DEFAULT_SLACK_API_BASE.into()),
            )?,
            slack_bot_token: required("SLACK_BOT_TOKEN")?,
            slack_default_channel: optional("SLACK_DEFAULT_CHANNEL"),
            slack_verification_token: optional("SLACK_VERIFICATION_TOKEN"),
            notify_db_path: optional("NOTIFY_DB_PATH")
                .unwrap_or_else(|| "data/notify.sqlite3".into()),
        };

        Ok(config)
    }
}

fn http_url(var: &'static str, value: String) -> Result<String, ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(value)
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            value,
            expected: "http(s) URL",
        })
    }
}

/// Shared state for all HTTP handlers.
#[derive(Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub gitlab: GitLabClient,
    pub notifier: Notifier,
    pub locks: DeliveryLocks,
}

impl AppState {
    /// Builds the GitLab client, the Slack client and opens the notify store.
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let gitlab = GitLabClient::from_config(
            ProviderConfig::new(&config.gitlab_api_base, &config.gitlab_token)
                .with_fetch_timeout(config.gitlab_fetch_timeout),
        )?;
        let slack = SlackClient::from_config(SlackConfig::new(
            &config.slack_api_base,
            &config.slack_bot_token,
        ))
        .map_err(chat_notifier::NotifierError::from)?;
        let store =
            NotifyStore::open(&config.notify_db_path).map_err(chat_notifier::NotifierError::from)?;

        info!(
            gitlab = %config.gitlab_api_base,
            store = %config.notify_db_path,
            default_channel = config.slack_default_channel.is_some(),
            slack_routes = config.slack_verification_token.is_some(),
            "application state ready"
        );

        Ok(Self {
            config,
            gitlab,
            notifier: Notifier::new(slack, store),
            locks: DeliveryLocks::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("GITLAB_TOKEN", "glpat"),
        ("GITLAB_WEBHOOK_SECRET", "s3cret"),
        ("SLACK_BOT_TOKEN", "xoxb"),
    ];

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(cfg.api_address, "0.0.0.0:8080");
        assert_eq!(cfg.gitlab_api_base, "https://gitlab.com/api/v4");
        assert_eq!(cfg.gitlab_fetch_timeout, Duration::from_secs(10));
        assert_eq!(cfg.slack_api_base, "https://slack.com/api");
        assert_eq!(cfg.notify_db_path, "data/notify.sqlite3");
        assert!(cfg.slack_default_channel.is_none());
        assert!(cfg.slack_verification_token.is_none());
    }

    #[test]
    fn missing_required_var_is_reported() {
        let err = AppConfig::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("SLACK_BOT_TOKEN")));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SLACK_DEFAULT_CHANNEL", "  "));
        let cfg = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert!(cfg.slack_default_channel.is_none());
    }

    #[test]
    fn malformed_values_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("GITLAB_FETCH_TIMEOUT_SECS", "soon"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&pairs)).unwrap_err(),
            ConfigError::InvalidNumber { .. }
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("GITLAB_API_BASE", "gitlab.com"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&pairs)).unwrap_err(),
            ConfigError::InvalidFormat {
                var: "GITLAB_API_BASE",
                ..
            }
        ));
    }
}
