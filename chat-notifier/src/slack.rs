//! Slack Web API client (bot token).
//!
//! Endpoints used:
//!   * POST chat.postMessage
//!   * POST chat.update
//!
//! Slack answers HTTP 200 for most failures and reports them in the body as
//! `{ "ok": false, "error": "..." }`; both layers are checked.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blocks::{Block, SlackMessage};
use crate::errors::DeliveryError;

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// API base, e.g. "https://slack.com/api".
    pub api_base: String,
    /// Bot token sent as `Authorization: Bearer`.
    pub bot_token: String,
    pub request_timeout: Duration,
}

impl SlackConfig {
    pub fn new(api_base: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            bot_token: bot_token.into(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Where a message lives: its channel id and `ts` handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<&'a str>,
    text: &'a str,
    blocks: &'a [Block],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    ok: bool,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SlackClient {
    http: Client,
    api_base: String,
    bot_token: String,
}

impl SlackClient {
    pub fn new(http: Client, api_base: String, bot_token: String) -> Self {
        debug!("Creating SlackClient with api_base={}", api_base);
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
        }
    }

    pub fn from_config(cfg: SlackConfig) -> Result<Self, DeliveryError> {
        let http = Client::builder()
            .user_agent("chat-notifier/0.1")
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|e| DeliveryError::HttpClient(e.to_string()))?;
        Ok(Self::new(http, cfg.api_base, cfg.bot_token))
    }

    /// `chat.postMessage`; returns the channel id and `ts` Slack assigned.
    pub async fn post_message(
        &self,
        channel: &str,
        message: &SlackMessage,
    ) -> Result<PostedMessage, DeliveryError> {
        let method = "chat.postMessage";
        let payload = ChatPayload {
            channel,
            ts: None,
            text: &message.text,
            blocks: &message.blocks,
        };
        let resp = self.call(method, &payload).await?;
        let ts = resp.ts.ok_or(DeliveryError::MissingField { method, field: "ts" })?;

        Ok(PostedMessage {
            channel: resp.channel.unwrap_or_else(|| channel.to_string()),
            ts,
        })
    }

    /// `chat.update` of the message at (`channel`, `ts`).
    pub async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        message: &SlackMessage,
    ) -> Result<PostedMessage, DeliveryError> {
        let payload = ChatPayload {
            channel,
            ts: Some(ts),
            text: &message.text,
            blocks: &message.blocks,
        };
        let resp = self.call("chat.update", &payload).await?;

        Ok(PostedMessage {
            channel: resp.channel.unwrap_or_else(|| channel.to_string()),
            ts: resp.ts.unwrap_or_else(|| ts.to_string()),
        })
    }

    async fn call(
        &self,
        method: &'static str,
        payload: &ChatPayload<'_>,
    ) -> Result<ChatResponse, DeliveryError> {
        let url = format!("{}/{}", self.api_base, method);
        debug!(channel = payload.channel, "Slack POST {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DeliveryError::HttpStatus {
                method,
                status: status.as_u16(),
            });
        }

        let body: ChatResponse = resp.json().await?;
        if !body.ok {
            return Err(DeliveryError::Api {
                method,
                error: body.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> SlackMessage {
        SlackMessage {
            text: "hello".into(),
            blocks: vec![Block::section("*hello*")],
        }
    }

    fn client(server: &MockServer) -> SlackClient {
        SlackClient::from_config(SlackConfig::new(server.uri(), "xoxb-1")).unwrap()
    }

    #[tokio::test]
    async fn post_message_returns_channel_and_ts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-1"))
            .and(body_partial_json(json!({
                "channel": "C1",
                "text": "hello",
                "blocks": [{ "type": "section", "text": { "type": "mrkdwn", "text": "*hello*" } }]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": true, "channel": "C1ID", "ts": "1700.01" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let posted = client(&server).post_message("C1", &message()).await.unwrap();
        assert_eq!(
            posted,
            PostedMessage {
                channel: "C1ID".into(),
                ts: "1700.01".into()
            }
        );
    }

    #[tokio::test]
    async fn not_ok_body_is_a_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "channel_not_found" })),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .post_message("C404", &message())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Api { error, .. } if error == "channel_not_found"));
    }

    #[tokio::test]
    async fn ok_without_ts_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&server)
            .await;

        let err = client(&server)
            .post_message("C1", &message())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::MissingField { field: "ts", .. }));
    }

    #[tokio::test]
    async fn update_sends_ts_and_maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.update"))
            .and(body_partial_json(json!({ "channel": "C1", "ts": "1.2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat.update"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let c = client(&server);
        let updated = c.update_message("C1", "1.2", &message()).await.unwrap();
        assert_eq!(updated.ts, "1.2");

        let err = c.update_message("C1", "1.2", &message()).await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::HttpStatus {
                method: "chat.update",
                status: 500
            }
        ));
    }
}
