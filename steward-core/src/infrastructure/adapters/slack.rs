// steward-core/src/infrastructure/adapters/slack.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::ports::notifier::{DeliveryReceipt, NotificationError, Notifier};

pub const SLACK_TOKEN_VAR: &str = "SLACK_TOKEN";
pub const SLACK_CHANNEL_VAR: &str = "SLACK_CHANNEL";
const SLACK_API_URL: &str = "https://slack.com/api";

/// Bot token and target channel. Both are checked when the config is built,
/// so a notifier never reaches the network half-configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackConfig {
    token: String,
    channel: String,
}

impl SlackConfig {
    pub fn new(token: &str, channel: &str) -> Result<Self, NotificationError> {
        Self::from_lookup(|key| match key {
            SLACK_TOKEN_VAR => Some(token.to_string()),
            SLACK_CHANNEL_VAR => Some(channel.to_string()),
            _ => None,
        })
    }

    pub fn from_env() -> Result<Self, NotificationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, NotificationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |variable: &str| {
            lookup(variable)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| NotificationError::NotConfigured {
                    variable: variable.to_string(),
                })
        };

        Ok(Self {
            token: required(SLACK_TOKEN_VAR)?,
            channel: required(SLACK_CHANNEL_VAR)?,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationsResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channels: Vec<Conversation>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct Conversation {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

pub struct SlackNotifier {
    client: Client,
    config: SlackConfig,
    api_url: String,
}

impl SlackNotifier {
    pub fn new(config: SlackConfig) -> Self {
        Self::with_api_url(config, SLACK_API_URL)
    }

    pub fn with_api_url(config: SlackConfig, api_url: &str) -> Self {
        Self {
            client: Client::new(),
            config,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// True when the configured channel is visible to the bot. Any failure is
    /// logged and reported as unavailable.
    #[instrument(skip(self), fields(channel = %self.config.channel))]
    pub async fn is_channel_available(&self) -> bool {
        match self.channel_names().await {
            Ok(names) => names.iter().any(|n| *n == self.config.channel),
            Err(e) => {
                warn!("Could not list Slack channels: {}", e);
                false
            }
        }
    }

    async fn channel_names(&self) -> Result<Vec<String>, NotificationError> {
        let mut names = Vec::new();
        let mut cursor = String::new();
        loop {
            let response = self
                .client
                .get(format!("{}/conversations.list", self.api_url))
                .bearer_auth(&self.config.token)
                .query(&[
                    ("types", "public_channel,private_channel"),
                    ("limit", "200"),
                    ("cursor", cursor.as_str()),
                ])
                .send()
                .await
                .map_err(|e| NotificationError::DeliveryFailed(e.to_string()))?
                .json::<ConversationsResponse>()
                .await
                .map_err(|e| NotificationError::DeliveryFailed(e.to_string()))?;

            let (page, next) = conversation_page(response)?;
            names.extend(page);
            match next {
                Some(next) => cursor = next,
                None => return Ok(names),
            }
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    #[instrument(skip(self, text), fields(channel = %self.config.channel))]
    async fn post_message(&self, text: &str) -> Result<DeliveryReceipt, NotificationError> {
        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(&self.config.token)
            .json(&json!({ "channel": self.config.channel, "text": text }))
            .send()
            .await
            .map_err(|e| NotificationError::DeliveryFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::DeliveryFailed(format!("HTTP {}", status)));
        }

        let body = response
            .json::<PostMessageResponse>()
            .await
            .map_err(|e| NotificationError::DeliveryFailed(e.to_string()))?;
        let receipt = receipt_from(body, &self.config.channel)?;
        debug!(ts = %receipt.timestamp, "Slack message delivered");
        Ok(receipt)
    }
}

fn receipt_from(
    body: PostMessageResponse,
    default_channel: &str,
) -> Result<DeliveryReceipt, NotificationError> {
    if !body.ok {
        return Err(NotificationError::DeliveryFailed(
            body.error.unwrap_or_else(|| "unknown_error".to_string()),
        ));
    }
    Ok(DeliveryReceipt {
        channel: body.channel.unwrap_or_else(|| default_channel.to_string()),
        timestamp: body.ts.unwrap_or_default(),
    })
}

fn conversation_page(
    response: ConversationsResponse,
) -> Result<(Vec<String>, Option<String>), NotificationError> {
    if !response.ok {
        return Err(NotificationError::DeliveryFailed(
            response.error.unwrap_or_else(|| "unknown_error".to_string()),
        ));
    }
    let next = response
        .response_metadata
        .map(|m| m.next_cursor)
        .filter(|c| !c.is_empty());
    let names = response.channels.into_iter().map(|c| c.name).collect();
    Ok((names, next))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_is_not_configured() {
        let err = SlackConfig::from_lookup(|key| match key {
            SLACK_CHANNEL_VAR => Some("curation-alerts".into()),
            _ => None,
        })
        .unwrap_err();

        assert_eq!(
            err,
            NotificationError::NotConfigured {
                variable: SLACK_TOKEN_VAR.into()
            }
        );
    }

    #[test]
    fn test_blank_channel_is_not_configured() {
        let err = SlackConfig::new("xoxb-token", "  ").unwrap_err();
        assert_eq!(
            err,
            NotificationError::NotConfigured {
                variable: SLACK_CHANNEL_VAR.into()
            }
        );
    }

    #[test]
    fn test_explicit_config() {
        let config = SlackConfig::new("xoxb-token", "curation-alerts").unwrap();
        assert_eq!(config.channel(), "curation-alerts");
    }

    #[test]
    fn test_receipt_from_ok_response() {
        let body: PostMessageResponse = serde_json::from_str(
            r#"{"ok": true, "channel": "C024BE91L", "ts": "1503435956.000247"}"#,
        )
        .unwrap();
        let receipt = receipt_from(body, "curation-alerts").unwrap();
        assert_eq!(receipt.channel, "C024BE91L");
        assert_eq!(receipt.timestamp, "1503435956.000247");
    }

    #[test]
    fn test_slack_error_is_delivery_failure() {
        let body: PostMessageResponse =
            serde_json::from_str(r#"{"ok": false, "error": "channel_not_found"}"#).unwrap();
        assert_eq!(
            receipt_from(body, "x").unwrap_err(),
            NotificationError::DeliveryFailed("channel_not_found".into())
        );
    }

    #[test]
    fn test_conversation_page_cursor() {
        let response: ConversationsResponse = serde_json::from_str(
            r#"{"ok": true, "channels": [{"name": "general"}, {"name": "curation-alerts"}],
                "response_metadata": {"next_cursor": ""}}"#,
        )
        .unwrap();
        let (names, next) = conversation_page(response).unwrap();
        assert_eq!(names, vec!["general", "curation-alerts"]);
        assert!(next.is_none());
    }
}
