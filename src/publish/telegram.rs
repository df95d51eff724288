//! Telegram Bot API publisher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::Publisher;
use crate::config::TelegramConfig;
use crate::{FeedcastError, Result};

/// Request timeout for Bot API calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

/// Subset of the `getMe` result.
#[derive(Debug, Deserialize)]
pub struct BotInfo {
    /// Bot user ID.
    pub id: i64,
    /// Bot username.
    #[serde(default)]
    pub username: Option<String>,
}

/// Subset of the `getChat` result.
#[derive(Debug, Deserialize)]
pub struct ChatInfo {
    /// Chat ID.
    pub id: i64,
    /// Chat type ("channel", "supergroup", ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Title for channels and groups.
    #[serde(default)]
    pub title: Option<String>,
}

/// Identity of the bot and the destination it publishes to.
#[derive(Debug)]
pub struct Verified {
    pub bot: BotInfo,
    pub chat: ChatInfo,
}

/// Publishes messages to Telegram chats and channels.
pub struct TelegramPublisher {
    client: Client,
    base_url: String,
    channel_id: String,
}

impl TelegramPublisher {
    /// Create a publisher from configuration.
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| FeedcastError::Publisher(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/bot{}",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            channel_id: config.channel_id.clone(),
        })
    }

    /// Check that the bot token is accepted and the destination channel is
    /// reachable by the bot.
    pub async fn verify(&self) -> Result<Verified> {
        let bot: BotInfo = into_result(self.get("getMe", &[]).await?)?;

        let chat: ChatInfo = self
            .get("getChat", &[("chat_id", self.channel_id.as_str())])
            .await
            .and_then(into_result)
            .map_err(|e| unreachable_channel(&self.channel_id, e))?;

        Ok(Verified { bot, chat })
    }

    async fn get<T>(&self, method: &str, query: &[(&str, &str)]) -> Result<ApiResponse<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, method))
            .query(query)
            .send()
            .await
            .map_err(|e| {
                FeedcastError::Publisher(format!("{} failed: {}", method, e.without_url()))
            })?;

        response
            .json()
            .await
            .map_err(|e| FeedcastError::Publisher(format!("invalid {} response: {}", method, e)))
    }
}

fn unreachable_channel(channel_id: &str, err: FeedcastError) -> FeedcastError {
    let reason = match err {
        FeedcastError::Publisher(reason) => reason,
        other => other.to_string(),
    };
    FeedcastError::Publisher(format!(
        "destination channel {} is not reachable: {}",
        channel_id, reason
    ))
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(&self, destination: &str, text: &str) -> Result<()> {
        debug!(destination, "Sending message");

        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&json!({
                "chat_id": destination,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await
            .map_err(|e| {
                FeedcastError::Publisher(format!("sendMessage failed: {}", e.without_url()))
            })?;

        let status = response.status();
        let body: ApiResponse<serde_json::Value> = response.json().await.map_err(|e| {
            FeedcastError::Publisher(format!("invalid sendMessage response ({}): {}", status, e))
        })?;

        into_result(body).map(|_| ())
    }
}

fn into_result<T>(response: ApiResponse<T>) -> Result<T> {
    match response {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        ApiResponse { description, .. } => Err(FeedcastError::Publisher(
            description.unwrap_or_else(|| "request rejected".to_string()),
        )),
    }
}
