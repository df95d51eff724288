//! Summarizer backed by an OpenAI-compatible chat completions API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::excerpt::excerpt;
use super::Summarizer;
use crate::article::Article;
use crate::config::SummarizerConfig;
use crate::{FeedcastError, Result};

/// Request timeout for a completion.
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Summarizes articles with a chat completion model.
pub struct OpenAiSummarizer {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    prompt: String,
    max_length: usize,
}

impl OpenAiSummarizer {
    /// Create a summarizer from configuration.
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                FeedcastError::Summarizer(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", config.endpoint.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            prompt: config.prompt.clone(),
            max_length: config.max_length,
        })
    }

    fn build_request<'a>(&'a self, article: &Article) -> ChatRequest<'a> {
        let mut content = article.title.clone();
        if !article.summary.trim().is_empty() {
            content.push_str("\n\n");
            content.push_str(article.summary.trim());
        }

        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.prompt.clone(),
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, article: &Article) -> Result<String> {
        debug!(article_id = article.id, "Requesting summary");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(article))
            .send()
            .await
            .map_err(|e| FeedcastError::Summarizer(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedcastError::Summarizer(format!(
                "API error {}: {}",
                status, body
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| FeedcastError::Summarizer(format!("invalid response: {}", e)))?;

        Ok(excerpt(&extract_summary(body)?, self.max_length))
    }
}

/// Take the first non-empty choice from a completion response.
fn extract_summary(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| FeedcastError::Summarizer("empty completion".to_string()))
}
