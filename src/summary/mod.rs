//! Article summarizers.

mod excerpt;
mod openai;

pub use excerpt::{excerpt, ExcerptSummarizer};
pub use openai::OpenAiSummarizer;

use std::sync::Arc;

use async_trait::async_trait;

use crate::article::Article;
use crate::config::SummarizerConfig;
use crate::{FeedcastError, Result};

/// Produces a short human-readable digest of an article.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `article`.
    async fn summarize(&self, article: &Article) -> Result<String>;
}

/// Build the summarizer selected by `config.kind`.
pub fn from_config(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>> {
    match config.kind.as_str() {
        "excerpt" => Ok(Arc::new(ExcerptSummarizer::new(config.max_length))),
        "openai" => Ok(Arc::new(OpenAiSummarizer::new(config)?)),
        other => Err(FeedcastError::Config(format!(
            "unknown summarizer kind: {other}"
        ))),
    }
}
