//! Offline summarizer that shortens the article's own summary.

use async_trait::async_trait;

use super::Summarizer;
use crate::article::Article;
use crate::Result;

/// Produces a digest by truncating the article summary.
#[derive(Debug, Clone)]
pub struct ExcerptSummarizer {
    max_length: usize,
}

impl ExcerptSummarizer {
    /// Create a summarizer producing at most `max_length` characters.
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }
}

#[async_trait]
impl Summarizer for ExcerptSummarizer {
    async fn summarize(&self, article: &Article) -> Result<String> {
        let text = article.summary.trim();
        if text.is_empty() {
            return Ok(excerpt(article.title.trim(), self.max_length));
        }
        Ok(excerpt(text, self.max_length))
    }
}

/// Shorten `text` to at most `max_length` characters.
///
/// Prefers ending at a sentence boundary in the second half of the allowed
/// length, then at a word boundary, and marks cut words with an ellipsis.
pub fn excerpt(text: &str, max_length: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    if max_length == 0 {
        return String::new();
    }

    // Leave room for the ellipsis
    let end = text
        .char_indices()
        .nth(max_length - 1)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..end];

    let sentence_end = head
        .char_indices()
        .filter(|&(i, c)| {
            let after = i + c.len_utf8();
            after >= head.len() / 2
                && matches!(c, '.' | '!' | '?' | '。')
                && text[after..].starts_with(char::is_whitespace)
        })
        .map(|(i, c)| i + c.len_utf8())
        .last();
    if let Some(pos) = sentence_end {
        return head[..pos].to_string();
    }

    match head.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => format!("{}…", head[..pos].trim_end()),
        _ => format!("{head}…"),
    }
}
