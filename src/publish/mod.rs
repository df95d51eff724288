//! Message publishers.

mod telegram;

pub use telegram::{BotInfo, ChatInfo, TelegramPublisher, Verified};

use async_trait::async_trait;

use crate::Result;

/// Delivers a message to a destination channel.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Send `text` to `destination`.
    async fn publish(&self, destination: &str, text: &str) -> Result<()>;
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
