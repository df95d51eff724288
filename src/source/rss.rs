//! RSS/Atom feed sources.
//!
//! Feeds are retrieved over HTTP with SSRF protection and resource limits,
//! then parsed with feed-rs.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use tracing::debug;

use super::adapter::{FeedSource, SourceProvider};
use super::types::Source;
use crate::article::Item;
use crate::config::FetcherConfig;
use crate::shutdown::Shutdown;
use crate::{FeedcastError, Result};

/// User agent string for feed fetching.
const USER_AGENT: &str = concat!("feedcast/", env!("CARGO_PKG_VERSION"));

/// HTTP feed fetcher shared by all RSS sources.
pub struct RssFetcher {
    client: Client,
    max_feed_size: u64,
}

impl RssFetcher {
    /// Create a fetcher from the fetch loop configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FeedcastError::Source(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    /// Fetch and parse the feed at `url`.
    pub async fn fetch(&self, url: &str) -> Result<Vec<Item>> {
        validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedcastError::Source(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FeedcastError::Source(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(self.too_large(content_length));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedcastError::Source(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(self.too_large(bytes.len() as u64));
        }

        parse_feed(&bytes)
    }

    fn too_large(&self, size: u64) -> FeedcastError {
        FeedcastError::Source(format!(
            "feed too large: {} bytes (max {} bytes)",
            size, self.max_feed_size
        ))
    }
}

/// A feed source backed by an RSS or Atom document.
pub struct RssSource {
    id: i64,
    name: String,
    url: String,
    fetcher: Arc<RssFetcher>,
}

impl RssSource {
    /// Create an RSS source for a registry record.
    pub fn new(source: &Source, fetcher: Arc<RssFetcher>) -> Self {
        Self {
            id: source.id,
            name: source.name.clone(),
            url: source.feed_url.clone(),
            fetcher,
        }
    }
}

#[async_trait]
impl FeedSource for RssSource {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, shutdown: &Shutdown) -> Result<Vec<Item>> {
        debug!(source = %self.name, url = %self.url, "Fetching feed");
        let items = shutdown.guard(self.fetcher.fetch(&self.url)).await??;

        Ok(items
            .into_iter()
            .map(|item| item.with_source_name(self.name.as_str()))
            .collect())
    }
}

/// Hands out [`RssSource`] adapters sharing one HTTP client.
pub struct RssSourceProvider {
    fetcher: Arc<RssFetcher>,
}

impl RssSourceProvider {
    /// Create a provider from the fetch loop configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Arc::new(RssFetcher::new(config)?),
        })
    }
}

impl SourceProvider for RssSourceProvider {
    fn adapter(&self, source: &Source) -> Arc<dyn FeedSource> {
        Arc::new(RssSource::new(source, Arc::clone(&self.fetcher)))
    }
}

/// Validate a feed URL for SSRF protection.
///
/// Only http and https are accepted, and the host must not be a reserved
/// hostname or a private, loopback or link-local address.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| FeedcastError::Source(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeedcastError::Source(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| FeedcastError::Source("URL has no host".to_string()))?;

    let ip = match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(FeedcastError::Source(format!("forbidden host: {}", domain)));
            }
            return Ok(());
        }
        url::Host::Ipv4(ipv4) => IpAddr::V4(ipv4),
        url::Host::Ipv6(ipv6) => IpAddr::V6(ipv6),
    };

    if is_private_ip(&ip) {
        return Err(FeedcastError::Source(format!(
            "private IP address not allowed: {}",
            ip
        )));
    }
    Ok(())
}

fn is_forbidden_hostname(host: &str) -> bool {
    const FORBIDDEN_SUFFIXES: [&str; 7] = [
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ];

    let host = host.to_lowercase();
    host == "localhost" || FORBIDDEN_SUFFIXES.iter().any(|s| host.ends_with(s))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                // Documentation: 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24
                || matches!(octets, [192, 0, 2, _] | [198, 51, 100, _] | [203, 0, 113, _])
        }
        IpAddr::V6(ipv6) => {
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local: fc00::/7
                || (first & 0xfe00) == 0xfc00
                // Link-local: fe80::/10
                || (first & 0xffc0) == 0xfe80
        }
    }
}

/// Parse feed bytes into items.
///
/// Entries without a usable link are skipped, since the link is the dedup key.
fn parse_feed(bytes: &[u8]) -> Result<Vec<Item>> {
    let feed = parser::parse(bytes)
        .map_err(|e| FeedcastError::Source(format!("failed to parse feed: {}", e)))?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.trim().to_string())
                .filter(|href| !href.is_empty())
                .or_else(|| Some(entry.id.trim().to_string()).filter(|id| id.starts_with("http")))?;

            let title = entry
                .title
                .map(|t| strip_html(&t.content))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());

            let summary = entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .map(|d| strip_html(&d))
                .unwrap_or_default();

            let mut item = Item::new(title, link).with_summary(summary);
            item.categories = entry.categories.into_iter().map(|c| c.term).collect();
            item.published_at = entry.published.or(entry.updated);
            Some(item)
        })
        .collect();

    Ok(items)
}

/// Strip HTML tags and decode common entities.
pub fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut in_entity = false;
    let mut entity = String::new();

    for ch in html.chars() {
        // A bare '&' ends at markup, whitespace or another '&'
        if in_entity && (ch == '<' || ch == '&' || ch.is_whitespace()) {
            in_entity = false;
            result.push('&');
            result.push_str(&entity);
        }

        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            '&' if !in_tag => {
                in_entity = true;
                entity.clear();
            }
            ';' if in_entity => {
                in_entity = false;
                match entity.as_str() {
                    "amp" => result.push('&'),
                    "lt" => result.push('<'),
                    "gt" => result.push('>'),
                    "quot" => result.push('"'),
                    "apos" => result.push('\''),
                    "nbsp" => result.push(' '),
                    _ => match parse_numeric_entity(&entity).and_then(char::from_u32) {
                        Some(c) => result.push(c),
                        None => {
                            result.push('&');
                            result.push_str(&entity);
                            result.push(';');
                        }
                    },
                }
            }
            _ if in_entity => entity.push(ch),
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    // A bare '&' that never closed
    if in_entity {
        result.push('&');
        result.push_str(&entity);
    }

    result.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Parse a numeric HTML entity body ("#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    let digits = entity.strip_prefix('#')?;
    match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => digits.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_validate_url_accepts_public_hosts() {
        assert!(validate_url("https://example.com/feed.xml").is_ok());
        assert!(validate_url("http://example.com/feed.xml").is_ok());
        assert!(validate_url("http://172.32.0.1/feed.xml").is_ok());
    }

    #[test]
    fn test_validate_url_invalid_scheme() {
        let err = validate_url("ftp://example.com/feed.xml").unwrap_err();
        assert!(err.to_string().contains("unsupported URL scheme"));

        let err = validate_url("file:///etc/passwd").unwrap_err();
        assert!(err.to_string().contains("unsupported URL scheme"));
    }

    #[test]
    fn test_validate_url_not_a_url() {
        let err = validate_url("not a url").unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_validate_url_forbidden_hosts() {
        for url in [
            "http://localhost/feed.xml",
            "http://server.local/feed.xml",
            "http://api.internal/feed.xml",
        ] {
            let err = validate_url(url).unwrap_err();
            assert!(err.to_string().contains("forbidden host"), "{url}");
        }
    }

    #[test]
    fn test_validate_url_private_ips() {
        for url in [
            "http://127.0.0.1/feed.xml",
            "http://10.0.0.1/feed.xml",
            "http://172.16.0.1/feed.xml",
            "http://192.168.1.1/feed.xml",
            "http://169.254.1.1/feed.xml",
            "http://[::1]/feed.xml",
        ] {
            let err = validate_url(url).unwrap_err();
            assert!(err.to_string().contains("private IP"), "{url}");
        }
    }

    #[test]
    fn test_is_forbidden_hostname() {
        assert!(is_forbidden_hostname("localhost"));
        assert!(is_forbidden_hostname("LOCALHOST"));
        assert!(is_forbidden_hostname("api.localhost"));
        assert!(is_forbidden_hostname("corp.intranet"));

        assert!(!is_forbidden_hostname("example.com"));
        assert!(!is_forbidden_hostname("localhost.example.com"));
    }

    #[test]
    fn test_is_private_ip() {
        assert!(is_private_ip(&"127.255.255.255".parse().unwrap()));
        assert!(is_private_ip(&"172.31.255.255".parse().unwrap()));
        assert!(is_private_ip(&"0.0.0.0".parse().unwrap()));
        assert!(is_private_ip(&"192.0.2.10".parse().unwrap()));
        assert!(is_private_ip(&"fd00::1".parse().unwrap()));
        assert!(is_private_ip(&"fe80::1".parse().unwrap()));

        assert!(!is_private_ip(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_ip(&"93.184.216.34".parse().unwrap()));
        assert!(!is_private_ip(&"2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello</p>"), "Hello");
        assert_eq!(strip_html("<b>Bold</b> text"), "Bold text");
        assert_eq!(strip_html("&lt;tag&gt; &amp; &quot;q&quot;"), "<tag> & \"q\"");
        assert_eq!(strip_html("&#65;&#x41;&#x3042;"), "AAあ");
        assert_eq!(strip_html("&bogus;"), "&bogus;");
        assert_eq!(strip_html("Fish & chips"), "Fish & chips");
        assert_eq!(
            strip_html("<p>\n\tNewlines\n\tand   tabs\n</p>"),
            "Newlines and tabs"
        );
    }

    #[test]
    fn test_strip_html_bare_ampersand_before_markup() {
        assert_eq!(
            strip_html("<p>Q&A session</p> <p>More</p>"),
            "Q&A session More"
        );
        assert_eq!(strip_html("R&D <i>team</i>"), "R&D team");
        assert_eq!(strip_html("a &b &amp; c"), "a &b & c");
        assert_eq!(strip_html("AT&T&amp;Co"), "AT&T&Co");
    }

    #[test]
    fn test_parse_feed_ampersand_in_markup() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <item>
      <title>Cartoons</title>
      <link>https://example.com/cartoons</link>
      <description><![CDATA[<p>Tom & Jerry <b>return</b> today</p>]]></description>
    </item>
  </channel>
</rss>"#;

        let items = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].summary, "Tom & Jerry return today");
    }

    #[test]
    fn test_parse_numeric_entity() {
        assert_eq!(parse_numeric_entity("#65"), Some(65));
        assert_eq!(parse_numeric_entity("#x41"), Some(65));
        assert_eq!(parse_numeric_entity("#X41"), Some(65));
        assert_eq!(parse_numeric_entity("invalid"), None);
        assert_eq!(parse_numeric_entity("#xZZ"), None);
    }

    #[test]
    fn test_parse_feed_rss() {
        let rss = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>https://example.com</link>
    <description>A test feed</description>
    <item>
      <title>First Article</title>
      <link>https://example.com/1</link>
      <guid>guid-1</guid>
      <category>Technology</category>
      <category>rust</category>
      <pubDate>Wed, 01 May 2024 10:00:00 +0200</pubDate>
      <description>&lt;p&gt;Description&lt;/p&gt;</description>
    </item>
    <item>
      <title>No link here</title>
      <guid isPermaLink="false">opaque-id</guid>
    </item>
  </channel>
</rss>"#;

        let items = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.title, "First Article");
        assert_eq!(item.link, "https://example.com/1");
        assert_eq!(item.summary, "Description");
        assert_eq!(item.categories, vec!["Technology", "rust"]);
        assert_eq!(
            item.published_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_feed_atom_uses_updated() {
        let atom = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <id>urn:feed</id>
  <updated>2025-01-01T00:00:00Z</updated>
  <entry>
    <id>urn:uuid:1</id>
    <title>Atom Entry</title>
    <link href="https://example.com/entry"/>
    <summary>Entry summary</summary>
    <updated>2025-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

        let items = parse_feed(atom.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Atom Entry");
        assert_eq!(items[0].link, "https://example.com/entry");
        assert_eq!(items[0].summary, "Entry summary");
        assert_eq!(
            items[0].published_at,
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_feed_minimal() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <item>
      <link>https://example.com/only-link</link>
    </item>
  </channel>
</rss>"#;

        let items = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Untitled");
        assert!(items[0].summary.is_empty());
        assert!(items[0].categories.is_empty());
    }

    #[test]
    fn test_parse_feed_invalid() {
        assert!(parse_feed(b"This is not XML").is_err());
    }

    #[test]
    fn test_provider_builds_adapter() {
        let provider = RssSourceProvider::new(&FetcherConfig::default()).unwrap();
        let source = Source {
            id: 3,
            name: "Example".to_string(),
            feed_url: "https://example.com/feed.xml".to_string(),
            created_at: Utc::now(),
        };

        let adapter = provider.adapter(&source);
        assert_eq!(adapter.id(), 3);
        assert_eq!(adapter.name(), "Example");
    }

    #[tokio::test]
    async fn test_fetch_rejects_private_address() {
        let fetcher = RssFetcher::new(&FetcherConfig::default()).unwrap();
        let err = fetcher.fetch("http://127.0.0.1/feed.xml").await.unwrap_err();
        assert!(matches!(err, FeedcastError::Source(_)));
    }

    #[tokio::test]
    async fn test_fetch_cancelled_by_shutdown() {
        let provider = RssSourceProvider::new(&FetcherConfig::default()).unwrap();
        let source = Source {
            id: 1,
            name: "Example".to_string(),
            feed_url: "https://example.com/feed.xml".to_string(),
            created_at: Utc::now(),
        };
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let err = provider.adapter(&source).fetch(&shutdown).await.unwrap_err();
        assert!(matches!(err, FeedcastError::Cancelled));
    }
}
