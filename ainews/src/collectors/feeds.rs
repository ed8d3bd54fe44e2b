use anyhow::Result;
use common::FeedsConfig;
use feed_rs::model::Entry;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{http_client, Collector, DEFAULT_TIMEOUT_SECS, USER_AGENT};
use crate::dedup::dedup_last_wins;
use crate::ingestion::fetch_and_parse_feed;
use crate::item::{truncate_chars, NewsItem, SNIPPET_MAX_CHARS};
use crate::relevance::is_relevant;
use crate::retry::RetryPolicy;

/// Outlets read when the configuration does not list any feeds.
pub const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("OpenAI", "https://openai.com/news/rss.xml"),
    ("Google AI", "https://blog.google/technology/ai/rss/"),
    ("Hugging Face", "https://huggingface.co/blog/feed.xml"),
    ("MIT Technology Review", "https://www.technologyreview.com/topic/artificial-intelligence/feed"),
    ("The Verge AI", "https://www.theverge.com/rss/ai-artificial-intelligence/index.xml"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Collects the latest entries of a fixed list of syndication feeds.
pub struct FeedCollector {
    feeds: Vec<FeedSource>,
    per_feed: usize,
    limit: usize,
    retry: RetryPolicy,
    client: Client,
}

impl FeedCollector {
    pub fn new(feeds: Vec<FeedSource>) -> Result<Self> {
        Ok(Self {
            feeds,
            per_feed: 3,
            limit: 20,
            retry: RetryPolicy::new(2, Duration::from_secs(1)),
            client: http_client(DEFAULT_TIMEOUT_SECS, USER_AGENT)?,
        })
    }

    pub fn from_config(cfg: &FeedsConfig) -> Result<Self> {
        let feeds = match &cfg.feeds {
            Some(feeds) => feeds.iter().map(|f| FeedSource::new(&f.name, &f.url)).collect(),
            None => DEFAULT_FEEDS
                .iter()
                .map(|(name, url)| FeedSource::new(*name, *url))
                .collect(),
        };

        let mut collector = Self::new(feeds)?;
        if let Some(timeout) = cfg.timeout_seconds {
            collector.client = http_client(timeout, USER_AGENT)?;
        }
        collector.per_feed = cfg.per_feed.unwrap_or(collector.per_feed);
        collector.limit = cfg.limit.unwrap_or(collector.limit);
        collector.retry = RetryPolicy::new(
            cfg.fetch_attempts.unwrap_or(collector.retry.max_attempts),
            cfg.retry_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(collector.retry.delay),
        );
        Ok(collector)
    }

    pub fn with_per_feed(mut self, per_feed: usize) -> Self {
        self.per_feed = per_feed;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Plain-text excerpt of an entry: summary/description first, then content.
fn entry_snippet(entry: &Entry) -> String {
    let html = entry
        .summary
        .as_ref()
        .map(|s| s.content.as_str())
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.as_deref()))
        .unwrap_or_default();

    let text = match html2text::from_read(html.as_bytes(), 10_000) {
        Ok(text) => text,
        Err(e) => {
            debug!("feeds: html conversion failed, keeping raw text: {}", e);
            html.to_string()
        }
    };

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, SNIPPET_MAX_CHARS)
}

fn to_item(outlet: &str, entry: &Entry) -> Option<NewsItem> {
    let title = entry.title.as_ref().map(|t| t.content.trim().to_string()).unwrap_or_default();
    let url = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();
    if title.is_empty() || url.is_empty() {
        debug!("feeds: skipping entry without title or link in {}", outlet);
        return None;
    }

    let snippet = entry_snippet(entry);
    if !is_relevant(&title, &snippet) {
        return None;
    }

    // feeds carry no engagement signal, popularity stays at zero
    Some(NewsItem::new(title, url.clone(), format!("RSS/{}", outlet), url).with_snippet(&snippet))
}

#[async_trait::async_trait]
impl Collector for FeedCollector {
    fn name(&self) -> &str {
        "RSS"
    }

    fn limit(&self) -> usize {
        self.limit
    }

    async fn collect(&self, limit: usize) -> Result<Vec<NewsItem>> {
        let mut items = Vec::new();

        for source in &self.feeds {
            match fetch_and_parse_feed(&self.client, &source.url, &self.retry).await {
                Ok(feed) => {
                    let before = items.len();
                    items.extend(
                        feed.entries
                            .iter()
                            .take(self.per_feed)
                            .filter_map(|entry| to_item(&source.name, entry)),
                    );
                    debug!("feeds: {} gave {} relevant entries", source.name, items.len() - before);
                }
                Err(e) => {
                    warn!("feeds: skipping {}: {:#}", source.name, e);
                }
            }
        }

        let mut items = dedup_last_wins(items);
        items.truncate(limit);
        info!("feeds: collected {} relevant items", items.len());
        Ok(items)
    }
}
