use anyhow::{Context, Result};
use common::HackerNewsConfig;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use super::{http_client, Collector, DEFAULT_TIMEOUT_SECS, USER_AGENT};
use crate::item::NewsItem;
use crate::relevance::is_relevant;

pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";
pub const SOURCE_TAG: &str = "HackerNews";

/// Collects relevant stories from the Hacker News top stories ranking.
pub struct HackerNewsCollector {
    base_url: String,
    pool_size: usize,
    workers: usize,
    limit: usize,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct HnItem {
    id: u64,
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    score: Option<i64>,
    /// Total comment count
    #[serde(default)]
    descendants: Option<i64>,
}

impl HackerNewsCollector {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            pool_size: 200,
            workers: 10,
            limit: 30,
            client: http_client(DEFAULT_TIMEOUT_SECS, USER_AGENT)?,
        })
    }

    pub fn from_config(cfg: &HackerNewsConfig) -> Result<Self> {
        let mut collector = Self::new(cfg.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        if let Some(timeout) = cfg.timeout_seconds {
            collector.client = http_client(timeout, USER_AGENT)?;
        }
        collector.pool_size = cfg.pool_size.unwrap_or(collector.pool_size);
        collector.workers = cfg.workers.unwrap_or(collector.workers);
        collector.limit = cfg.limit.unwrap_or(collector.limit);
        Ok(collector)
    }

    /// Number of top ids considered and detail requests kept in flight
    pub fn with_pool(mut self, pool_size: usize, workers: usize) -> Self {
        self.pool_size = pool_size;
        self.workers = workers;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    async fn top_story_ids(&self) -> Result<Vec<u64>> {
        let url = format!("{}/topstories.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("failed to fetch top stories")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("top stories request failed with status: {}", status);
        }

        let mut ids: Vec<u64> = response.json().await.context("failed to parse top stories")?;
        ids.truncate(self.pool_size);
        Ok(ids)
    }

    async fn fetch_item(&self, id: u64) -> Option<HnItem> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        let result = async {
            let response = self.client.get(&url).send().await?.error_for_status()?;
            // deleted items come back as `null`
            response.json::<Option<HnItem>>().await
        }
        .await;

        match result {
            Ok(item) => item,
            Err(e) => {
                debug!("hn: failed to fetch item {}: {}", id, e);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl Collector for HackerNewsCollector {
    fn name(&self) -> &str {
        SOURCE_TAG
    }

    fn limit(&self) -> usize {
        self.limit
    }

    async fn collect(&self, limit: usize) -> Result<Vec<NewsItem>> {
        info!("hn: fetching top stories from {}", self.base_url);

        let ids = match self.top_story_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!("hn: top stories unavailable: {:#}", e);
                return Ok(Vec::new());
            }
        };

        let mut items = Vec::new();
        if limit == 0 {
            return Ok(items);
        }

        // `buffered` yields in submission order, so the cutoff at `limit`
        // is the same from run to run for the same ranking.
        let mut details = stream::iter(ids)
            .map(|id| self.fetch_item(id))
            .buffered(self.workers.max(1));

        while let Some(detail) = details.next().await {
            let Some(record) = detail else { continue };
            let (Some(title), Some(url)) = (record.title, record.url) else {
                debug!("hn: skipping item {} without title or link", record.id);
                continue;
            };
            if title.is_empty() || url.is_empty() {
                continue;
            }
            if !is_relevant(&title, "") {
                continue;
            }

            items.push(
                NewsItem::new(title, url, SOURCE_TAG, record.id.to_string())
                    .with_popularity(record.score.unwrap_or(0), record.descendants.unwrap_or(0)),
            );
            if items.len() >= limit {
                break;
            }
        }

        info!("hn: collected {} relevant items", items.len());
        Ok(items)
    }
}
