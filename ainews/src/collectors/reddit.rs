use anyhow::{Context, Result};
use common::RedditConfig;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{http_client, Collector, DEFAULT_TIMEOUT_SECS, USER_AGENT};
use crate::dedup::dedup_last_wins;
use crate::item::{truncate_chars, NewsItem, SNIPPET_MAX_CHARS};
use crate::relevance::is_relevant;

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
pub const DEFAULT_OAUTH_BASE_URL: &str = "https://oauth.reddit.com";
pub const DEFAULT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const DEFAULT_COMMUNITIES: &[&str] = &[
    "MachineLearning",
    "LocalLLaMA",
    "singularity",
    "ArtificialInteligence",
];

/// Titles containing one of these are help requests, not news.
const HELP_MARKERS: &[&str] = &["question", "help"];

/// Application-only OAuth credentials
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Collects the day's top posts from a fixed list of communities.
pub struct RedditCollector {
    base_url: String,
    oauth_base_url: String,
    auth_url: String,
    communities: Vec<String>,
    per_community: usize,
    limit: usize,
    credentials: Option<RedditCredentials>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Submission,
}

#[derive(Debug, Deserialize)]
struct Submission {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl RedditCollector {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            oauth_base_url: DEFAULT_OAUTH_BASE_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            communities: DEFAULT_COMMUNITIES.iter().map(|c| c.to_string()).collect(),
            per_community: 5,
            limit: 20,
            credentials: None,
            client: http_client(DEFAULT_TIMEOUT_SECS, USER_AGENT)?,
        })
    }

    /// Build from config. Credentials are read from the environment
    /// variables the config names; missing variables mean anonymous access.
    pub fn from_config(cfg: &RedditConfig) -> Result<Self> {
        let mut collector = Self::new(cfg.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;

        let user_agent = cfg.user_agent.as_deref().unwrap_or(USER_AGENT);
        let timeout = cfg.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS);
        collector.client = http_client(timeout, user_agent)?;

        if let Some(url) = &cfg.oauth_base_url {
            collector.oauth_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = &cfg.auth_url {
            collector.auth_url = url.clone();
        }
        if let Some(communities) = &cfg.communities {
            collector.communities = communities.clone();
        }
        collector.per_community = cfg.per_community.unwrap_or(collector.per_community);
        collector.limit = cfg.limit.unwrap_or(collector.limit);

        let id_env = cfg.client_id_env.as_deref().unwrap_or("REDDIT_CLIENT_ID");
        let secret_env = cfg.client_secret_env.as_deref().unwrap_or("REDDIT_CLIENT_SECRET");
        if let (Ok(client_id), Ok(client_secret)) = (std::env::var(id_env), std::env::var(secret_env)) {
            collector.credentials = Some(RedditCredentials {
                client_id,
                client_secret,
            });
        }

        Ok(collector)
    }

    pub fn with_communities<I, S>(mut self, communities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.communities = communities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_credentials(
        mut self,
        credentials: RedditCredentials,
        auth_url: impl Into<String>,
        oauth_base_url: impl Into<String>,
    ) -> Self {
        self.credentials = Some(credentials);
        self.auth_url = auth_url.into();
        self.oauth_base_url = oauth_base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    async fn access_token(&self, credentials: &RedditCredentials) -> Result<String> {
        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("reddit token request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("reddit token request failed with status: {}", status);
        }

        let token: TokenResponse = response.json().await.context("failed to parse reddit token")?;
        Ok(token.access_token)
    }

    async fn top_of_day(&self, base_url: &str, token: Option<&str>, community: &str) -> Result<Vec<Submission>> {
        let url = format!("{}/r/{}/top.json", base_url, community);
        let limit = self.per_community.to_string();
        let mut request = self
            .client
            .get(&url)
            .query(&[("t", "day"), ("limit", limit.as_str())]);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("failed to fetch r/{}", community))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("r/{} listing failed with status: {}", community, status);
        }

        let listing: Listing = response
            .json()
            .await
            .with_context(|| format!("failed to parse r/{} listing", community))?;

        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }
}

fn is_help_request(title: &str) -> bool {
    let title = title.to_lowercase();
    HELP_MARKERS.iter().any(|m| title.contains(m))
}

fn to_item(community: &str, post: Submission) -> Option<NewsItem> {
    if post.stickied || post.title.is_empty() || post.url.is_empty() {
        return None;
    }
    if is_help_request(&post.title) {
        debug!("reddit: skipping help request {:?}", post.title);
        return None;
    }

    let snippet = truncate_chars(&post.selftext, SNIPPET_MAX_CHARS);
    if !is_relevant(&post.title, &snippet) {
        return None;
    }

    Some(
        NewsItem::new(post.title, post.url, format!("Reddit/{}", community), post.id)
            .with_snippet(&snippet)
            .with_popularity(post.score, post.num_comments),
    )
}

#[async_trait::async_trait]
impl Collector for RedditCollector {
    fn name(&self) -> &str {
        "Reddit"
    }

    fn limit(&self) -> usize {
        self.limit
    }

    async fn collect(&self, limit: usize) -> Result<Vec<NewsItem>> {
        let token = match &self.credentials {
            Some(credentials) => match self.access_token(credentials).await {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!("reddit: OAuth failed, using public listings: {:#}", e);
                    None
                }
            },
            None => None,
        };
        let base_url = if token.is_some() {
            &self.oauth_base_url
        } else {
            &self.base_url
        };

        let mut items = Vec::new();
        for community in &self.communities {
            match self.top_of_day(base_url, token.as_deref(), community).await {
                Ok(posts) => {
                    let before = items.len();
                    items.extend(posts.into_iter().filter_map(|p| to_item(community, p)));
                    debug!("reddit: r/{} gave {} relevant posts", community, items.len() - before);
                }
                Err(e) => {
                    warn!("reddit: skipping r/{}: {:#}", community, e);
                }
            }
        }

        let mut items = dedup_last_wins(items);
        items.truncate(limit);
        info!("reddit: collected {} relevant items", items.len());
        Ok(items)
    }
}
