/*!
common/src/lib.rs

Shared configuration types for the AI news digest.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default file with an optional override file
- Validation of the URLs a run is going to hit
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Remote LLM config (OpenAI-compatible chat completions endpoint)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    /// Maximum number of LLM calls in flight during enrichment
    pub concurrency: Option<usize>,
    /// Total attempts per item, including the first one
    pub max_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    /// Language the titles and summaries are translated into
    pub target_language: Option<String>,
}

/// Hacker News (Firebase API) collector settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HackerNewsConfig {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub limit: Option<usize>,
    /// How many top story ids are considered before filtering
    pub pool_size: Option<usize>,
    /// Concurrent item detail requests
    pub workers: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

/// Reddit collector settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedditConfig {
    pub enabled: Option<bool>,
    /// Public JSON host, used when no OAuth credentials are available
    pub base_url: Option<String>,
    /// Host used once an OAuth token was obtained
    pub oauth_base_url: Option<String>,
    pub auth_url: Option<String>,
    pub communities: Option<Vec<String>>,
    pub per_community: Option<usize>,
    pub limit: Option<usize>,
    pub client_id_env: Option<String>,
    pub client_secret_env: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Simple feed descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

/// Syndication feed collector settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedsConfig {
    pub enabled: Option<bool>,
    pub per_feed: Option<usize>,
    pub limit: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub fetch_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    /// When absent, the built-in outlet list is used
    pub feeds: Option<Vec<FeedConfig>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub hacker_news: Option<HackerNewsConfig>,
    pub reddit: Option<RedditConfig>,
    pub feeds: Option<FeedsConfig>,
}

/// Where the digest is written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: Option<String>,
    pub write_json: Option<bool>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub llm: Option<LlmConfig>,
    pub sources: Option<SourcesConfig>,
    pub output: Option<OutputConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Missing files are skipped, so an empty configuration is valid.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Check every configured endpoint URL before the run starts.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = self.llm.as_ref().and_then(|l| l.api_url.as_deref()) {
            check_url("llm.api_url", url)?;
        }

        let Some(sources) = &self.sources else {
            return Ok(());
        };

        if let Some(url) = sources.hacker_news.as_ref().and_then(|h| h.base_url.as_deref()) {
            check_url("sources.hacker_news.base_url", url)?;
        }

        if let Some(reddit) = &sources.reddit {
            for (field, value) in [
                ("sources.reddit.base_url", &reddit.base_url),
                ("sources.reddit.oauth_base_url", &reddit.oauth_base_url),
                ("sources.reddit.auth_url", &reddit.auth_url),
            ] {
                if let Some(url) = value {
                    check_url(field, url)?;
                }
            }
        }

        if let Some(feeds) = sources.feeds.as_ref().and_then(|f| f.feeds.as_ref()) {
            for feed in feeds {
                check_url(&format!("feed '{}'", feed.name), &feed.url)?;
            }
        }

        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    url::Url::parse(value).with_context(|| format!("Invalid URL for {}: {}", field, value))?;
    Ok(())
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}
