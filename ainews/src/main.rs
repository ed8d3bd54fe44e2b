/*
ainews - single-run digest binary.
Collects AI news from every enabled source, enriches it with the configured LLM,
ranks it and writes a dated Markdown digest.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use ainews::collectors::{FeedCollector, HackerNewsCollector, RedditCollector};
use ainews::digest::write_digest;
use ainews::enrichment::{Enricher, DEFAULT_TARGET_LANGUAGE};
use ainews::llm::remote::RemoteLlmProvider;
use ainews::llm::LlmProvider;
use ainews::pipeline::Pipeline;
use ainews::retry::RetryPolicy;

#[derive(Parser, Debug)]
#[command(name = "ainews", about = "Daily AI news digest: collect, enrich, rank, publish")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the output directory from the config
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Collect and rank only, without calling the LLM
    #[arg(long)]
    dry_run: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // API keys usually live in .env
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = Config::load_with_defaults(Some(&default_path), override_path.as_deref())
        .await
        .map_err(|e| {
            error!(%e, "failed to load configuration");
            e
        })?;
    config.validate()?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    let pipeline = if args.dry_run {
        info!("Dry run: LLM enrichment disabled");
        Pipeline::without_enrichment()
    } else {
        Pipeline::new(build_enricher(&config)?)
    };
    let pipeline = register_collectors(pipeline, &config)?;
    if pipeline.collector_count() == 0 {
        warn!("All sources are disabled, nothing to do");
        return Ok(());
    }

    let items = pipeline.run().await;
    if items.is_empty() {
        info!("No items collected. Exiting.");
        return Ok(());
    }

    let output = config.output.unwrap_or_default();
    let dir = args
        .output_dir
        .or_else(|| output.dir.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("news"));
    let generated_at = chrono::Local::now().naive_local();

    let path = write_digest(&dir, generated_at, &items, output.write_json.unwrap_or(false)).await?;
    info!("Digest with {} items saved to {}", items.len(), path.display());
    Ok(())
}

/// Create the enricher and its remote LLM provider from configuration
fn build_enricher(config: &Config) -> Result<Enricher> {
    let llm = config.llm.clone().unwrap_or_default();

    let api_key_env = llm.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY");
    let api_key = std::env::var(api_key_env)
        .with_context(|| format!("LLM API key env var '{}' not set", api_key_env))?;

    let model = llm.model.unwrap_or_else(|| "gpt-4o".to_string());
    let api_url = llm
        .api_url
        .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string());
    let timeout_secs = llm.timeout_seconds.unwrap_or(60);
    let max_tokens = llm.max_tokens.unwrap_or(800);
    let temperature = llm.temperature.unwrap_or(0.3);

    let provider = RemoteLlmProvider::new(api_url, api_key, model).with_defaults(timeout_secs, max_tokens, temperature);
    info!("LLM provider initialized: {}", provider.model());
    let provider: Arc<dyn LlmProvider> = Arc::new(provider);

    let retry = RetryPolicy::new(
        llm.max_attempts.unwrap_or(3),
        Duration::from_secs(llm.retry_delay_seconds.unwrap_or(2)),
    );

    Ok(Enricher::new(provider)
        .with_retry(retry)
        .with_concurrency(llm.concurrency.unwrap_or(5))
        .with_generation(Some(max_tokens), temperature)
        .with_target_language(
            llm.target_language
                .unwrap_or_else(|| DEFAULT_TARGET_LANGUAGE.to_string()),
        ))
}

/// Register every enabled source; all of them are enabled by default
fn register_collectors(mut pipeline: Pipeline, config: &Config) -> Result<Pipeline> {
    let sources = config.sources.clone().unwrap_or_default();

    let hacker_news = sources.hacker_news.unwrap_or_default();
    if hacker_news.enabled.unwrap_or(true) {
        pipeline = pipeline.with_collector(HackerNewsCollector::from_config(&hacker_news)?);
    } else {
        info!("Skipping Hacker News (disabled)");
    }

    let reddit = sources.reddit.unwrap_or_default();
    if reddit.enabled.unwrap_or(true) {
        pipeline = pipeline.with_collector(RedditCollector::from_config(&reddit)?);
    } else {
        info!("Skipping Reddit (disabled)");
    }

    let feeds = sources.feeds.unwrap_or_default();
    if feeds.enabled.unwrap_or(true) {
        pipeline = pipeline.with_collector(FeedCollector::from_config(&feeds)?);
    } else {
        info!("Skipping RSS feeds (disabled)");
    }

    Ok(pipeline)
}
