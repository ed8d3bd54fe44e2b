use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::item::{NewsItem, DEFAULT_IMPORTANCE, FAILED_IMPORTANCE};
use crate::llm::{strip_code_fences, LlmProvider, LlmRequest};
use crate::retry::RetryPolicy;

/// Closed set of categories the model may choose from.
pub const CATEGORIES: &[&str] = &[
    "Model Release",
    "Tools & Applications",
    "Research",
    "Industry News",
    "Community Discussion",
];

/// The model answered but gave no usable category.
pub const UNCLASSIFIED: &str = "Unclassified";

/// Every attempt failed; kept apart from [`UNCLASSIFIED`] so operators can
/// tell a broken enrichment from a model that could not decide.
pub const ENRICHMENT_FAILED: &str = "Unclassified (enrichment failed)";

pub const FAILURE_SUMMARY: &str = "AI processing failed, please read the original article.";

pub const DEFAULT_TARGET_LANGUAGE: &str = "Simplified Chinese";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that outputs strict JSON.";
const MAX_TAGS: usize = 5;

/// Fields extracted from one model reply, defaults already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub translated_title: String,
    pub summary: Option<String>,
    pub key_points: Vec<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub importance_score: u8,
}

/// Fields are kept as raw JSON values so one badly typed field falls back
/// to its default instead of failing the whole reply.
#[derive(Debug, Default, Deserialize)]
struct EnrichmentJson {
    #[serde(default, alias = "zh_title")]
    translated_title: Option<Value>,
    #[serde(default)]
    summary: Option<Value>,
    #[serde(default)]
    key_points: Option<Value>,
    #[serde(default)]
    category: Option<Value>,
    #[serde(default)]
    tags: Option<Value>,
    #[serde(default, alias = "score")]
    importance_score: Option<Value>,
}

/// Parse a model reply (fences already stripped) into an [`Enrichment`].
/// Missing fields fall back to defaults; only malformed JSON is an error.
pub fn parse_enrichment(json: &str, original_title: &str) -> Result<Enrichment> {
    let raw: EnrichmentJson =
        serde_json::from_str(json).with_context(|| format!("Failed to parse enrichment JSON: {}", json))?;

    let translated_title = text_field(raw.translated_title).unwrap_or_else(|| original_title.to_string());
    let category = text_field(raw.category);

    Ok(Enrichment {
        translated_title,
        summary: text_field(raw.summary),
        key_points: string_list(raw.key_points, &['\n']),
        category: normalize_category(category.as_deref()),
        tags: normalize_tags(string_list(raw.tags, &[',', '，'])),
        importance_score: parse_importance(raw.importance_score.as_ref()),
    })
}

/// Non-empty trimmed string; any other JSON type counts as missing.
fn text_field(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// A list of strings from either an array (non-string entries dropped) or a
/// single string split on `separators`. Anything else gives an empty list.
fn string_list(value: Option<Value>, separators: &[char]) -> Vec<String> {
    let parts: Vec<String> = match value {
        Some(Value::Array(entries)) => entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s.split(separators).map(str::to_string).collect(),
        _ => Vec::new(),
    };

    parts
        .into_iter()
        .map(|p| p.trim().trim_start_matches(&['-', '*', '•'][..]).trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn normalize_category(category: Option<&str>) -> String {
    let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) else {
        return UNCLASSIFIED.to_string();
    };
    let lowered = category.to_lowercase();
    // tolerate decorations such as a leading emoji
    CATEGORIES
        .iter()
        .find(|c| lowered.contains(&c.to_lowercase()))
        .map(|c| c.to_string())
        .unwrap_or_else(|| UNCLASSIFIED.to_string())
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        out.push(tag.to_string());
        if out.len() == MAX_TAGS {
            break;
        }
    }
    out
}

fn parse_importance(value: Option<&Value>) -> u8 {
    let score = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f.round() as i64)),
        _ => None,
    };
    score.map(|s| s.clamp(1, 5) as u8).unwrap_or(DEFAULT_IMPORTANCE)
}

fn apply(item: &mut NewsItem, enrichment: Enrichment) {
    item.translated_title = Some(enrichment.translated_title);
    item.summary = enrichment.summary;
    item.key_points = enrichment.key_points;
    item.category = Some(enrichment.category);
    item.tags = enrichment.tags;
    item.importance_score = enrichment.importance_score;
}

/// Mark an item whose enrichment could not be completed. Raw fields stay.
pub fn degrade(item: &mut NewsItem) {
    item.translated_title = Some(item.title.clone());
    item.summary = Some(FAILURE_SUMMARY.to_string());
    item.key_points.clear();
    item.tags.clear();
    item.category = Some(ENRICHMENT_FAILED.to_string());
    item.importance_score = FAILED_IMPORTANCE;
}

pub fn is_degraded(item: &NewsItem) -> bool {
    item.category.as_deref() == Some(ENRICHMENT_FAILED)
}

/// Drives LLM enrichment for single items and for batches.
///
/// A batch runs one task per item. The semaphore bounds the number of LLM
/// calls in flight; a permit is held for one call only, so an item waiting
/// out its retry delay leaves its slot to the others.
#[derive(Clone)]
pub struct Enricher {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    permits: Arc<Semaphore>,
    target_language: String,
    max_tokens: Option<usize>,
    temperature: f32,
}

impl Enricher {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            permits: Arc::new(Semaphore::new(5)),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            max_tokens: None,
            temperature: 0.3,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(concurrency.max(1)));
        self
    }

    pub fn with_target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = language.into();
        self
    }

    pub fn with_generation(mut self, max_tokens: Option<usize>, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn build_prompt(&self, item: &NewsItem) -> String {
        let snippet = if item.content_snippet.is_empty() {
            "(none)"
        } else {
            item.content_snippet.as_str()
        };
        let categories = CATEGORIES
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"You are a professional editor of AI technology news. Analyse the news item below and answer with a single JSON object.

Title: {title}
Source: {source}
Snippet: {snippet}

Fields:
1. "translated_title": the title translated into {language}, faithful and fluent.
2. "summary": a summary in {language} of 50-80 words (characters for Chinese or Japanese) covering the core facts.
3. "key_points": an ordered list of 2-4 short key points in {language}.
4. "category": exactly one of [{categories}].
5. "tags": 2-3 short English tags (for example LLM, RAG, Agent, CV).
6. "importance_score": an integer from 1 to 5 rating how important this news is for the AI field.

Output only the JSON object, without Markdown code fences."#,
            title = item.title,
            source = item.source,
            snippet = snippet,
            language = self.target_language,
            categories = categories,
        )
    }

    async fn request_enrichment(&self, item: &NewsItem) -> Result<Enrichment> {
        let request = LlmRequest {
            prompt: self.build_prompt(item),
            system: Some(SYSTEM_PROMPT.to_string()),
            json_mode: true,
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
            timeout_seconds: None,
        };

        let response = {
            let _permit = self.permits.acquire().await.context("enrichment pool closed")?;
            self.provider.generate(request).await?
        };
        debug!(
            "enrichment: {} tokens used by {}",
            response.usage.total_tokens, response.model
        );

        let json = strip_code_fences(&response.content).context("No JSON object in LLM response")?;
        parse_enrichment(json, &item.title)
    }

    /// Enrich one item. Never fails: exhausted retries give a degraded item.
    pub async fn enrich(&self, mut item: NewsItem) -> NewsItem {
        if item.title.is_empty() {
            return item;
        }

        let label = format!("enrichment of {:?}", item.title);
        let outcome = self.retry.run(&label, |_| self.request_enrichment(&item)).await;

        match outcome {
            Ok(enrichment) => apply(&mut item, enrichment),
            Err(e) => {
                error!("enrichment: giving up on {:?}: {:#}", item.title, e);
                degrade(&mut item);
            }
        }
        item
    }

    /// Enrich every item concurrently; output order equals input order.
    pub async fn enrich_batch(&self, items: Vec<NewsItem>) -> Vec<NewsItem> {
        info!("enrichment: processing {} items", items.len());

        let handles: Vec<_> = items
            .iter()
            .cloned()
            .map(|item| {
                let enricher = self.clone();
                tokio::spawn(async move { enricher.enrich(item).await })
            })
            .collect();

        let mut enriched = Vec::with_capacity(items.len());
        for (original, handle) in items.into_iter().zip(handles) {
            match handle.await {
                Ok(item) => enriched.push(item),
                Err(e) => {
                    error!("enrichment: task for {:?} aborted: {}", original.title, e);
                    let mut item = original;
                    degrade(&mut item);
                    enriched.push(item);
                }
            }
        }

        let failed = enriched.iter().filter(|i| is_degraded(i)).count();
        info!(
            "enrichment: {}/{} items enriched, {} degraded",
            enriched.len() - failed,
            enriched.len(),
            failed
        );
        enriched
    }
}
