use serde::{Deserialize, Serialize};

/// Importance assigned before (or without) a successful enrichment.
pub const DEFAULT_IMPORTANCE: u8 = 3;

/// Importance of an item whose enrichment failed, so it sinks after ranking.
pub const FAILED_IMPORTANCE: u8 = 1;

/// Longest body excerpt kept on an item, in characters.
pub const SNIPPET_MAX_CHARS: usize = 1000;

/// A single news candidate flowing through the pipeline.
///
/// Raw fields are filled by a collector. Derived fields stay at their
/// defaults until the enrichment stage runs exactly once on the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    /// Identity key used for deduplication
    pub url: String,
    /// Origin tag, e.g. `HackerNews`, `Reddit/LocalLLaMA`, `RSS/OpenAI`
    pub source: String,
    pub original_id: String,
    pub content_snippet: String,
    pub score: i64,
    pub comments_count: i64,

    pub translated_title: Option<String>,
    pub summary: Option<String>,
    pub key_points: Vec<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub importance_score: u8,
}

impl NewsItem {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        original_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: source.into(),
            original_id: original_id.into(),
            content_snippet: String::new(),
            score: 0,
            comments_count: 0,
            translated_title: None,
            summary: None,
            key_points: Vec::new(),
            category: None,
            tags: Vec::new(),
            importance_score: DEFAULT_IMPORTANCE,
        }
    }

    pub fn with_snippet(mut self, text: &str) -> Self {
        self.content_snippet = truncate_chars(text, SNIPPET_MAX_CHARS);
        self
    }

    pub fn with_popularity(mut self, score: i64, comments_count: i64) -> Self {
        self.score = score;
        self.comments_count = comments_count;
        self
    }

    /// Title to show in the digest: the translation when available.
    pub fn display_title(&self) -> &str {
        self.translated_title.as_deref().unwrap_or(&self.title)
    }
}

/// Cut `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
