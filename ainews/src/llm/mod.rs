use anyhow::Result;

/// Core trait for LLM completion services
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a given prompt
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// Request structure for LLM generation
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub prompt: String,
    /// Optional system message sent ahead of the prompt
    pub system: Option<String>,
    /// Ask the service for a single JSON object as output
    pub json_mode: bool,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

pub mod remote;

/// Remove Markdown code fences (```json ... ``` or ``` ... ```) around a
/// model reply and return the JSON object inside it.
///
/// Text before the opening fence or after the closing one is ignored. When
/// there is no fenced object, the span between the first `{` and the last
/// `}` is used.
pub fn strip_code_fences(text: &str) -> Option<&str> {
    if let Some(open) = text.find("```") {
        let rest = &text[open + 3..];
        // drop the language tag on the opening fence line
        let body = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches("json"),
        };
        let body = match body.find("```") {
            Some(close) => &body[..close],
            None => body,
        }
        .trim();
        if body.starts_with('{') && body.ends_with('}') {
            return Some(body);
        }
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(&text[start..=end]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::strip_code_fences;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), Some("{\"a\": 1}"));
    }

    #[test]
    fn strips_bare_fence() {
        let raw = "```\n{\"a\": 1}\n```\n";
        assert_eq!(strip_code_fences(raw), Some("{\"a\": 1}"));
    }

    #[test]
    fn single_line_fence() {
        assert_eq!(strip_code_fences("```json{\"a\": 1}```"), Some("{\"a\": 1}"));
    }

    #[test]
    fn plain_object_is_untouched() {
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), Some("{\"a\": 1}"));
    }

    #[test]
    fn preamble_is_skipped() {
        assert_eq!(strip_code_fences("Sure! {\"a\": 1} Done."), Some("{\"a\": 1}"));
    }

    #[test]
    fn prose_after_closing_fence_is_dropped() {
        let raw = "```json\n{\"importance_score\": 5}\n```\nHope this helps!";
        assert_eq!(strip_code_fences(raw), Some("{\"importance_score\": 5}"));
    }

    #[test]
    fn preamble_before_fence_is_dropped() {
        let raw = "Here is the analysis:\n```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), Some("{\"a\": 1}"));
    }

    #[test]
    fn unterminated_fence_falls_back_to_braces() {
        let raw = "```json\n{\"a\": 1} trailing words";
        assert_eq!(strip_code_fences(raw), Some("{\"a\": 1}"));
    }

    #[test]
    fn no_object() {
        assert_eq!(strip_code_fences("I cannot help with that"), None);
    }
}
