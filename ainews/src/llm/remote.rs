use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};

/// Chat completions client for OpenAI-compatible endpoints
/// (OpenAI, DeepSeek, Ollama, vLLM and friends).
pub struct RemoteLlmProvider {
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
    max_tokens: usize,
    temperature: f32,
    client: reqwest::Client,
}

impl RemoteLlmProvider {
    /// `endpoint` is the full chat completions URL, e.g.
    /// `https://api.openai.com/v1/chat/completions`.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(60),
            max_tokens: 800,
            temperature: 0.3,
            client: reqwest::Client::new(),
        }
    }

    /// Values used when a request leaves them unset
    pub fn with_defaults(mut self, timeout_secs: u64, max_tokens: usize, temperature: f32) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_body(&self, request: LlmRequest) -> ChatBody {
        let messages = request
            .system
            .map(|content| ChatMessage {
                role: "system",
                content,
            })
            .into_iter()
            .chain(std::iter::once(ChatMessage {
                role: "user",
                content: request.prompt,
            }))
            .collect();

        ChatBody {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            temperature: request.temperature.unwrap_or(self.temperature),
            response_format: request.json_mode.then_some(ResponseFormat { kind: "json_object" }),
        }
    }

    async fn exchange(&self, body: &ChatBody<'_>) -> Result<ChatReply> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .context("LLM HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error {}: {}", status, text);
        }

        response.json().await.context("Failed to parse LLM response")
    }
}

#[async_trait::async_trait]
impl LlmProvider for RemoteLlmProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let timeout = request.timeout_seconds.map(Duration::from_secs).unwrap_or(self.timeout);
        let body = self.chat_body(request);

        // bounds the body download too, not only the connect
        let reply = tokio::time::timeout(timeout, self.exchange(&body))
            .await
            .context("LLM request timed out")??;

        let content = reply
            .choices
            .into_iter()
            .next()
            .context("LLM response has no choices")?
            .message
            .content
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            usage: reply.usage.map(UsageMetadata::from).unwrap_or_default(),
            model: reply.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ReplyChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TokenUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

impl From<TokenUsage> for UsageMetadata {
    fn from(usage: TokenUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}
