//! LLM Client: the single point of entry for all completion calls.
//!
//! ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
//! Callers depend on the `CompletionProvider` trait; `LlmClient` is the
//! production implementation, built once at startup and shared read-only.
//!
//! The client makes exactly one HTTP attempt per call. Retry policy for
//! rate limits belongs to the caller (see `alignment::engine`).
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(test)]
pub mod mock;
pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all completion calls.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;
const HTTP_TIMEOUT_SECS: u64 = 90;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Per-call knobs passed through to the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    /// Ask for a bare JSON reply; code fences are stripped from the result.
    pub json_mode: bool,
}

impl CompletionOptions {
    pub fn text(temperature: f32) -> Self {
        Self {
            temperature,
            json_mode: false,
        }
    }

    pub fn json(temperature: f32) -> Self {
        Self {
            temperature,
            json_mode: true,
        }
    }
}

/// The completion capability. Implementations must be cheap to share across
/// requests and hold no per-request state.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: CompletionOptions,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    #[serde(rename = "type", default)]
    error_type: String,
    message: String,
}

/// Anthropic Messages API client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, api_key })
    }

    /// Returns `None` when no usable credential is configured: the capability
    /// is absent and callers fall back to deterministic content.
    pub fn from_api_key(api_key: Option<&str>) -> Result<Option<Self>, LlmError> {
        match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Ok(Some(Self::new(key.to_string())?)),
            None => Ok(None),
        }
    }

    /// Makes a single call to the Messages API and returns the full response.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        temperature: f32,
    ) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            temperature,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            return Err(classify_failure(status, &body));
        }

        let llm_response: LlmResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        let system = if options.json_mode {
            format!("{system}\n\n{}", prompts::JSON_ONLY_SYSTEM)
        } else {
            system.to_string()
        };

        let response = self.call(user, &system, options.temperature).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }

        if options.json_mode {
            Ok(strip_json_fences(text).to_string())
        } else {
            Ok(text.to_string())
        }
    }
}

/// Maps a non-success HTTP response onto the error taxonomy.
///
/// Quota / billing problems are terminal and reported separately from
/// transient rate limiting.
fn classify_failure(status: StatusCode, body: &str) -> LlmError {
    let parsed = serde_json::from_str::<AnthropicError>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .unwrap_or_else(|| body.to_string());
    let lowered = message.to_lowercase();
    let quota_signal = lowered.contains("quota")
        || lowered.contains("credit balance")
        || lowered.contains("billing")
        || parsed
            .as_ref()
            .is_some_and(|e| e.error.error_type == "insufficient_quota");

    if status == StatusCode::PAYMENT_REQUIRED || quota_signal {
        LlmError::QuotaExceeded(message)
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        LlmError::RateLimited(message)
    } else {
        LlmError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_missing_or_blank_key_means_capability_absent() {
        assert!(LlmClient::from_api_key(None).unwrap().is_none());
        assert!(LlmClient::from_api_key(Some("")).unwrap().is_none());
        assert!(LlmClient::from_api_key(Some("   ")).unwrap().is_none());
        assert!(LlmClient::from_api_key(Some("sk-test")).unwrap().is_some());
    }

    #[test]
    fn test_classify_rate_limit() {
        let body = r#"{"type":"error","error":{"type":"rate_limit_error","message":"Number of requests has exceeded your rate limit"}}"#;
        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, body),
            LlmError::RateLimited(_)
        ));
    }

    #[test]
    fn test_classify_quota_is_distinct_from_rate_limit() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"Your credit balance is too low to access the API."}}"#;
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, body),
            LlmError::QuotaExceeded(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, "You exceeded your current quota"),
            LlmError::QuotaExceeded(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::PAYMENT_REQUIRED, ""),
            LlmError::QuotaExceeded(_)
        ));
    }

    #[test]
    fn test_classify_other_failures_as_api_errors() {
        match classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom") {
            LlmError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
