//! Text-generation backends with retry and backoff.
//!
//! Uses enum dispatch instead of trait objects because async methods are
//! not dyn-compatible in Rust. Two backends exist:
//!
//! - [`OpenAiGenerator`] -- any OpenAI-compatible chat completions API
//!   (`OpenAI`, `DeepSeek`, Ollama), over HTTP via `reqwest`.
//! - [`ScriptedGenerator`] -- deterministic canned responses, used by
//!   tests and by the engine when no API key is configured.
//!
//! The HTTP backend retries transient failures (rate limits, 5xx, network
//! errors) with linear backoff before giving up. Callers only ever see
//! [`GenerationUnavailable`] on failure.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::GenerationUnavailable;

/// Maximum number of attempts per generation call.
const MAX_RETRIES: u64 = 3;

/// Base backoff delay between attempts, in milliseconds.
const BACKOFF_BASE_MS: u64 = 2_000;

/// Per-request timeout for the HTTP backend.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// A text-generation backend.
///
/// Construct via [`TextGenerator::openai`] or [`TextGenerator::scripted`].
pub enum TextGenerator {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiGenerator),
    /// Deterministic canned responses.
    Scripted(ScriptedGenerator),
}

impl TextGenerator {
    /// Create an HTTP backend for an OpenAI-compatible API.
    pub fn openai(api_url: &str, api_key: &str, model: &str) -> Self {
        Self::OpenAi(OpenAiGenerator::new(api_url, api_key, model))
    }

    /// Create a scripted backend from a queue of responses.
    pub fn scripted(generator: ScriptedGenerator) -> Self {
        Self::Scripted(generator)
    }

    /// Send a prompt and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationUnavailable`] once all retries are exhausted
    /// or the scripted queue cannot produce a response.
    pub async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        temperature: f32,
    ) -> Result<String, GenerationUnavailable> {
        match self {
            Self::OpenAi(backend) => backend.generate(prompt, system_prompt, temperature).await,
            Self::Scripted(backend) => backend.next_response(),
        }
    }

    /// Human-readable backend name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Scripted(_) => "scripted",
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// HTTP backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions`. Rate limits (429) wait
/// `base × attempt × 2` before retrying; server errors (5xx) and network
/// failures wait `base × attempt`. Any other non-success status aborts
/// immediately.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    /// Create a new backend against the given API base URL.
    pub fn new(api_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
        }
    }

    /// Send a prompt with retry/backoff and return the response text.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        temperature: f32,
    ) -> Result<String, GenerationUnavailable> {
        let url = format!("{}/chat/completions", self.api_url);

        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": prompt}));

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
        });

        let mut last_error = String::from("no attempts made");

        for attempt in 1..=MAX_RETRIES {
            let response = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .timeout(REQUEST_TIMEOUT)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = format!("network error: {e}");
                    warn!(attempt, max = MAX_RETRIES, error = %e, "LLM request failed");
                    backoff(BACKOFF_BASE_MS.saturating_mul(attempt)).await;
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 {
                let wait_ms = BACKOFF_BASE_MS.saturating_mul(attempt).saturating_mul(2);
                warn!(attempt, max = MAX_RETRIES, wait_ms, "LLM rate limited (429)");
                last_error = String::from("rate limited (429)");
                backoff(wait_ms).await;
                continue;
            }

            if status.is_server_error() {
                let wait_ms = BACKOFF_BASE_MS.saturating_mul(attempt);
                warn!(
                    attempt,
                    max = MAX_RETRIES,
                    status = status.as_u16(),
                    wait_ms,
                    "LLM server error"
                );
                last_error = format!("server error ({status})");
                backoff(wait_ms).await;
                continue;
            }

            if !status.is_success() {
                let error_body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("unable to read error body"));
                return Err(GenerationUnavailable::new(format!(
                    "API returned {status}: {error_body}"
                )));
            }

            let json: serde_json::Value = match response.json().await {
                Ok(j) => j,
                Err(e) => {
                    return Err(GenerationUnavailable::new(format!(
                        "response body was not JSON: {e}"
                    )));
                }
            };

            let content = extract_chat_content(&json)?;
            debug!(model = self.model, length = content.len(), "LLM response received");
            return Ok(content);
        }

        Err(GenerationUnavailable::new(format!(
            "all {MAX_RETRIES} attempts exhausted; last error: {last_error}"
        )))
    }
}

/// Sleep between retry attempts.
async fn backoff(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Extract the text content from a chat completions response.
fn extract_chat_content(json: &serde_json::Value) -> Result<String, GenerationUnavailable> {
    if let Some(error) = json.get("error") {
        return Err(GenerationUnavailable::new(format!("API error: {error}")));
    }
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            GenerationUnavailable::new("response missing choices[0].message.content")
        })
}

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

/// Deterministic generator that replays a queue of canned responses.
///
/// When the queue is exhausted it returns the configured fallback
/// response, or fails with [`GenerationUnavailable`] if none is set --
/// which makes it double as a failure-injection stub in tests.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
    fallback: Option<String>,
}

impl ScriptedGenerator {
    /// Queue up a fixed sequence of responses, consumed in order.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            fallback: None,
        }
    }

    /// A generator that returns the same response forever.
    pub fn always(response: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Some(response.into()),
        }
    }

    /// A generator that fails every call, for exercising fallbacks.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: None,
        }
    }

    /// Pop the next scripted response.
    fn next_response(&self) -> Result<String, GenerationUnavailable> {
        let mut queue = self
            .responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(front) = queue.pop_front() {
            return Ok(front);
        }
        drop(queue);
        self.fallback.clone().ok_or_else(|| {
            GenerationUnavailable::new("scripted generator exhausted with no fallback")
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_consumes_responses_in_order() {
        let generator = TextGenerator::scripted(ScriptedGenerator::new(["one", "two"]));
        assert_eq!(generator.generate("p", None, 0.7).await.unwrap(), "one");
        assert_eq!(generator.generate("p", None, 0.7).await.unwrap(), "two");
        assert!(generator.generate("p", None, 0.7).await.is_err());
    }

    #[tokio::test]
    async fn scripted_always_repeats() {
        let generator = TextGenerator::scripted(ScriptedGenerator::always("same"));
        assert_eq!(generator.generate("p", None, 0.7).await.unwrap(), "same");
        assert_eq!(generator.generate("p", None, 0.7).await.unwrap(), "same");
    }

    #[tokio::test]
    async fn failing_generator_reports_unavailable() {
        let generator = TextGenerator::scripted(ScriptedGenerator::failing());
        let err = generator.generate("p", None, 0.7).await.unwrap_err();
        assert!(err.reason.contains("exhausted"));
    }

    #[test]
    fn extract_chat_content_valid() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "hello"}}]
        });
        assert_eq!(extract_chat_content(&json).unwrap(), "hello");
    }

    #[test]
    fn extract_chat_content_missing_fields() {
        let json = serde_json::json!({"choices": []});
        assert!(extract_chat_content(&json).is_err());
    }

    #[test]
    fn extract_chat_content_embedded_error() {
        let json = serde_json::json!({"error": {"message": "quota exceeded"}});
        let err = extract_chat_content(&json).unwrap_err();
        assert!(err.reason.contains("quota"));
    }
}
