//! Gemini `generateContent` client behind the [`TextGenerator`] seam.

use async_trait::async_trait;
use crm_core::config::AiConfig;
use crm_core::{CrmError, CrmResult};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Opaque text completion: prompt in, text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> CrmResult<String>;
}

/// Failure of a single completion call.
#[derive(Debug)]
pub struct AttemptError {
    pub message: String,
    /// The service said it is overloaded; worth trying again.
    pub retryable: bool,
}

/// Run `call` up to `max_attempts` times, sleeping `backoff * attempt` between
/// retryable failures. Non-retryable failures return immediately.
pub async fn with_retry<F, Fut>(
    max_attempts: u32,
    backoff: Duration,
    mut call: F,
) -> CrmResult<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, AttemptError>>,
{
    for attempt in 1..=max_attempts {
        match call().await {
            Ok(text) => return Ok(text),
            Err(e) if e.retryable => match retry_delay(attempt, max_attempts, backoff) {
                Some(delay) => {
                    warn!(attempt, error = %e.message, "Text generation overloaded, retrying");
                    metrics::counter!("ai.retries").increment(1);
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(attempt, error = %e.message, "Text generation overloaded, giving up");
                }
            },
            Err(e) => return Err(CrmError::TextGeneration(e.message)),
        }
    }
    Err(CrmError::TextGeneration(
        "text generation service overloaded, please try again later".to_string(),
    ))
}

/// Pause before the attempt after `attempt`, or `None` when it was the last.
fn retry_delay(attempt: u32, max_attempts: u32, backoff: Duration) -> Option<Duration> {
    (attempt < max_attempts).then(|| backoff * attempt)
}

pub struct GeminiClient {
    client: Client,
    config: AiConfig,
}

impl GeminiClient {
    pub fn new(config: AiConfig) -> CrmResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| CrmError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn call_once(&self, api_key: &str, prompt: &str) -> Result<String, AttemptError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AttemptError {
                message: e.to_string(),
                retryable: false,
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AttemptError {
                message: format!("Gemini API returned {}: {}", status, detail),
                retryable: status == StatusCode::SERVICE_UNAVAILABLE,
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| AttemptError {
            message: format!("malformed Gemini response: {}", e),
            retryable: false,
        })?;
        parsed.text().ok_or_else(|| AttemptError {
            message: "Gemini response contained no text".to_string(),
            retryable: false,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> CrmResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CrmError::TextGeneration("missing Gemini API key".to_string()))?;

        debug!(model = %self.config.model, prompt_len = prompt.len(), "Requesting completion");
        metrics::counter!("ai.requests").increment(1);

        with_retry(
            self.config.max_retries,
            Duration::from_millis(self.config.retry_backoff_ms),
            || self.call_once(api_key, prompt),
        )
        .await
    }
}

// ─── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn overloaded() -> AttemptError {
        AttemptError {
            message: "503".to_string(),
            retryable: true,
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_overload() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(overloaded())
                } else {
                    Ok("1. Come back for 20% off".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "1. Come back for 20% off");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<String, _>(overloaded()) }
        })
        .await;

        assert!(matches!(result, Err(CrmError::TextGeneration(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retry_delay_stops_at_last_attempt() {
        let backoff = Duration::from_millis(1000);
        assert_eq!(retry_delay(1, 3, backoff), Some(Duration::from_millis(1000)));
        assert_eq!(retry_delay(2, 3, backoff), Some(Duration::from_millis(2000)));
        assert_eq!(retry_delay(3, 3, backoff), None);
        assert_eq!(retry_delay(1, 1, backoff), None);
    }

    #[tokio::test]
    async fn test_single_attempt_gives_up_without_waiting() {
        let started = std::time::Instant::now();
        let result = with_retry(1, Duration::from_secs(60), || async {
            Err::<String, _>(overloaded())
        })
        .await;
        assert!(matches!(result, Err(CrmError::TextGeneration(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_fast() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<String, _>(AttemptError {
                    message: "400 bad request".to_string(),
                    retryable: false,
                })
            }
        })
        .await;

        match result {
            Err(CrmError::TextGeneration(msg)) => assert!(msg.contains("400")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = GeminiClient::new(AiConfig::default()).unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "there"}]}}]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello there"));

        let empty: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(empty.text().is_none());
    }

    #[test]
    fn test_endpoint_uses_model() {
        let client = GeminiClient::new(AiConfig {
            base_url: "https://example.test/v1beta/".to_string(),
            ..AiConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
