use crate::types::{CurationError, Result};
use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Adapter over an AI completion provider. The rest of the worker treats
/// completions as opaque text; which provider produced them is invisible
/// past this seam.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Get the name of this adapter.
    fn adapter_name(&self) -> String;

    /// Run one completion call and return the raw completion text.
    ///
    /// The adapter owns timeout and retry policy; callers only see the
    /// final outcome.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Connection settings for the HTTP adapter.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 2,
        }
    }
}

/// HTTP adapter speaking the OpenAI-style chat-completions wire form.
pub struct HttpLlmAdapter {
    client: Client,
    config: LlmConfig,
}

impl HttpLlmAdapter {
    pub fn new(config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    async fn request_completion(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.0,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CurationError::General(format!(
                "Provider returned HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let payload: serde_json::Value = response.json().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or(CurationError::EmptyCompletion)
    }
}

#[async_trait]
impl LlmAdapter for HttpLlmAdapter {
    fn adapter_name(&self) -> String {
        format!("HTTP LLM Adapter ({})", self.config.model)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 16),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.request_completion(prompt).await {
                Ok(text) => {
                    debug!(
                        "Completion call succeeded on attempt {} ({} chars)",
                        attempt + 1,
                        text.len()
                    );
                    return Ok(text);
                }
                Err(e) => {
                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!(
                                "Completion attempt {} failed ({}), retrying in {:?}",
                                attempt + 1,
                                e,
                                delay
                            );
                            last_error = Some(e);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    last_error = Some(e);
                    break;
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| CurationError::General("Completion call never attempted".to_string())))
    }
}

/// Mock adapter for development and testing. Returns canned responses in
/// order, repeating the last one when the queue runs dry.
pub struct MockLlmAdapter {
    name: String,
    responses: std::sync::Mutex<Vec<String>>,
    response_delay_ms: u64,
}

impl MockLlmAdapter {
    pub fn new(name: String, response: String) -> Self {
        Self {
            name,
            responses: std::sync::Mutex::new(vec![response]),
            response_delay_ms: 0,
        }
    }

    pub fn with_responses(name: String, responses: Vec<String>) -> Self {
        Self {
            name,
            responses: std::sync::Mutex::new(responses),
            response_delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    fn adapter_name(&self) -> String {
        format!("Mock LLM Adapter ({})", self.name)
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| CurationError::General("Mock adapter lock poisoned".to_string()))?;
        if responses.len() > 1 {
            Ok(responses.remove(0))
        } else {
            responses
                .first()
                .cloned()
                .ok_or_else(|| CurationError::General("Mock adapter has no responses".to_string()))
        }
    }
}

