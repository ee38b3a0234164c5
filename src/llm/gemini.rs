//! Gemini `generateContent` client
//!
//! Sends schema-constrained requests (`responseMimeType: application/json`)
//! and returns the text of the first candidate. Transport retries use
//! exponential backoff with jitter, but the default is a single attempt:
//! a failed dialogue request is surfaced to the user, who re-sends.

use super::{GenerationRequest, Generator, Purpose};
use crate::protocol::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, JSON_MIME_TYPE};
use crate::{Result, SrishtiConfig, SrishtiError};
use futures::future::BoxFuture;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

const RETRY_BASE_DELAY_MS: u64 = 200;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const API_KEY_HEADER: &str = "x-goog-api-key";

/// One failed attempt, classified where the failure is observed
#[derive(Debug)]
struct SendFailure {
    error: SrishtiError,
    retryable: bool,
}

impl SendFailure {
    fn fatal(error: SrishtiError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }

    /// Non-success HTTP status; 5xx and 429 may be retried
    fn from_status(status: reqwest::StatusCode, detail: &str) -> Self {
        let message = if detail.is_empty() {
            format!("API error {status}")
        } else {
            format!("API error {status}: {detail}")
        };
        Self {
            error: SrishtiError::Generation(message),
            retryable: GeminiClient::is_retryable_status(status),
        }
    }

    /// Timeouts and connection failures may be retried
    fn from_transport(e: reqwest::Error) -> Self {
        let retryable = e.is_timeout() || e.is_connect();
        let message = if e.is_timeout() {
            format!("timeout: {e}")
        } else if e.is_connect() {
            format!("network: {e}")
        } else {
            e.to_string()
        };
        Self {
            error: SrishtiError::Generation(message),
            retryable,
        }
    }
}

/// Client for the Generative Language REST API
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    dialogue_model: String,
    memory_model: String,
    max_attempts: u32,
}

impl GeminiClient {
    /// Create a client from config. Without an API key every request fails
    /// with an authorization error.
    pub fn new(config: &SrishtiConfig) -> Self {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        let client = Self::http_client(config.request_timeout_secs);

        info!(
            "Gemini client: dialogue_model={}, memory_model={}, base_url={}, attempts={}, key={}",
            config.model,
            config.memory_model,
            config.base_url,
            config.max_attempts,
            if api_key.is_some() { "set" } else { "missing" }
        );

        Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dialogue_model: config.model.clone(),
            memory_model: config.memory_model.clone(),
            max_attempts: config.max_attempts.max(1),
        }
    }

    /// HTTP client with request timeout and user agent. Falls back to the
    /// default client (no timeout) if the builder fails.
    fn http_client(timeout_secs: u64) -> Client {
        match Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("srishti/", env!("CARGO_PKG_VERSION")))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!(
                    "Failed to build HTTP client ({}); using defaults without the {}s timeout",
                    e, timeout_secs
                );
                Client::new()
            }
        }
    }

    fn model_for(&self, purpose: Purpose) -> &str {
        match purpose {
            Purpose::Dialogue => &self.dialogue_model,
            Purpose::MemoryExtraction => &self.memory_model,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Translate a provider-agnostic request into the wire body
    fn build_body(request: &GenerationRequest) -> GenerateContentRequest {
        let contents = request
            .turns
            .iter()
            .map(|turn| Content::text(Some(turn.role.as_str()), turn.text.clone()))
            .collect();

        let system_instruction = request
            .system_instruction
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Content::text(None, s));

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                response_mime_type: JSON_MIME_TYPE.to_string(),
                response_schema: Some(request.response_schema.clone()),
            },
        }
    }

    /// Exponential backoff with a small deterministic jitter
    fn retry_backoff(attempt: u32) -> Duration {
        let exp = 2u64.saturating_pow(attempt.saturating_sub(1));
        let base_ms = RETRY_BASE_DELAY_MS.saturating_mul(exp);
        let jitter = 1.0 + ((attempt as f64 * 0.37).sin() * 0.1);
        Duration::from_millis((base_ms as f64 * jitter) as u64)
    }

    fn is_retryable_status(status: reqwest::StatusCode) -> bool {
        status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
    }

    async fn generate_with_retry(&self, request: &GenerationRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SrishtiError::Auth("no API key selected".to_string()))?;
        let model = self.model_for(request.purpose).to_string();
        let body = Self::build_body(request);
        debug!(
            "Calling {} ({:?}) with {} turns",
            model,
            request.purpose,
            body.contents.len()
        );

        let mut last_err = None;
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = Self::retry_backoff(attempt);
                warn!(
                    "Generation request failed (attempt {}/{}), retrying in {:?}...",
                    attempt, self.max_attempts, delay
                );
                tokio::time::sleep(delay).await;
            }

            match self.send_once(api_key, &model, &body).await {
                Ok(text) => {
                    debug!("Generation reply: {} bytes", text.len());
                    return Ok(text);
                }
                Err(failure) => {
                    if failure.retryable && attempt + 1 < self.max_attempts {
                        last_err = Some(failure.error);
                        continue;
                    }
                    return Err(failure.error);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            SrishtiError::Generation("all retry attempts exhausted".to_string())
        }))
    }

    async fn send_once(
        &self,
        api_key: &str,
        model: &str,
        body: &GenerateContentRequest,
    ) -> std::result::Result<String, SendFailure> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await
            .map_err(SendFailure::from_transport)?;

        let response = Self::check_response_status(response).await?;

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            SendFailure::fatal(SrishtiError::Generation(format!(
                "malformed response body: {e}"
            )))
        })?;

        parsed
            .first_text()
            .ok_or_else(|| SendFailure::fatal(SrishtiError::Generation(parsed.empty_reason())))
    }

    async fn check_response_status(
        response: reqwest::Response,
    ) -> std::result::Result<reqwest::Response, SendFailure> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = Self::truncate_error_detail(&Self::extract_error_detail(&body), 500);
        Err(SendFailure::from_status(status, &detail))
    }

    fn extract_error_detail(body: &str) -> String {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return String::new();
        }

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Some(msg) = value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
            {
                return msg.to_string();
            }
            if let Some(msg) = value.get("message").and_then(|m| m.as_str()) {
                return msg.to_string();
            }
        }

        trimmed.to_string()
    }

    fn truncate_error_detail(detail: &str, max_chars: usize) -> String {
        if detail.chars().count() <= max_chars {
            return detail.to_string();
        }

        let mut truncated = detail.chars().take(max_chars).collect::<String>();
        truncated.push_str("... [truncated]");
        truncated
    }
}

impl Generator for GeminiClient {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.generate_with_retry(request))
    }
}
