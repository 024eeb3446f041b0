use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::app_config::BackendConfig;
use crate::errors::BackendError;
use crate::translation::backend::{TranslationBackend, TranslationRequest};
use crate::translation::prompts::{PromptTemplate, TranslationPromptBuilder};

/// Translation backend talking to a local Ollama server
///
/// One `/api/generate` call per request, without streaming. Retries are the
/// orchestrator's business; this client only classifies failures.
#[derive(Debug)]
pub struct OllamaBackend {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    model: String,
    temperature: f32,
    system_prompt: PromptTemplate,
    /// Client timeout, reported by `BackendError::Timeout`
    timeout_ms: u64,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }
}

impl OllamaBackend {
    /// Create a client from the backend settings
    ///
    /// Uses connection pooling since several chunks are translated at once.
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| anyhow::anyhow!("Invalid Ollama endpoint {:?}: {}", config.endpoint, e))?;

        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = Client::builder()
            .timeout(timeout)
            // Ollama speaks HTTP/1.1
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(20)
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            base_url: endpoint.as_str().trim_end_matches('/').to_string(),
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            system_prompt: PromptTemplate::new(&config.system_prompt),
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate text from the Ollama API
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, BackendError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.request_error("Failed to send request to Ollama API", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            let message = format!("Ollama API error ({}): {}", status, error_text);
            return Err(if status.as_u16() == 429 {
                BackendError::RateLimited(message)
            } else {
                BackendError::RequestFailed(message)
            });
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| self.request_error("Failed to read Ollama response", e))?;

        parse_generation(&response_text)
    }

    fn request_error(&self, context: &str, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            debug!("Ollama request timed out after {} ms: {}", self.timeout_ms, e);
            BackendError::Timeout(self.timeout_ms)
        } else {
            BackendError::RequestFailed(format!("{}: {}", context, e))
        }
    }
}

/// Parse a generate answer, accepting a single object or a JSONL stream
pub(crate) fn parse_generation(response_text: &str) -> Result<GenerationResponse, BackendError> {
    if let Ok(generated) = serde_json::from_str::<GenerationResponse>(response_text) {
        return Ok(generated);
    }

    // Streaming answers arrive as one JSON object per line
    let mut full_response = String::new();
    let mut last: Option<serde_json::Value> = None;
    for line in response_text.lines().filter(|line| !line.trim().is_empty()) {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };
        if let Some(part) = value.get("response").and_then(|v| v.as_str()) {
            full_response.push_str(part);
        }
        last = Some(value);
    }

    match last {
        Some(value) => Ok(GenerationResponse {
            model: value
                .get("model")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            response: full_response,
            done: value.get("done").and_then(|v| v.as_bool()).unwrap_or(true),
            prompt_eval_count: value.get("prompt_eval_count").and_then(|v| v.as_u64()),
            eval_count: value.get("eval_count").and_then(|v| v.as_u64()),
        }),
        None => {
            let preview: String = response_text.chars().take(500).collect();
            error!("Failed to parse Ollama API response. Raw response (first 500 chars): {}", preview);
            Err(BackendError::InvalidResponse(
                "Ollama response contains invalid JSON".to_string(),
            ))
        }
    }
}

#[async_trait]
impl TranslationBackend for OllamaBackend {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, BackendError> {
        let generation = GenerationRequest::new(&self.model, TranslationPromptBuilder::new(request).build())
            .system(
                self.system_prompt
                    .render(&request.source_language, &request.target_language),
            )
            .temperature(self.temperature);

        let response = self.generate(&generation).await?;
        debug!(
            "Ollama answered with {} chars (prompt tokens: {:?}, eval tokens: {:?})",
            response.response.len(),
            response.prompt_eval_count,
            response.eval_count
        );

        let text = response.response.trim();
        if text.is_empty() {
            return Err(BackendError::InvalidResponse("Ollama returned an empty response".to_string()));
        }
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
