//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local chat API, for running extraction
//! against local models.
//!
//! # Features
//!
//! - Async HTTP communication with the `/api/chat` endpoint
//! - Structured output through Ollama's JSON-schema `format` field
//! - Retry logic with exponential backoff
//! - Timeout handling
//!
//! # Examples
//!
//! ```no_run
//! use graphbuilder_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3.1");
//! ```

use crate::http::{build_client, post_json};
use crate::LlmError;
use async_trait::async_trait;
use graphbuilder_domain::{ChatMessage, LanguageModel, OutputContract, StructuredResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests (120 seconds; extraction prompts are long)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
    structured_output: bool,
}

/// Request body for the Ollama chat API
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a Value>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Response from the Ollama chat API
#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[allow(dead_code)]
    done: bool,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.1", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: DEFAULT_MAX_RETRIES,
            structured_output: true,
        }
    }

    /// Create a new Ollama provider with default settings
    ///
    /// Uses `http://localhost:11434` as endpoint and requires a model name.
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    /// Declare whether the served model honours JSON-schema `format`
    ///
    /// Older or smaller models ignore the schema; turning this off makes
    /// the extraction engine fall back to prompt-driven output.
    pub fn with_structured_output(mut self, enabled: bool) -> Self {
        self.structured_output = enabled;
        self
    }

    async fn chat(&self, messages: &[ChatMessage], format: Option<&Value>) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.endpoint);
        let body = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            format,
            options: OllamaOptions { temperature: 0.0 },
        };

        let response: OllamaChatResponse =
            post_json(&self.client, &url, None, &body, &self.model, self.max_retries).await?;
        Ok(response.message.content)
    }
}

#[async_trait]
impl LanguageModel for OllamaProvider {
    type Error = LlmError;

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, Self::Error> {
        self.chat(messages, None).await
    }

    async fn generate_structured(
        &self,
        messages: &[ChatMessage],
        contract: &OutputContract,
    ) -> Result<StructuredResponse, Self::Error> {
        // Ollama returns the schema-shaped object as message text
        let content = self.chat(messages, Some(&contract.schema)).await?;
        Ok(StructuredResponse::Arguments(content))
    }

    fn supports_structured_output(&self) -> bool {
        self.structured_output
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
