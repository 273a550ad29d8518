//! GraphBuilder LLM Provider Layer
//!
//! Pluggable language model implementations for graph extraction.
//!
//! # Architecture
//!
//! This crate provides implementations of the `LanguageModel` trait from
//! `graphbuilder-domain`. It supports multiple LLM backends with a common
//! interface.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama API integration (JSON-schema output)
//! - `OpenAiProvider`: OpenAI-compatible chat API (forced tool calling)
//!
//! # Examples
//!
//! ```
//! use graphbuilder_domain::{ChatMessage, LanguageModel};
//! use graphbuilder_llm::MockProvider;
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate(&[ChatMessage::user("test prompt")]).await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

mod http;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use graphbuilder_domain::{ChatMessage, LanguageModel, OutputContract, StructuredResponse};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// The provider cannot serve this kind of request
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// A scripted reply, selected when the prompt contains its key
#[derive(Debug, Clone)]
struct ScriptedReply {
    key: String,
    response: Option<String>,
    delay: Option<Duration>,
}

/// Mock LLM provider for deterministic testing
///
/// This provider returns pre-configured responses without making any network
/// calls. A reply is selected by the first registered key that appears in the
/// final message of the prompt (where the document text lives), falling back
/// to the default response.
///
/// # Examples
///
/// ```
/// use graphbuilder_domain::{ChatMessage, LanguageModel};
/// use graphbuilder_llm::MockProvider;
///
/// # tokio_test::block_on(async {
/// let mut provider = MockProvider::new("[]");
/// provider.add_response("Alice", r#"[{"head": "Alice"}]"#);
///
/// let reply = provider.generate(&[ChatMessage::user("Text: Alice")]).await.unwrap();
/// assert!(reply.contains("Alice"));
/// let reply = provider.generate(&[ChatMessage::user("Text: Bob")]).await.unwrap();
/// assert_eq!(reply, "[]");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    replies: Arc<Mutex<Vec<ScriptedReply>>>,
    call_count: Arc<Mutex<usize>>,
    prompts: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    contracts: Arc<Mutex<Vec<OutputContract>>>,
    structured: bool,
    decoded_objects: bool,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            replies: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            contracts: Arc::new(Mutex::new(Vec::new())),
            structured: false,
            decoded_objects: false,
        }
    }

    /// Advertise native structured output; replies come back as raw
    /// tool-call arguments
    pub fn with_structured_output(mut self) -> Self {
        self.structured = true;
        self
    }

    /// Like [`MockProvider::with_structured_output`], but replies that parse
    /// as JSON are returned already decoded
    pub fn with_decoded_objects(mut self) -> Self {
        self.structured = true;
        self.decoded_objects = true;
        self
    }

    /// Add a specific response for prompts containing `key`
    pub fn add_response(&mut self, key: impl Into<String>, response: impl Into<String>) {
        self.push(ScriptedReply {
            key: key.into(),
            response: Some(response.into()),
            delay: None,
        });
    }

    /// Add a response that is returned only after `delay`
    pub fn add_delayed_response(
        &mut self,
        key: impl Into<String>,
        response: impl Into<String>,
        delay: Duration,
    ) {
        self.push(ScriptedReply {
            key: key.into(),
            response: Some(response.into()),
            delay: Some(delay),
        });
    }

    /// Configure to return an error for prompts containing `key`
    pub fn add_error(&mut self, key: impl Into<String>) {
        self.push(ScriptedReply {
            key: key.into(),
            response: None,
            delay: None,
        });
    }

    /// Get the number of times the model was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        *self.call_count.lock().unwrap() = 0;
    }

    /// Every prompt received so far, in call order
    pub fn recorded_prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts.lock().unwrap().clone()
    }

    /// Every output contract received so far, in call order
    pub fn recorded_contracts(&self) -> Vec<OutputContract> {
        self.contracts.lock().unwrap().clone()
    }

    fn push(&mut self, reply: ScriptedReply) {
        self.replies.lock().unwrap().push(reply);
    }

    async fn reply(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        *self.call_count.lock().unwrap() += 1;
        self.prompts.lock().unwrap().push(messages.to_vec());

        let text = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        let scripted = self
            .replies
            .lock()
            .unwrap()
            .iter()
            .find(|r| text.contains(&r.key))
            .cloned();

        let Some(scripted) = scripted else {
            return Ok(self.default_response.clone());
        };

        if let Some(delay) = scripted.delay {
            tokio::time::sleep(delay).await;
        }

        scripted
            .response
            .ok_or_else(|| LlmError::Other(format!("Mock error for '{}'", scripted.key)))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LanguageModel for MockProvider {
    type Error = LlmError;

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, Self::Error> {
        self.reply(messages).await
    }

    async fn generate_structured(
        &self,
        messages: &[ChatMessage],
        contract: &OutputContract,
    ) -> Result<StructuredResponse, Self::Error> {
        if !self.structured {
            return Err(LlmError::Unsupported(
                "mock provider is not configured for structured output".to_string(),
            ));
        }
        self.contracts.lock().unwrap().push(contract.clone());

        let text = self.reply(messages).await?;
        if self.decoded_objects {
            if let Ok(value) = serde_json::from_str(&text) {
                return Ok(StructuredResponse::Object(value));
            }
        }
        Ok(StructuredResponse::Arguments(text))
    }

    fn supports_structured_output(&self) -> bool {
        self.structured
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
