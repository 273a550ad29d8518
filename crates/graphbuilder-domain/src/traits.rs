//! Trait definitions for external interactions
//!
//! The language model is the only external collaborator the extraction
//! engine talks to. Provider implementations live in `graphbuilder-llm`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Standing instructions
    System,
    /// Per-call request
    User,
}

/// A single chat message sent to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker
    pub role: Role,
    /// Message body
    pub content: String,
}

impl ChatMessage {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Output contract handed to a model that supports schema-bound output
///
/// Providers expose it as a tool/function definition or as a JSON-schema
/// response format, whichever their API offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputContract {
    /// Tool or schema name
    pub name: String,
    /// What the output represents
    pub description: String,
    /// JSON Schema of the expected object
    pub schema: Value,
}

/// What a model returns for a schema-bound request
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredResponse {
    /// An already-decoded object shaped by the contract
    Object(Value),
    /// Raw tool-call arguments; textual JSON that may be malformed
    Arguments(String),
}

/// Trait for language model operations
///
/// Implemented by the infrastructure layer (graphbuilder-llm)
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Error type for model calls
    type Error: std::fmt::Display + Send;

    /// Generate a free-text completion
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, Self::Error>;

    /// Generate output bound to `contract`
    ///
    /// Only called when [`LanguageModel::supports_structured_output`]
    /// returned `true`.
    async fn generate_structured(
        &self,
        messages: &[ChatMessage],
        contract: &OutputContract,
    ) -> Result<StructuredResponse, Self::Error>;

    /// Whether the model can be bound to an output contract
    ///
    /// Probed once when an engine is built.
    fn supports_structured_output(&self) -> bool {
        false
    }

    /// Model identifier, for logging
    fn model_name(&self) -> &str;
}
