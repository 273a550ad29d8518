//! OpenAI-compatible Provider Implementation
//!
//! Talks to any `/chat/completions` endpoint that follows the OpenAI wire
//! format (OpenAI, Azure deployments behind a compatible gateway, vLLM,
//! LM Studio). Structured output is obtained by offering exactly one tool
//! built from the output contract and forcing the model to call it; the
//! tool-call arguments are handed back verbatim, since models regularly emit
//! slightly malformed JSON there.

use crate::http::{build_client, post_json};
use crate::LlmError;
use async_trait::async_trait;
use graphbuilder_domain::{ChatMessage, LanguageModel, OutputContract, StructuredResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default timeout for LLM requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// OpenAI-compatible chat completions provider
pub struct OpenAiProvider {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
    max_retries: u32,
    function_calling: bool,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

impl OpenAiProvider {
    /// Create a provider for `model` at `base_url`
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: DEFAULT_MAX_RETRIES,
            function_calling: true,
        }
    }

    /// Set the bearer token
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
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

    /// Declare whether the deployment supports tool calling
    pub fn with_function_calling(mut self, enabled: bool) -> Self {
        self.function_calling = enabled;
        self
    }

    async fn complete(&self, body: &CompletionRequest<'_>) -> Result<ResponseMessage, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response: CompletionResponse = post_json(
            &self.client,
            &url,
            self.api_key.as_deref(),
            body,
            &self.model,
            self.max_retries,
        )
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))
    }
}

/// Tool definition and forced tool choice for a contract
fn tool_for(contract: &OutputContract) -> (Value, Value) {
    let tool = json!({
        "type": "function",
        "function": {
            "name": contract.name,
            "description": contract.description,
            "parameters": contract.schema,
        }
    });
    let choice = json!({
        "type": "function",
        "function": { "name": contract.name }
    });
    (tool, choice)
}

#[async_trait]
impl LanguageModel for OpenAiProvider {
    type Error = LlmError;

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, Self::Error> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
            tools: None,
            tool_choice: None,
        };
        let message = self.complete(&body).await?;
        message
            .content
            .ok_or_else(|| LlmError::InvalidResponse("response has no content".to_string()))
    }

    async fn generate_structured(
        &self,
        messages: &[ChatMessage],
        contract: &OutputContract,
    ) -> Result<StructuredResponse, Self::Error> {
        let (tool, choice) = tool_for(contract);
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
            tools: Some(vec![tool]),
            tool_choice: Some(choice),
        };
        let message = self.complete(&body).await?;

        message
            .tool_calls
            .into_iter()
            .find(|call| call.function.name == contract.name)
            .map(|call| StructuredResponse::Arguments(call.function.arguments))
            .ok_or_else(|| {
                LlmError::InvalidResponse(format!("model did not call '{}'", contract.name))
            })
    }

    fn supports_structured_output(&self) -> bool {
        self.function_calling
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> OutputContract {
        OutputContract {
            name: "DynamicGraph".to_string(),
            description: "Represents a graph document".to_string(),
            schema: json!({"type": "object", "properties": {}}),
        }
    }

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAiProvider::new("https://example.test/v1/", "gpt-4o")
            .with_api_key("sk-test")
            .with_max_retries(2);
        assert_eq!(provider.base_url, "https://example.test/v1");
        assert_eq!(provider.model_name(), "gpt-4o");
        assert_eq!(provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(provider.max_retries, 2);
        assert!(provider.supports_structured_output());
    }

    #[test]
    fn test_function_calling_toggle() {
        let provider = OpenAiProvider::new(DEFAULT_BASE_URL, "gpt-4o").with_function_calling(false);
        assert!(!provider.supports_structured_output());
    }

    #[test]
    fn test_tool_for_contract() {
        let (tool, choice) = tool_for(&contract());
        assert_eq!(tool["function"]["name"], "DynamicGraph");
        assert_eq!(tool["function"]["parameters"]["type"], "object");
        assert_eq!(choice["function"]["name"], "DynamicGraph");
    }

    #[test]
    fn test_tool_call_response_parsing() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "DynamicGraph", "arguments": "{\"nodes\": [],}"}
                    }]
                }
            }]
        }"#;
        let response: CompletionResponse = serde_json::from_str(raw).unwrap();
        let message = &response.choices[0].message;
        assert!(message.content.is_none());
        assert_eq!(message.tool_calls[0].function.arguments, "{\"nodes\": [],}");
    }

    #[tokio::test]
    async fn test_openai_error_handling() {
        let provider = OpenAiProvider::new("http://localhost:99999/v1", "gpt-4o").with_max_retries(1);
        let result = provider.generate(&[ChatMessage::user("test")]).await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }
}
