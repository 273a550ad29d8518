//! Error types for the extraction engine

use thiserror::Error;

/// Errors that can occur during extraction
///
/// Only `Config` and `Runtime` ever reach a caller of the batch operations.
/// `Decode` and `Llm` are recovered per document and surface as a degraded
/// [`graphbuilder_domain::GraphDocument`].
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Invalid or contradictory configuration; raised at construction
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model output could not be decoded, even after repair
    #[error("Decode error: {0}")]
    Decode(String),

    /// The model call failed
    #[error("LLM error: {0}")]
    Llm(String),

    /// A blocking runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::Decode(e.to_string())
    }
}
