//! Extraction strategy selection
//!
//! The mode is decided once, when a transformer is built, and stored on it.
//! Documents are never routed per call.

use crate::error::ExtractorError;
use crate::schema::TypeSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// How the model is asked for a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// The model returns data shaped by the output contract
    NativeStructured,
    /// The model returns free text that is parsed and repaired
    UnstructuredWithRepair,
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMode::NativeStructured => write!(f, "native-structured"),
            ExtractionMode::UnstructuredWithRepair => write!(f, "unstructured-with-repair"),
        }
    }
}

/// Pick the extraction mode and the schema that goes with it
///
/// `model_supports_native` is the result of the one-time capability probe.
/// Property extraction on a model without structured output is a
/// configuration error. A capable model that the caller asked not to use
/// natively falls back to free text, and a named property list is widened
/// to any key with a warning.
pub fn select_mode(
    model_supports_native: bool,
    use_function_call: bool,
    schema: &TypeSchema,
) -> Result<(ExtractionMode, TypeSchema), ExtractorError> {
    let selected = if model_supports_native && use_function_call {
        (ExtractionMode::NativeStructured, schema.clone())
    } else if !model_supports_native {
        if schema.properties().is_enabled() {
            return Err(ExtractorError::Config(
                "property extraction requires native structured-output support".to_string(),
            ));
        }
        (ExtractionMode::UnstructuredWithRepair, schema.clone())
    } else {
        (
            ExtractionMode::UnstructuredWithRepair,
            schema.without_named_properties(),
        )
    };

    info!(
        mode = %selected.0,
        model_supports_native,
        use_function_call,
        "Selected extraction mode"
    );
    Ok(selected)
}
