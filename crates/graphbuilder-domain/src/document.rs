//! Source documents and the graph documents extracted from them

use crate::node::Node;
use crate::relationship::Relationship;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A unit of input text with arbitrary metadata
///
/// The metadata is never interpreted by the engine; it travels untouched
/// into [`GraphDocument::source`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Page text
    pub text: String,

    /// Caller-supplied metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Create a document without metadata
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Map::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Which stage of a single document's extraction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The model output could not be parsed, even after repair
    Decode,
    /// The model call itself failed
    Transport,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Decode => write!(f, "decode"),
            FailureKind::Transport => write!(f, "transport"),
        }
    }
}

/// Whether a graph document reflects a usable model answer
///
/// A degraded document always has empty node and relationship lists. This
/// is what separates "the model failed" from "the text had nothing to
/// extract".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// The model answer was decoded and normalized
    #[default]
    Complete,
    /// Extraction failed; the document contributes nothing
    Degraded {
        /// Failing stage
        failure: FailureKind,
        /// Diagnostic message
        message: String,
    },
}

/// Nodes and relationships extracted from one source document
///
/// Created once per input document by the transformer and handed over to
/// the caller; the engine keeps no reference to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Document the graph was extracted from
    pub source: Document,

    /// Extracted nodes, in model order
    pub nodes: Vec<Node>,

    /// Extracted relationships, in model order
    pub relationships: Vec<Relationship>,

    /// Diagnostic marker
    #[serde(default)]
    pub outcome: ExtractionOutcome,
}

impl GraphDocument {
    /// A successfully extracted graph
    pub fn complete(source: Document, nodes: Vec<Node>, relationships: Vec<Relationship>) -> Self {
        Self {
            source,
            nodes,
            relationships,
            outcome: ExtractionOutcome::Complete,
        }
    }

    /// An empty graph standing in for a failed extraction
    pub fn degraded(source: Document, failure: FailureKind, message: impl Into<String>) -> Self {
        Self {
            source,
            nodes: Vec::new(),
            relationships: Vec::new(),
            outcome: ExtractionOutcome::Degraded {
                failure,
                message: message.into(),
            },
        }
    }

    /// Whether extraction failed for this document
    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::Degraded { .. })
    }

    /// Whether the graph has neither nodes nor relationships
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}
