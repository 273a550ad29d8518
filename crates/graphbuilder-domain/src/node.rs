//! Node module - typed, identified entities

use crate::label::format_node_type;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An entity extracted from text
///
/// `id` is the human-readable identifier the model chose ("Adam",
/// "Microsoft"), never a synthetic integer. Uniqueness is per document; the
/// engine does not merge nodes across documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Human-readable identifier
    pub id: String,

    /// Title-cased type label such as "Person"
    #[serde(rename = "type")]
    pub node_type: String,

    /// Extracted properties, empty unless property extraction is enabled
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Node {
    /// Create a node, trimming the id and title-casing the type
    pub fn new(id: impl AsRef<str>, node_type: impl AsRef<str>) -> Self {
        Self {
            id: id.as_ref().trim().to_string(),
            node_type: format_node_type(node_type.as_ref()),
            properties: BTreeMap::new(),
        }
    }

    /// Create a node whose type label is taken verbatim
    ///
    /// Used when the label has already been resolved against a schema
    /// spelling and must not be re-cased.
    pub fn with_exact_type(id: impl AsRef<str>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.as_ref().trim().to_string(),
            node_type: node_type.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Attach properties
    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    /// Reference to this node for use as a relationship endpoint
    pub fn to_ref(&self) -> NodeRef {
        NodeRef {
            id: self.id.clone(),
            node_type: Some(self.node_type.clone()),
        }
    }
}

/// Identity of a relationship endpoint
///
/// Endpoints are resolved by `(id, type)` rather than by sharing the node
/// objects. `node_type` is `None` when the model omitted the type and no
/// node with the same id existed in the payload to infer it from; callers
/// should treat such endpoints as a separate validity class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Identifier of the referenced node
    pub id: String,

    /// Type of the referenced node, if known
    #[serde(rename = "type")]
    pub node_type: Option<String>,
}

impl NodeRef {
    /// Create a typed reference
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: Some(node_type.into()),
        }
    }

    /// Create a reference whose type could not be determined
    pub fn untyped(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: None,
        }
    }

    /// Whether the endpoint carries a type
    pub fn is_typed(&self) -> bool {
        self.node_type.is_some()
    }

    /// Whether this reference points at the given node
    pub fn matches(&self, node: &Node) -> bool {
        self.id == node.id && self.node_type.as_deref() == Some(node.node_type.as_str())
    }
}
