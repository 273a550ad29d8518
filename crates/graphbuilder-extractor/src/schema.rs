//! Type schema built from the allowed labels
//!
//! The schema steers generation (as prompt text or as a JSON Schema output
//! contract) and, in strict mode, filters the results. Allowed label sets
//! are runtime data, so membership is checked post-hoc rather than encoded
//! in types.

use crate::config::TransformerConfig;
use graphbuilder_domain::label::{format_node_type, format_property_key, format_relationship_type};
use graphbuilder_domain::OutputContract;
use serde_json::{json, Map, Value};
use tracing::warn;

/// Name of the output contract handed to native structured-output models
pub const CONTRACT_NAME: &str = "DynamicGraph";

/// Which node properties may be extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyPolicy {
    /// No property extraction
    Disabled,
    /// Any property key
    Any,
    /// Only the listed keys
    Named(Vec<String>),
}

impl PropertyPolicy {
    /// Whether property extraction was requested at all
    pub fn is_enabled(&self) -> bool {
        !matches!(self, PropertyPolicy::Disabled)
    }

    /// Whether a normalized key may be kept
    pub fn allows_key(&self, key: &str) -> bool {
        match self {
            PropertyPolicy::Disabled => false,
            PropertyPolicy::Any => true,
            PropertyPolicy::Named(names) => names.iter().any(|n| n == key),
        }
    }
}

/// Allowed node types, relationship types and properties
///
/// An empty allowed set means "no restriction" for nodes and relationships
/// alike, never "nothing allowed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    node_types: Vec<String>,
    relationship_types: Vec<String>,
    properties: PropertyPolicy,
}

impl TypeSchema {
    /// Build a schema, trimming labels, dropping blanks and removing
    /// case-insensitive duplicates (first spelling wins)
    pub fn new(
        node_types: &[String],
        relationship_types: &[String],
        properties: PropertyPolicy,
    ) -> Self {
        let properties = match properties {
            PropertyPolicy::Named(names) => {
                let names = dedup(names.iter().map(|n| format_property_key(n)));
                if names.is_empty() {
                    PropertyPolicy::Any
                } else {
                    PropertyPolicy::Named(names)
                }
            }
            other => other,
        };

        Self {
            node_types: dedup(node_types.iter().map(|t| t.trim().to_string())),
            relationship_types: dedup(relationship_types.iter().map(|t| format_relationship_type(t))),
            properties,
        }
    }

    /// Build the schema for a transformer configuration
    pub fn from_config(config: &TransformerConfig) -> Self {
        Self::new(
            &config.allowed_nodes,
            &config.allowed_relationships,
            config.node_properties.policy(),
        )
    }

    /// Allowed node types, in configured order
    pub fn node_types(&self) -> &[String] {
        &self.node_types
    }

    /// Allowed relationship types, upper-snake-cased
    pub fn relationship_types(&self) -> &[String] {
        &self.relationship_types
    }

    /// Property policy
    pub fn properties(&self) -> &PropertyPolicy {
        &self.properties
    }

    /// Whether any allowed-type list is non-empty
    pub fn has_type_constraints(&self) -> bool {
        !self.node_types.is_empty() || !self.relationship_types.is_empty()
    }

    /// Case-insensitive membership; always true when unrestricted
    pub fn allows_node_type(&self, node_type: &str) -> bool {
        self.node_types.is_empty() || self.find_node_type(node_type).is_some()
    }

    /// Case-insensitive membership; always true when unrestricted
    pub fn allows_relationship_type(&self, rel_type: &str) -> bool {
        if self.relationship_types.is_empty() {
            return true;
        }
        let wanted = format_relationship_type(rel_type);
        self.relationship_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&wanted))
    }

    /// Normalize a raw node label
    ///
    /// Returns the configured spelling when the label matches an allowed
    /// type case-insensitively, otherwise the title-cased label.
    pub fn canonical_node_type(&self, raw: &str) -> String {
        match self.find_node_type(raw) {
            Some(allowed) => allowed.clone(),
            None => format_node_type(raw),
        }
    }

    fn find_node_type(&self, raw: &str) -> Option<&String> {
        let wanted = format_node_type(raw).to_lowercase();
        self.node_types
            .iter()
            .find(|allowed| format_node_type(allowed).to_lowercase() == wanted)
    }

    /// Copy of this schema with a named property list widened to any key
    pub fn without_named_properties(&self) -> Self {
        let mut schema = self.clone();
        if let PropertyPolicy::Named(names) = &self.properties {
            warn!(
                properties = ?names,
                "Named node properties cannot be enforced without structured output; accepting any property"
            );
            schema.properties = PropertyPolicy::Any;
        }
        schema
    }

    /// Output contract for native structured-output models
    ///
    /// Type fields are plain strings, narrowed with `enum` when allowed
    /// types are configured.
    pub fn output_contract(&self) -> OutputContract {
        let node_type = typed_string(
            &self.node_types,
            "The type or label of the node.",
        );
        let rel_type = typed_string(
            &self.relationship_types,
            "The type of the relationship.",
        );

        let mut node_props = Map::new();
        node_props.insert(
            "id".to_string(),
            json!({
                "type": "string",
                "description": "Name or human-readable unique identifier."
            }),
        );
        node_props.insert("type".to_string(), node_type.clone());

        if self.properties.is_enabled() {
            let key = match &self.properties {
                PropertyPolicy::Named(names) => json!({
                    "type": "string",
                    "enum": names,
                    "description": "Property key."
                }),
                _ => json!({"type": "string", "description": "Property key."}),
            };
            node_props.insert(
                "properties".to_string(),
                json!({
                    "type": "array",
                    "description": "List of node properties",
                    "items": {
                        "type": "object",
                        "properties": {
                            "key": key,
                            "value": {
                                "type": "string",
                                "description": "Extracted value. Any date value should be formatted as yyyy-mm-dd."
                            }
                        },
                        "required": ["key", "value"]
                    }
                }),
            );
        }

        let schema = json!({
            "type": "object",
            "properties": {
                "nodes": {
                    "type": "array",
                    "description": "List of nodes",
                    "items": {
                        "type": "object",
                        "properties": node_props,
                        "required": ["id", "type"]
                    }
                },
                "relationships": {
                    "type": "array",
                    "description": "List of relationships",
                    "items": {
                        "type": "object",
                        "properties": {
                            "source_node_id": {
                                "type": "string",
                                "description": "Name or human-readable unique identifier of source node"
                            },
                            "source_node_type": node_type,
                            "target_node_id": {
                                "type": "string",
                                "description": "Name or human-readable unique identifier of target node"
                            },
                            "target_node_type": node_type,
                            "type": rel_type
                        },
                        "required": [
                            "source_node_id",
                            "source_node_type",
                            "target_node_id",
                            "target_node_type",
                            "type"
                        ]
                    }
                }
            },
            "required": ["nodes", "relationships"]
        });

        OutputContract {
            name: CONTRACT_NAME.to_string(),
            description: "Represents a graph document consisting of nodes and relationships."
                .to_string(),
            schema,
        }
    }
}

fn typed_string(allowed: &[String], description: &str) -> Value {
    if allowed.is_empty() {
        json!({"type": "string", "description": description})
    } else {
        json!({"type": "string", "enum": allowed, "description": description})
    }
}

fn dedup(labels: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        if label.is_empty() {
            continue;
        }
        if !out.iter().any(|seen| seen.eq_ignore_ascii_case(&label)) {
            out.push(label);
        }
    }
    out
}
