//! Configuration for the graph transformer and the chunker

use crate::schema::PropertyPolicy;
use serde::{Deserialize, Serialize};

/// Which node properties the model should extract
///
/// Accepts `false`, `true` or a list of property names in TOML/JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeProperties {
    /// `false` disables property extraction, `true` allows any key
    Enabled(bool),
    /// Only these keys; an empty list allows any key
    Named(Vec<String>),
}

impl NodeProperties {
    /// Schema-level policy for this setting
    pub fn policy(&self) -> PropertyPolicy {
        match self {
            NodeProperties::Enabled(false) => PropertyPolicy::Disabled,
            NodeProperties::Enabled(true) => PropertyPolicy::Any,
            NodeProperties::Named(names) if names.is_empty() => PropertyPolicy::Any,
            NodeProperties::Named(names) => PropertyPolicy::Named(names.clone()),
        }
    }
}

impl Default for NodeProperties {
    fn default() -> Self {
        NodeProperties::Enabled(false)
    }
}

/// A worked example shown to the model on the prompt-driven path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShotExample {
    /// Source sentence
    pub text: String,
    /// Source entity
    pub head: String,
    /// Source entity type
    pub head_type: String,
    /// Relationship type
    pub relation: String,
    /// Target entity
    pub tail: String,
    /// Target entity type
    pub tail_type: String,
}

/// Configuration for the [`GraphTransformer`](crate::GraphTransformer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Allowed node labels; empty means unrestricted
    pub allowed_nodes: Vec<String>,

    /// Allowed relationship types; empty means unrestricted
    pub allowed_relationships: Vec<String>,

    /// Node property extraction
    pub node_properties: NodeProperties,

    /// Drop nodes and relationships that violate the allowed types
    pub strict_mode: bool,

    /// Use native structured output when the model supports it
    pub use_function_call: bool,

    /// Synthesize standalone nodes for endpoints that only appear in
    /// relationships
    pub materialize_endpoints: bool,

    /// Extra text appended to the system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_instructions: Option<String>,

    /// Few-shot examples for the prompt-driven path; built-in examples are
    /// used when empty
    pub examples: Vec<FewShotExample>,
}

impl TransformerConfig {
    /// Strict configuration restricted to the given labels
    pub fn strict(allowed_nodes: Vec<String>, allowed_relationships: Vec<String>) -> Self {
        Self {
            allowed_nodes,
            allowed_relationships,
            strict_mode: true,
            ..Self::default()
        }
    }

    /// Configuration that steers the model with labels but keeps everything
    /// it returns
    pub fn permissive(allowed_nodes: Vec<String>, allowed_relationships: Vec<String>) -> Self {
        Self {
            allowed_nodes,
            allowed_relationships,
            strict_mode: false,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.allowed_nodes.iter().any(|n| n.trim().is_empty()) {
            return Err("allowed_nodes must not contain blank labels".to_string());
        }
        if self.allowed_relationships.iter().any(|r| r.trim().is_empty()) {
            return Err("allowed_relationships must not contain blank labels".to_string());
        }
        if let NodeProperties::Named(names) = &self.node_properties {
            if names.iter().any(|n| n.trim().is_empty()) {
                return Err("node_properties must not contain blank names".to_string());
            }
        }
        for (idx, example) in self.examples.iter().enumerate() {
            if example.head.trim().is_empty() || example.tail.trim().is_empty() {
                return Err(format!("example {} has an empty head or tail", idx));
            }
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for TransformerConfig {
    /// Unrestricted labels, strict mode on, native output preferred
    fn default() -> Self {
        Self {
            allowed_nodes: Vec::new(),
            allowed_relationships: Vec::new(),
            node_properties: NodeProperties::default(),
            strict_mode: true,
            use_function_call: true,
            materialize_endpoints: false,
            additional_instructions: None,
            examples: Vec::new(),
        }
    }
}

/// Split a comma-separated label string such as `"Person, Company,Award"`
///
/// Blank entries are dropped, so `""` yields an empty (unrestricted) list.
pub fn parse_label_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration for splitting documents into chunks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Words per chunk
    pub chunk_size: usize,

    /// Words shared by consecutive chunks
    pub chunk_overlap: usize,

    /// Upper bound on chunks produced per document
    pub max_chunks_allowed: usize,

    /// Consecutive chunks merged into one model call
    pub chunks_to_combine: usize,
}

impl ChunkingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err("chunk_overlap must be smaller than chunk_size".to_string());
        }
        if self.max_chunks_allowed == 0 {
            return Err("max_chunks_allowed must be greater than 0".to_string());
        }
        if self.chunks_to_combine == 0 {
            return Err("chunks_to_combine must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 200,
            chunk_overlap: 20,
            max_chunks_allowed: 1000,
            chunks_to_combine: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TransformerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.strict_mode);
        assert!(config.use_function_call);
    }

    #[test]
    fn test_presets() {
        let strict = TransformerConfig::strict(vec!["Person".into()], vec![]);
        assert!(strict.strict_mode);
        assert_eq!(strict.allowed_nodes, vec!["Person".to_string()]);

        let permissive = TransformerConfig::permissive(vec!["Person".into()], vec![]);
        assert!(!permissive.strict_mode);
    }

    #[test]
    fn test_blank_label_rejected() {
        let config = TransformerConfig::strict(vec!["Person".into(), "  ".into()], vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_node_properties_policy() {
        assert_eq!(NodeProperties::Enabled(false).policy(), PropertyPolicy::Disabled);
        assert_eq!(NodeProperties::Enabled(true).policy(), PropertyPolicy::Any);
        assert_eq!(NodeProperties::Named(vec![]).policy(), PropertyPolicy::Any);
        assert_eq!(
            NodeProperties::Named(vec!["description".into()]).policy(),
            PropertyPolicy::Named(vec!["description".into()])
        );
    }

    #[test]
    fn test_node_properties_from_toml() {
        let config = TransformerConfig::from_toml("node_properties = true").unwrap();
        assert_eq!(config.node_properties, NodeProperties::Enabled(true));

        let config = TransformerConfig::from_toml(r#"node_properties = ["description", "born"]"#).unwrap();
        assert_eq!(
            config.node_properties,
            NodeProperties::Named(vec!["description".into(), "born".into()])
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = TransformerConfig::from_toml(
            r#"
            allowed_nodes = ["Person", "Company"]
            strict_mode = false
            "#,
        )
        .unwrap();
        assert_eq!(config.allowed_nodes.len(), 2);
        assert!(!config.strict_mode);
        assert!(config.use_function_call);
        assert!(config.examples.is_empty());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = TransformerConfig::strict(
            vec!["Person".into(), "Company".into()],
            vec!["WORKS_FOR".into()],
        );
        config.additional_instructions = Some("Prefer full names.".into());
        let toml_str = config.to_toml().unwrap();
        let parsed = TransformerConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_parse_label_list() {
        assert_eq!(
            parse_label_list("Person, Company,Award"),
            vec!["Person".to_string(), "Company".to_string(), "Award".to_string()]
        );
        assert!(parse_label_list("").is_empty());
        assert!(parse_label_list(" , ,").is_empty());
        assert_eq!(parse_label_list("兼容"), vec!["兼容".to_string()]);
    }

    #[test]
    fn test_chunking_config_validation() {
        assert!(ChunkingConfig::default().validate().is_ok());

        let mut config = ChunkingConfig::default();
        config.chunk_overlap = config.chunk_size;
        assert!(config.validate().is_err());

        let mut config = ChunkingConfig::default();
        config.chunks_to_combine = 0;
        assert!(config.validate().is_err());
    }
}
