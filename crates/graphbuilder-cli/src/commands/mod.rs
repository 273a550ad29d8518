//! Command implementations.

pub mod extract;
pub mod init;
pub mod schema;

pub use self::extract::execute_extract;
pub use self::init::execute_init;
pub use self::schema::execute_schema;

use graphbuilder_extractor::{parse_label_list, TransformerConfig};

/// Apply command-line label overrides to the configured transformer.
pub(crate) fn apply_label_overrides(
    config: &mut TransformerConfig,
    allowed_nodes: Option<&str>,
    allowed_relationships: Option<&str>,
) {
    if let Some(raw) = allowed_nodes {
        config.allowed_nodes = parse_label_list(raw);
    }
    if let Some(raw) = allowed_relationships {
        config.allowed_relationships = parse_label_list(raw);
    }
}
