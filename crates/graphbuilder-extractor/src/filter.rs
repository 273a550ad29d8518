//! Strict-mode enforcement of the allowed types

use crate::normalize::NormalizedGraph;
use crate::schema::TypeSchema;
use tracing::debug;

/// Drop nodes and relationships that violate the schema
///
/// Node types are checked first. When node types are constrained, a
/// relationship survives only if both endpoint types are allowed (untyped
/// endpoints never are); endpoints are matched by type, not by identity.
/// Relationship types are checked last, so relationships orphaned by node
/// filtering go even when their own type is allowed. With no type
/// constraints the graph is returned unchanged.
pub fn apply_strict_mode(graph: NormalizedGraph, schema: &TypeSchema) -> NormalizedGraph {
    if !schema.has_type_constraints() {
        return graph;
    }

    let NormalizedGraph {
        mut nodes,
        mut relationships,
    } = graph;
    let (nodes_before, rels_before) = (nodes.len(), relationships.len());

    if !schema.node_types().is_empty() {
        nodes.retain(|node| schema.allows_node_type(&node.node_type));
        relationships.retain(|rel| {
            [&rel.source, &rel.target].iter().all(|end| {
                end.node_type
                    .as_deref()
                    .is_some_and(|t| schema.allows_node_type(t))
            })
        });
    }

    if !schema.relationship_types().is_empty() {
        relationships.retain(|rel| schema.allows_relationship_type(&rel.rel_type));
    }

    debug!(
        dropped_nodes = nodes_before - nodes.len(),
        dropped_relationships = rels_before - relationships.len(),
        "Applied strict mode"
    );
    NormalizedGraph {
        nodes,
        relationships,
    }
}
