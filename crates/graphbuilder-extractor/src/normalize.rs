//! Normalization of decoded model output into nodes and relationships
//!
//! Two payload shapes are accepted. The structured-output path yields
//! `{"nodes": [...], "relationships": [...]}`; the free-text path yields a
//! list of `{head, head_type, relation, tail, tail_type}` triples. Malformed
//! records are skipped one by one; only a payload of the wrong overall shape
//! is an error.

use crate::error::ExtractorError;
use crate::schema::{PropertyPolicy, TypeSchema};
use graphbuilder_domain::label::format_property_key;
use graphbuilder_domain::{Node, NodeRef, Relationship};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Nodes and relationships for one document, before strict filtering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedGraph {
    /// Nodes in payload order
    pub nodes: Vec<Node>,
    /// Relationships in payload order
    pub relationships: Vec<Relationship>,
}

impl NormalizedGraph {
    /// Whether nothing was extracted
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

/// Normalize a structured-output payload
///
/// Relationship endpoints missing a type take the type of a node with the
/// same id; when there is none the endpoint stays untyped and the
/// relationship is kept. With `materialize_endpoints`, every typed endpoint
/// without a matching node gets a standalone node with no properties.
pub fn normalize_graph(
    payload: &Value,
    schema: &TypeSchema,
    materialize_endpoints: bool,
) -> Result<NormalizedGraph, ExtractorError> {
    let object = payload.as_object().ok_or_else(|| {
        ExtractorError::Decode(format!(
            "expected an object with nodes and relationships, got {}",
            kind_of(payload)
        ))
    })?;

    let mut graph = NormalizedGraph::default();

    for (idx, item) in items(object.get("nodes")).iter().enumerate() {
        match parse_node(item, schema) {
            Some(node) => graph.nodes.push(node),
            None => warn!(index = idx, "Skipping node without id or type"),
        }
    }

    let mut known_types: HashMap<String, String> = HashMap::new();
    for node in &graph.nodes {
        known_types
            .entry(node.id.clone())
            .or_insert_with(|| node.node_type.clone());
    }

    for (idx, item) in items(object.get("relationships")).iter().enumerate() {
        match parse_relationship(item, schema, &known_types) {
            Some(rel) => graph.relationships.push(rel),
            None => warn!(index = idx, "Skipping relationship without endpoints or type"),
        }
    }

    if materialize_endpoints {
        materialize(&mut graph);
    }

    debug!(
        nodes = graph.nodes.len(),
        relationships = graph.relationships.len(),
        "Normalized structured payload"
    );
    Ok(graph)
}

/// Normalize a list of head/relation/tail triples
///
/// Each triple contributes a head node, a tail node and one relationship.
/// Nodes are deduplicated within the document by id and type, keeping the
/// first occurrence. A bare object wrapping the list (`{"triples": [...]}`)
/// and a single triple object are accepted too. Incomplete triples are
/// skipped, but a non-empty list without a single complete triple is a
/// decode error rather than an empty graph.
pub fn normalize_triples(
    payload: &Value,
    schema: &TypeSchema,
) -> Result<NormalizedGraph, ExtractorError> {
    let records = triple_records(payload)?;

    // Types named anywhere in the payload, for triples that omit one
    let mut known_types: HashMap<String, String> = HashMap::new();
    for record in &records {
        for (id_key, type_key) in [("head", "head_type"), ("tail", "tail_type")] {
            if let (Some(id), Some(raw_type)) = (text_field(record, id_key), text_field(record, type_key)) {
                known_types
                    .entry(id)
                    .or_insert_with(|| schema.canonical_node_type(&raw_type));
            }
        }
    }

    let mut graph = NormalizedGraph::default();
    for (idx, record) in records.iter().enumerate() {
        let head = triple_node(record, "head", "head_type", "head_properties", schema, &known_types);
        let tail = triple_node(record, "tail", "tail_type", "tail_properties", schema, &known_types);
        let relation = text_field(record, "relation").or_else(|| text_field(record, "type"));

        let (Some(head), Some(tail), Some(relation)) = (head, tail, relation) else {
            warn!(index = idx, "Skipping incomplete triple");
            continue;
        };

        let rel = Relationship::new(head.to_ref(), tail.to_ref(), &relation);
        merge_node(&mut graph.nodes, head);
        merge_node(&mut graph.nodes, tail);
        graph.relationships.push(rel);
    }

    if !records.is_empty() && graph.relationships.is_empty() {
        return Err(ExtractorError::Decode(format!(
            "none of the {} records is a complete triple",
            records.len()
        )));
    }

    debug!(
        triples = records.len(),
        nodes = graph.nodes.len(),
        relationships = graph.relationships.len(),
        "Normalized triples"
    );
    Ok(graph)
}

fn triple_records(payload: &Value) -> Result<Vec<Value>, ExtractorError> {
    match payload {
        Value::Array(records) => Ok(records.clone()),
        Value::Object(object) if object.contains_key("head") => Ok(vec![payload.clone()]),
        Value::Object(object) => {
            if let Some(records) = object.get("triples").and_then(Value::as_array) {
                return Ok(records.clone());
            }
            object
                .values()
                .filter_map(Value::as_array)
                .find(|records| records.iter().any(|record| record.get("head").is_some()))
                .cloned()
                .ok_or_else(|| ExtractorError::Decode("object does not contain a list of triples".to_string()))
        }
        other => Err(ExtractorError::Decode(format!(
            "expected a list of triples, got {}",
            kind_of(other)
        ))),
    }
}

fn triple_node(
    record: &Value,
    id_key: &str,
    type_key: &str,
    properties_key: &str,
    schema: &TypeSchema,
    known_types: &HashMap<String, String>,
) -> Option<Node> {
    let id = text_field(record, id_key)?;
    let node_type = match text_field(record, type_key) {
        Some(raw) => schema.canonical_node_type(&raw),
        None => known_types.get(&id)?.clone(),
    };
    let properties = parse_properties(record.get(properties_key), schema.properties());
    Some(Node::with_exact_type(id, node_type).with_properties(properties))
}

/// Add a node unless one with the same id and type exists; properties of a
/// repeated node fill in keys the first occurrence lacked
fn merge_node(nodes: &mut Vec<Node>, node: Node) {
    match nodes
        .iter_mut()
        .find(|n| n.id == node.id && n.node_type == node.node_type)
    {
        Some(existing) => {
            for (key, value) in node.properties {
                existing.properties.entry(key).or_insert(value);
            }
        }
        None => nodes.push(node),
    }
}

fn parse_node(item: &Value, schema: &TypeSchema) -> Option<Node> {
    let id = text_field(item, "id")?;
    let raw_type = text_field(item, "type")?;
    let properties = parse_properties(item.get("properties"), schema.properties());
    Some(Node::with_exact_type(id, schema.canonical_node_type(&raw_type)).with_properties(properties))
}

fn parse_relationship(
    item: &Value,
    schema: &TypeSchema,
    known_types: &HashMap<String, String>,
) -> Option<Relationship> {
    let source = endpoint(item, "source", schema, known_types)?;
    let target = endpoint(item, "target", schema, known_types)?;
    let rel_type = text_field(item, "type")?;
    Some(Relationship::new(source, target, &rel_type))
}

/// Read an endpoint from either `{"source": {"id", "type"}}` or the flat
/// `source_node_id` / `source_node_type` fields
fn endpoint(
    item: &Value,
    prefix: &str,
    schema: &TypeSchema,
    known_types: &HashMap<String, String>,
) -> Option<NodeRef> {
    let (id, raw_type) = match item.get(prefix) {
        Some(nested @ Value::Object(_)) => (text_field(nested, "id"), text_field(nested, "type")),
        _ => (
            text_field(item, &format!("{}_node_id", prefix)),
            text_field(item, &format!("{}_node_type", prefix)),
        ),
    };
    let id = id?;

    let node_type = match raw_type {
        Some(raw) => Some(schema.canonical_node_type(&raw)),
        None => known_types.get(&id).cloned(),
    };
    Some(match node_type {
        Some(node_type) => NodeRef::new(id, node_type),
        None => {
            debug!(id = %id, "Endpoint type unknown; keeping untyped");
            NodeRef::untyped(id)
        }
    })
}

fn materialize(graph: &mut NormalizedGraph) {
    let mut added = 0;
    for rel in &graph.relationships {
        for node_ref in [&rel.source, &rel.target] {
            let Some(node_type) = &node_ref.node_type else {
                continue;
            };
            if graph.nodes.iter().any(|n| node_ref.matches(n)) {
                continue;
            }
            graph
                .nodes
                .push(Node::with_exact_type(&node_ref.id, node_type.clone()));
            added += 1;
        }
    }
    if added > 0 {
        debug!(added, "Materialized relationship endpoints as nodes");
    }
}

/// Properties given as `[{"key", "value"}]` or as a plain map
fn parse_properties(raw: Option<&Value>, policy: &PropertyPolicy) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    if !policy.is_enabled() {
        return properties;
    }

    let mut insert = |key: &str, value: &Value| {
        let key = format_property_key(key);
        if key.is_empty() || !policy.allows_key(&key) {
            return;
        }
        if let Some(value) = scalar_text(value) {
            properties.insert(key, value);
        }
    };

    match raw {
        Some(Value::Array(entries)) => {
            for entry in entries {
                if let (Some(key), Some(value)) = (text_field(entry, "key"), entry.get("value")) {
                    insert(&key, value);
                }
            }
        }
        Some(Value::Object(map)) => {
            for (key, value) in map {
                insert(key, value);
            }
        }
        _ => {}
    }
    properties
}

fn items(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

/// Non-empty trimmed string (numbers are stringified)
fn text_field(value: &Value, key: &str) -> Option<String> {
    let text = match value.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Payload in structured-output shape for an already normalized graph
pub fn to_payload(graph: &NormalizedGraph) -> Value {
    let nodes: Vec<Value> = graph
        .nodes
        .iter()
        .map(|node| {
            let mut object = Map::new();
            object.insert("id".to_string(), Value::String(node.id.clone()));
            object.insert("type".to_string(), Value::String(node.node_type.clone()));
            if !node.properties.is_empty() {
                let properties = node
                    .properties
                    .iter()
                    .map(|(k, v)| serde_json::json!({"key": k, "value": v}))
                    .collect();
                object.insert("properties".to_string(), Value::Array(properties));
            }
            Value::Object(object)
        })
        .collect();

    let relationships: Vec<Value> = graph
        .relationships
        .iter()
        .map(|rel| {
            serde_json::json!({
                "source_node_id": rel.source.id,
                "source_node_type": rel.source.node_type,
                "target_node_id": rel.target.id,
                "target_node_type": rel.target.node_type,
                "type": rel.rel_type,
            })
        })
        .collect();

    serde_json::json!({"nodes": nodes, "relationships": relationships})
}
