//! Relationship module - typed directed edges between node references

use crate::label::format_relationship_type;
use crate::node::NodeRef;
use serde::{Deserialize, Serialize};

/// A directed, typed edge between two node references
///
/// The type is normalized on creation to an upper-case, underscore-separated
/// token, so "has award" becomes "HAS_AWARD".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source endpoint
    pub source: NodeRef,

    /// Target endpoint
    pub target: NodeRef,

    /// Upper-snake-case relationship type
    #[serde(rename = "type")]
    pub rel_type: String,
}

impl Relationship {
    /// Create a new relationship, normalizing its type
    pub fn new(source: NodeRef, target: NodeRef, rel_type: impl AsRef<str>) -> Self {
        Self {
            source,
            target,
            rel_type: format_relationship_type(rel_type.as_ref()),
        }
    }

    /// Whether both endpoints carry a type
    pub fn is_fully_typed(&self) -> bool {
        self.source.is_typed() && self.target.is_typed()
    }
}
