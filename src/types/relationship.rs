//! Relationship types for the entity graph.

use std::collections::BTreeMap;

use super::vertex::VertexIdx;

/// Directed, typed edge between two vertices.
///
/// Endpoints are arena indices into the owning `GraphStore`. Several
/// relationships may share the same `(source, target, rel_type)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Source vertex (owner).
    pub source: VertexIdx,
    /// Target vertex.
    pub target: VertexIdx,
    /// Type label, possibly empty.
    pub rel_type: String,
    /// Optional free-form properties.
    pub properties: BTreeMap<String, String>,
}

impl Relationship {
    /// Create a relationship without properties.
    pub fn new(source: VertexIdx, target: VertexIdx, rel_type: impl Into<String>) -> Self {
        Self {
            source,
            target,
            rel_type: rel_type.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Attach a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The endpoint opposite to `from`.
    pub fn other_end(&self, from: VertexIdx) -> VertexIdx {
        if self.source == from {
            self.target
        } else {
            self.source
        }
    }
}
