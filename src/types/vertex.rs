//! Vertex types for the entity graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::relationship::Relationship;

/// Property holding a vertex's display name. Writing it updates the alias.
pub const NAME_PROPERTY: &str = "name";

/// Property holding a vertex's type label.
pub const TYPE_PROPERTY: &str = "type";

/// Index of a vertex inside the graph arena.
///
/// Only meaningful for the `GraphStore` that produced it. Vertices are never
/// removed, so an index stays valid for the lifetime of its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexIdx(u32);

impl VertexIdx {
    /// Wrap a raw arena position.
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Position in the arena.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Raw value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VertexIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Back-reference from a target vertex to a relationship owned by its source.
///
/// `position` indexes the source vertex's outgoing list, which only grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IncomingRef {
    /// Vertex owning the relationship.
    pub source: VertexIdx,
    /// Position in the source's outgoing list.
    pub position: usize,
}

/// A named, typed node with free-form string properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    identifier: String,
    alias: String,
    properties: BTreeMap<String, String>,
    outgoing: Vec<Relationship>,
    incoming: Vec<IncomingRef>,
}

impl Vertex {
    /// Create an empty placeholder vertex. Its alias equals its identifier.
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            alias: identifier.clone(),
            identifier,
            properties: BTreeMap::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Unique identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Display alias (the `name` property, or the identifier when unnamed).
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Whether the vertex carries a display name distinct from its key.
    pub fn has_display_name(&self) -> bool {
        self.alias != self.identifier
    }

    /// Look up a property value.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Type label, empty when the vertex has none.
    pub fn vertex_type(&self) -> &str {
        self.property(TYPE_PROPERTY).unwrap_or("")
    }

    /// All properties in key order.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Relationships owned by this vertex, in insertion order.
    pub fn outgoing(&self) -> &[Relationship] {
        &self.outgoing
    }

    /// Back-references to relationships targeting this vertex.
    pub fn incoming(&self) -> &[IncomingRef] {
        &self.incoming
    }

    /// Number of relationships touching this vertex in either direction.
    pub fn degree(&self) -> usize {
        self.outgoing.len() + self.incoming.len()
    }

    /// Insert or overwrite a property, returning the previous value.
    pub(crate) fn set_property(&mut self, key: &str, value: &str) -> Option<String> {
        if key == NAME_PROPERTY {
            self.alias = if value.is_empty() {
                self.identifier.clone()
            } else {
                value.to_string()
            };
        }
        self.properties.insert(key.to_string(), value.to_string())
    }

    pub(crate) fn push_outgoing(&mut self, relationship: Relationship) -> usize {
        self.outgoing.push(relationship);
        self.outgoing.len() - 1
    }

    pub(crate) fn push_incoming(&mut self, back_ref: IncomingRef) {
        self.incoming.push(back_ref);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_alias_is_identifier() {
        let v = Vertex::new("org/acme");
        assert_eq!(v.alias(), "org/acme");
        assert!(!v.has_display_name());
        assert_eq!(v.vertex_type(), "");
    }

    #[test]
    fn test_name_property_sets_alias() {
        let mut v = Vertex::new("org/acme");
        v.set_property(NAME_PROPERTY, "Acme Corp");
        assert_eq!(v.alias(), "Acme Corp");
        assert!(v.has_display_name());

        // Clearing the name falls back to the identifier
        v.set_property(NAME_PROPERTY, "");
        assert_eq!(v.alias(), "org/acme");
    }

    #[test]
    fn test_set_property_last_write_wins() {
        let mut v = Vertex::new("x");
        assert_eq!(v.set_property("type", "City"), None);
        assert_eq!(v.set_property("type", "Region").as_deref(), Some("City"));
        assert_eq!(v.vertex_type(), "Region");
    }
}
