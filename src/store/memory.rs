//! In-memory arena graph store.

use std::collections::{BTreeMap, HashMap};

use crate::types::{IncomingRef, Relationship, Vertex, VertexIdx, NAME_PROPERTY};
use super::StoreError;

/// In-memory property graph.
///
/// Vertices live in a growable arena addressed by [`VertexIdx`]; relationships
/// are owned by their source vertex and referenced from the target through
/// [`IncomingRef`]s. Nothing is ever removed, so indices never dangle and
/// `vertices()` always yields insertion order.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    /// Vertex arena, in insertion order.
    vertices: Vec<Vertex>,
    /// Identifier -> arena index.
    by_identifier: HashMap<String, VertexIdx>,
    /// Display alias -> vertices carrying it, in claim order.
    by_alias: HashMap<String, Vec<VertexIdx>>,
    /// Total relationships across all vertices.
    relationship_count: usize,
}

impl GraphStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the vertex for `id`, creating an empty placeholder if absent.
    pub fn get_or_create_vertex(&mut self, id: &str) -> VertexIdx {
        if let Some(&idx) = self.by_identifier.get(id) {
            return idx;
        }

        let idx = VertexIdx::new(self.vertices.len() as u32);
        self.vertices.push(Vertex::new(id));
        self.by_identifier.insert(id.to_string(), idx);
        idx
    }

    /// Strict lookup by identifier.
    pub fn get_vertex(&self, id: &str) -> Result<&Vertex, StoreError> {
        self.index_of(id)
            .map(|idx| self.vertex(idx))
            .ok_or_else(|| StoreError::VertexNotFound(id.to_string()))
    }

    /// Arena index for an identifier.
    pub fn index_of(&self, id: &str) -> Option<VertexIdx> {
        self.by_identifier.get(id).copied()
    }

    /// Resolve a client-supplied entity reference.
    ///
    /// Tries the identifier first, then the display alias. A shared alias
    /// resolves to the earliest vertex still carrying it.
    pub fn resolve(&self, entity: &str) -> Option<VertexIdx> {
        self.index_of(entity).or_else(|| {
            self.by_alias
                .get(entity)
                .and_then(|claims| claims.first().copied())
        })
    }

    /// Whether a vertex with this identifier exists.
    pub fn contains(&self, id: &str) -> bool {
        self.by_identifier.contains_key(id)
    }

    /// Access a vertex by index.
    ///
    /// # Panics
    /// If `idx` was not produced by this store.
    pub fn vertex(&self, idx: VertexIdx) -> &Vertex {
        &self.vertices[idx.as_usize()]
    }

    /// Insert or overwrite a property; last write wins.
    pub fn set_property(&mut self, idx: VertexIdx, key: &str, value: &str) {
        let vertex = &mut self.vertices[idx.as_usize()];
        let old_alias = (key == NAME_PROPERTY).then(|| vertex.alias().to_string());

        vertex.set_property(key, value);

        if let Some(old_alias) = old_alias {
            let new_alias = vertex.alias().to_string();
            let has_name = vertex.has_display_name();
            if old_alias != new_alias {
                self.release_alias(&old_alias, idx);
                if has_name {
                    self.by_alias.entry(new_alias).or_default().push(idx);
                }
            }
        }
    }

    fn release_alias(&mut self, alias: &str, idx: VertexIdx) {
        if let Some(claims) = self.by_alias.get_mut(alias) {
            claims.retain(|&claimed| claimed != idx);
            if claims.is_empty() {
                self.by_alias.remove(alias);
            }
        }
    }

    /// Record a relationship, creating missing endpoints as placeholders.
    pub fn add_relationship(&mut self, source_id: &str, target_id: &str, rel_type: &str) {
        self.add_relationship_with(source_id, target_id, rel_type, BTreeMap::new());
    }

    /// Record a relationship carrying properties.
    pub fn add_relationship_with(
        &mut self,
        source_id: &str,
        target_id: &str,
        rel_type: &str,
        properties: BTreeMap<String, String>,
    ) {
        let source = self.get_or_create_vertex(source_id);
        let target = self.get_or_create_vertex(target_id);

        let mut relationship = Relationship::new(source, target, rel_type);
        relationship.properties = properties;

        let position = self.vertices[source.as_usize()].push_outgoing(relationship);
        self.vertices[target.as_usize()].push_incoming(IncomingRef { source, position });
        self.relationship_count += 1;
    }

    /// Whether some relationship `(source, target, rel_type)` already exists.
    pub fn has_relationship(&self, source_id: &str, target_id: &str, rel_type: &str) -> bool {
        let (Some(source), Some(target)) = (self.index_of(source_id), self.index_of(target_id)) else {
            return false;
        };
        self.outgoing(source)
            .iter()
            .any(|r| r.target == target && r.rel_type == rel_type)
    }

    /// All vertices in insertion order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All vertices with their indices, in insertion order.
    pub fn list_vertices(&self) -> impl Iterator<Item = (VertexIdx, &Vertex)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (VertexIdx::new(i as u32), v))
    }

    /// Relationships owned by `idx`.
    pub fn outgoing(&self, idx: VertexIdx) -> &[Relationship] {
        self.vertex(idx).outgoing()
    }

    /// Relationships targeting `idx`, resolved through back-references.
    pub fn incoming(&self, idx: VertexIdx) -> impl Iterator<Item = &Relationship> + '_ {
        self.vertex(idx)
            .incoming()
            .iter()
            .map(move |r| &self.vertices[r.source.as_usize()].outgoing()[r.position])
    }

    /// Neighbours in both directions with the connecting relationship.
    ///
    /// Outgoing relationships come first, then incoming ones.
    pub fn neighbors(&self, idx: VertexIdx) -> impl Iterator<Item = (VertexIdx, &Relationship)> + '_ {
        self.outgoing(idx)
            .iter()
            .map(|r| (r.target, r))
            .chain(self.incoming(idx).map(|r| (r.source, r)))
    }

    /// Every relationship in the graph, grouped by source.
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> + '_ {
        self.vertices.iter().flat_map(|v| v.outgoing().iter())
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of relationships.
    pub fn relationship_count(&self) -> usize {
        self.relationship_count
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl std::fmt::Display for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "graph: {} vertices, {} relationships",
            self.vertex_count(),
            self.relationship_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut store = GraphStore::new();
        let a = store.get_or_create_vertex("org/acme");
        let b = store.get_or_create_vertex("org/acme");

        assert_eq!(a, b);
        assert_eq!(store.vertex_count(), 1);
    }

    #[test]
    fn test_property_overwrite_leaves_others() {
        let mut store = GraphStore::new();
        let idx = store.get_or_create_vertex("org/acme");
        store.set_property(idx, "type", "Organization");
        store.set_property(idx, "name", "Acme");

        let again = store.get_or_create_vertex("org/acme");
        store.set_property(again, "name", "Acme Corp");

        let v = store.vertex(idx);
        assert_eq!(v.property("name"), Some("Acme Corp"));
        assert_eq!(v.property("type"), Some("Organization"));
    }

    #[test]
    fn test_get_vertex_not_found() {
        let store = GraphStore::new();
        assert_eq!(
            store.get_vertex("missing").unwrap_err(),
            StoreError::VertexNotFound("missing".to_string())
        );
    }

    #[test]
    fn test_add_relationship_creates_placeholders() {
        let mut store = GraphStore::new();
        store.add_relationship("a", "b", "knows");

        assert_eq!(store.vertex_count(), 2);
        assert_eq!(store.relationship_count(), 1);

        let a = store.index_of("a").unwrap();
        let b = store.index_of("b").unwrap();
        assert_eq!(store.outgoing(a).len(), 1);
        assert_eq!(store.outgoing(a)[0].target, b);

        let incoming: Vec<_> = store.incoming(b).collect();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source, a);
        assert_eq!(incoming[0].rel_type, "knows");
    }

    #[test]
    fn test_duplicate_relationships_accumulate() {
        let mut store = GraphStore::new();
        store.add_relationship("a", "b", "knows");
        store.add_relationship("a", "b", "knows");

        assert_eq!(store.relationship_count(), 2);
        assert!(store.has_relationship("a", "b", "knows"));
        assert!(!store.has_relationship("b", "a", "knows"));
        assert!(!store.has_relationship("a", "b", "founded"));
    }

    #[test]
    fn test_list_vertices_insertion_order() {
        let mut store = GraphStore::new();
        for id in ["c", "a", "b"] {
            store.get_or_create_vertex(id);
        }
        let ids: Vec<_> = store.list_vertices().map(|(_, v)| v.identifier().to_string()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_resolve_by_alias() {
        let mut store = GraphStore::new();
        let idx = store.get_or_create_vertex("city/nyc");
        store.set_property(idx, "name", "New York");

        assert_eq!(store.resolve("city/nyc"), Some(idx));
        assert_eq!(store.resolve("New York"), Some(idx));
        assert_eq!(store.resolve("Boston"), None);

        // Renaming releases the old alias
        store.set_property(idx, "name", "New York City");
        assert_eq!(store.resolve("New York"), None);
        assert_eq!(store.resolve("New York City"), Some(idx));
    }

    #[test]
    fn test_shared_alias_passes_to_next_holder() {
        let mut store = GraphStore::new();
        let first = store.get_or_create_vertex("org/springfield-1");
        let second = store.get_or_create_vertex("org/springfield-2");
        store.set_property(first, "name", "Springfield");
        store.set_property(second, "name", "Springfield");

        // First claim wins while it holds the name
        assert_eq!(store.resolve("Springfield"), Some(first));

        store.set_property(first, "name", "Springfield Old Town");
        assert_eq!(store.resolve("Springfield"), Some(second));
        assert_eq!(store.resolve("Springfield Old Town"), Some(first));

        // Reclaiming queues behind the current holder
        store.set_property(first, "name", "Springfield");
        assert_eq!(store.resolve("Springfield"), Some(second));

        store.set_property(second, "name", "Shelbyville");
        store.set_property(first, "name", "Capital City");
        assert_eq!(store.resolve("Springfield"), None);
    }

    #[test]
    fn test_neighbors_both_directions() {
        let mut store = GraphStore::new();
        store.add_relationship("a", "b", "x");
        store.add_relationship("c", "a", "y");

        let a = store.index_of("a").unwrap();
        let neighbors: Vec<_> = store
            .neighbors(a)
            .map(|(n, _)| store.vertex(n).identifier().to_string())
            .collect();
        assert_eq!(neighbors, vec!["b", "c"]);
    }

    proptest! {
        #[test]
        fn prop_get_or_create_never_duplicates(ids in proptest::collection::vec("[a-d]{1,2}", 0..40)) {
            let mut store = GraphStore::new();
            for id in &ids {
                let first = store.get_or_create_vertex(id);
                let second = store.get_or_create_vertex(id);
                prop_assert_eq!(first, second);
                prop_assert_eq!(store.vertex(first).identifier(), id.as_str());
            }
            let distinct: std::collections::HashSet<_> = ids.iter().collect();
            prop_assert_eq!(store.vertex_count(), distinct.len());
        }
    }
}
