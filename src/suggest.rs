//! Autosuggest indices.
//!
//! Built once after loading and never refreshed: vertices and edges created
//! through the API later do not show up until the next restart.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::store::GraphStore;
use crate::types::Vertex;

/// Vertex types offered for entity autocomplete.
pub const SUGGESTED_TYPES: &[&str] = &[
    "Organization",
    "City",
    "Category",
    "keyword",
    "Region",
    "Country",
    "Person",
    "TeamMember",
    "Founder",
    "Advisor",
];

/// One autocomplete entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySuggestion {
    /// Vertex identifier.
    #[serde(rename = "__id")]
    pub id: String,
    /// Vertex type label.
    #[serde(rename = "type")]
    pub vertex_type: String,
    /// Normalized display name.
    pub name: String,
}

/// Entities worth suggesting, in vertex insertion order.
///
/// Only vertices with an allowed type and a display name distinct from the
/// identifier qualify; unnamed placeholders created by edge loading are left
/// out.
pub fn build_entity_suggestions(store: &GraphStore) -> Vec<EntitySuggestion> {
    store
        .vertices()
        .iter()
        .filter(|v| is_suggestable(v))
        .map(|v| EntitySuggestion {
            id: v.identifier().to_string(),
            vertex_type: v.vertex_type().to_string(),
            name: normalize_name(v.alias()),
        })
        .collect()
}

fn is_suggestable(vertex: &Vertex) -> bool {
    let vertex_type = vertex.vertex_type();
    !vertex_type.is_empty()
        && !vertex.alias().is_empty()
        && vertex.has_display_name()
        && SUGGESTED_TYPES.contains(&vertex_type)
}

/// Strip escape artefacts from exported names.
///
/// `\'` and `\"` lose their backslash, tabs become spaces.
pub fn normalize_name(name: &str) -> String {
    name.replace("\\'", "'")
        .replace("\\\"", "\"")
        .replace('\t', " ")
}

/// Distinct labels, sorted. Empty labels are ignored.
pub fn build_type_suggestions<'a, I>(labels: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    labels
        .into_iter()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Distinct vertex type labels.
pub fn vertex_types(store: &GraphStore) -> BTreeSet<String> {
    build_type_suggestions(store.vertices().iter().map(Vertex::vertex_type))
}

/// Distinct relationship type labels.
pub fn edge_types(store: &GraphStore) -> BTreeSet<String> {
    build_type_suggestions(store.relationships().map(|r| r.rel_type.as_str()))
}

/// Immutable snapshot of the three suggestion indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionIndex {
    /// Entity autocomplete entries.
    pub entities: Vec<EntitySuggestion>,
    /// Vertex type labels.
    pub vertex_types: Vec<String>,
    /// Relationship type labels.
    pub edge_types: Vec<String>,
}

impl SuggestionIndex {
    /// Compute all indices from a populated store.
    pub fn build(store: &GraphStore) -> Self {
        let index = Self {
            entities: build_entity_suggestions(store),
            vertex_types: vertex_types(store).into_iter().collect(),
            edge_types: edge_types(store).into_iter().collect(),
        };

        tracing::info!(
            entities = index.entities.len(),
            vertex_types = index.vertex_types.len(),
            edge_types = index.edge_types.len(),
            "Suggestion indices built"
        );

        index
    }
}
