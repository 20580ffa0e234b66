//! Impulse propagation along outgoing relationships.
//!
//! Unlike spreading activation the impulse only travels from source to
//! target, and each vertex passes its full decayed impulse to every target
//! instead of splitting it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AlgorithmError, AlgorithmParams, EntityRef, GraphAlgorithm, IMPULSE};
use crate::store::GraphStore;
use crate::types::VertexIdx;

/// One reached entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpulseHit {
    /// The reached vertex.
    #[serde(flatten)]
    pub entity: EntityRef,
    /// Accumulated impulse.
    pub impulse: f64,
}

/// Result payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpulseResult {
    /// Entity as requested.
    pub entity: String,
    /// Whether the entity resolved to a vertex.
    pub found: bool,
    /// Reached entities, strongest first.
    pub results: Vec<ImpulseHit>,
}

/// Impulse capability.
///
/// Parameters: `entity` (required), `max_iterations` (5), `decay` (0.5),
/// `min_impulse` (0.001), `filter`, `limit`.
#[derive(Debug, Clone)]
pub struct Impulse {
    /// Fraction of impulse passed on per hop.
    pub decay: f64,
    /// Maximum number of ranked results.
    pub limit: usize,
}

impl Default for Impulse {
    fn default() -> Self {
        Self { decay: 0.5, limit: 50 }
    }
}

impl GraphAlgorithm for Impulse {
    fn name(&self) -> &'static str {
        IMPULSE
    }

    fn invoke(&self, graph: &GraphStore, params: &AlgorithmParams) -> Result<Value, AlgorithmError> {
        let entity = params.str("entity")?;
        let max_iterations = params.usize_or("max_iterations", 5)?;
        let decay = params.f64_or("decay", self.decay)?;
        let threshold = params.f64_or("min_impulse", 0.001)?;
        let limit = params.usize_or("limit", self.limit)?;
        let filter = params.type_filter("filter")?;

        let Some(start) = graph.resolve(entity) else {
            return Ok(serde_json::to_value(ImpulseResult {
                entity: entity.to_string(),
                found: false,
                results: Vec::new(),
            })?);
        };

        let mut total: BTreeMap<VertexIdx, f64> = BTreeMap::new();
        let mut frontier: BTreeMap<VertexIdx, f64> = BTreeMap::from([(start, 1.0)]);

        for _ in 0..max_iterations {
            params.check_deadline()?;

            let mut next: BTreeMap<VertexIdx, f64> = BTreeMap::new();
            for (&node, &impulse) in &frontier {
                let passed = impulse * decay;
                if passed < threshold {
                    continue;
                }
                for rel in graph.outgoing(node) {
                    if filter.as_ref().map_or(false, |f| !f.contains(&rel.rel_type)) {
                        continue;
                    }
                    *next.entry(rel.target).or_default() += passed;
                }
            }

            if next.is_empty() {
                break;
            }
            for (&node, &impulse) in &next {
                *total.entry(node).or_default() += impulse;
            }
            frontier = next;
        }

        total.remove(&start);
        let mut ranked: Vec<(VertexIdx, f64)> = total.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| graph.vertex(a.0).identifier().cmp(graph.vertex(b.0).identifier()))
        });

        let results = ranked
            .into_iter()
            .take(limit)
            .map(|(idx, impulse)| ImpulseHit { entity: EntityRef::of(graph, idx), impulse })
            .collect();

        Ok(serde_json::to_value(ImpulseResult {
            entity: entity.to_string(),
            found: true,
            results,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(graph: &GraphStore, params: AlgorithmParams) -> ImpulseResult {
        serde_json::from_value(Impulse::default().invoke(graph, &params).unwrap()).unwrap()
    }

    fn impulse_of(result: &ImpulseResult, id: &str) -> Option<f64> {
        result.results.iter().find(|h| h.entity.id == id).map(|h| h.impulse)
    }

    #[test]
    fn test_decays_per_hop() {
        let mut g = GraphStore::new();
        g.add_relationship("a", "b", "x");
        g.add_relationship("b", "c", "x");

        let result = run(&g, AlgorithmParams::new().with("entity", "a"));
        assert!(result.found);
        assert_eq!(impulse_of(&result, "b"), Some(0.5));
        assert_eq!(impulse_of(&result, "c"), Some(0.25));
    }

    #[test]
    fn test_only_outgoing() {
        let mut g = GraphStore::new();
        g.add_relationship("upstream", "a", "x");
        g.add_relationship("a", "b", "x");

        let result = run(&g, AlgorithmParams::new().with("entity", "a"));
        assert!(impulse_of(&result, "upstream").is_none());
        assert!(impulse_of(&result, "b").is_some());
    }

    #[test]
    fn test_converging_paths_accumulate() {
        let mut g = GraphStore::new();
        g.add_relationship("a", "b", "x");
        g.add_relationship("a", "c", "x");
        g.add_relationship("b", "d", "x");
        g.add_relationship("c", "d", "x");

        let result = run(&g, AlgorithmParams::new().with("entity", "a"));
        assert_eq!(impulse_of(&result, "d"), Some(0.5));
        assert_eq!(result.results[0].entity.id, "b");
    }

    #[test]
    fn test_cycle_excludes_start() {
        let mut g = GraphStore::new();
        g.add_relationship("a", "b", "x");
        g.add_relationship("b", "a", "x");

        let result = run(&g, AlgorithmParams::new().with("entity", "a"));
        assert!(impulse_of(&result, "a").is_none());
    }

    #[test]
    fn test_unknown_entity() {
        let result = run(&GraphStore::new(), AlgorithmParams::new().with("entity", "ghost"));
        assert!(!result.found);
    }
}
