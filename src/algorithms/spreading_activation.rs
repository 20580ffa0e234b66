//! Spreading activation from a start entity.
//!
//! The start vertex receives activation 1.0. In every iteration each vertex
//! activated in the previous round hands `activation * decay` to at most
//! `fanout_limit` neighbours (both directions), split evenly. Shares below
//! `min_activation` are dropped. Vertices are ranked by total received
//! activation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AlgorithmError, AlgorithmParams, EntityRef, GraphAlgorithm, SPREADING_ACTIVATION};
use crate::store::GraphStore;
use crate::types::VertexIdx;

/// One ranked entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activation {
    /// The activated vertex.
    #[serde(flatten)]
    pub entity: EntityRef,
    /// Accumulated activation.
    pub activation: f64,
}

/// Result payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadingResult {
    /// Entity as requested.
    pub entity: String,
    /// Whether the entity resolved to a vertex.
    pub found: bool,
    /// Ranked related entities, start excluded.
    pub results: Vec<Activation>,
}

/// Spreading activation capability.
///
/// Parameters: `entity` (required), `max_iterations` (10), `fanout_limit`
/// (8), `min_activation` (0.0001), `filter` (comma-separated relationship
/// types), `decay`, `limit`.
#[derive(Debug, Clone)]
pub struct SpreadingActivation {
    /// Fraction of activation passed on per hop.
    pub decay: f64,
    /// Maximum number of ranked results.
    pub limit: usize,
}

impl Default for SpreadingActivation {
    fn default() -> Self {
        Self { decay: 0.85, limit: 50 }
    }
}

impl GraphAlgorithm for SpreadingActivation {
    fn name(&self) -> &'static str {
        SPREADING_ACTIVATION
    }

    fn invoke(&self, graph: &GraphStore, params: &AlgorithmParams) -> Result<Value, AlgorithmError> {
        let entity = params.str("entity")?;
        let max_iterations = params.usize_or("max_iterations", 10)?;
        let fanout_limit = params.usize_or("fanout_limit", 8)?;
        let threshold = params.f64_or("min_activation", 0.0001)?;
        let decay = params.f64_or("decay", self.decay)?;
        let limit = params.usize_or("limit", self.limit)?;
        let filter = params.type_filter("filter")?;

        let Some(start) = graph.resolve(entity) else {
            return Ok(serde_json::to_value(SpreadingResult {
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
            for (&node, &energy) in &frontier {
                if energy < threshold {
                    continue;
                }

                let targets: Vec<VertexIdx> = graph
                    .neighbors(node)
                    .filter(|(_, rel)| filter.as_ref().map_or(true, |f| f.contains(&rel.rel_type)))
                    .map(|(n, _)| n)
                    .filter(|&n| n != node)
                    .take(fanout_limit)
                    .collect();
                if targets.is_empty() {
                    continue;
                }

                let share = energy * decay / targets.len() as f64;
                if share < threshold {
                    continue;
                }
                for target in targets {
                    *next.entry(target).or_default() += share;
                }
            }

            if next.is_empty() {
                break;
            }
            for (&node, &energy) in &next {
                *total.entry(node).or_default() += energy;
            }
            frontier = next;
        }

        let mut ranked: Vec<(VertexIdx, f64)> = total
            .into_iter()
            .filter(|&(idx, activation)| idx != start && activation >= threshold)
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| graph.vertex(a.0).identifier().cmp(graph.vertex(b.0).identifier()))
        });

        let results = ranked
            .into_iter()
            .take(limit)
            .map(|(idx, activation)| Activation { entity: EntityRef::of(graph, idx), activation })
            .collect();

        Ok(serde_json::to_value(SpreadingResult {
            entity: entity.to_string(),
            found: true,
            results,
        })?)
    }
}
