//! Directed shortest path.

use serde_json::Value;

use super::distance::{path_between, Direction};
use super::{AlgorithmError, AlgorithmParams, GraphAlgorithm, SHORTEST_PATH};
use crate::store::GraphStore;

/// Default hop bound when `max_hops` is not supplied.
pub const DEFAULT_MAX_HOPS: usize = 6;

/// Shortest path following relationships from source to target only.
///
/// Parameters: `source` and `target` (or `entity1` / `entity2`), `max_hops`.
/// The answer has the same shape as the distance capability's.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestPath;

impl GraphAlgorithm for ShortestPath {
    fn name(&self) -> &'static str {
        SHORTEST_PATH
    }

    fn invoke(&self, graph: &GraphStore, params: &AlgorithmParams) -> Result<Value, AlgorithmError> {
        let from = match params.opt_str("source")? {
            Some(s) => s,
            None => params.str("entity1")?,
        };
        let to = match params.opt_str("target")? {
            Some(t) => t,
            None => params.str("entity2")?,
        };
        let max_hops = params.usize_or("max_hops", DEFAULT_MAX_HOPS)?;

        let result = path_between(graph, from, to, max_hops, Direction::Outgoing, params)?;
        Ok(serde_json::to_value(result)?)
    }
}
