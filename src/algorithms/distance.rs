//! Hop-bounded distance between two entities.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AlgorithmError, AlgorithmParams, EntityRef, GraphAlgorithm, DISTANCE_ALGORITHM};
use crate::store::GraphStore;
use crate::types::{Relationship, VertexIdx};

/// Which relationships a path may follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Only from source to target.
    Outgoing,
    /// Either way.
    Both,
}

/// Path result shared by the distance and shortest path capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathResult {
    /// Start entity as requested.
    pub entity1: String,
    /// End entity as requested.
    pub entity2: String,
    /// Whether a path within the hop bound exists.
    pub reachable: bool,
    /// Number of hops, when reachable.
    pub distance: Option<usize>,
    /// Vertices along the path, endpoints included.
    pub path: Vec<EntityRef>,
    /// Relationship types along the path.
    pub relationships: Vec<String>,
}

impl PathResult {
    /// An "unreachable" answer.
    pub fn unreachable(from: &str, to: &str) -> Self {
        Self {
            entity1: from.to_string(),
            entity2: to.to_string(),
            reachable: false,
            distance: None,
            path: Vec::new(),
            relationships: Vec::new(),
        }
    }
}

/// Breadth-first search from `from` to `to` within `max_hops`.
///
/// Returns the vertices and relationship types along the first shortest
/// path found, or `None` when `to` is not reachable within the bound.
pub(crate) fn bounded_path(
    graph: &GraphStore,
    from: VertexIdx,
    to: VertexIdx,
    max_hops: usize,
    direction: Direction,
    params: &AlgorithmParams,
) -> Result<Option<(Vec<VertexIdx>, Vec<String>)>, AlgorithmError> {
    if from == to {
        return Ok(Some((vec![from], Vec::new())));
    }

    // child -> (parent, relationship type)
    let mut parents: HashMap<VertexIdx, (VertexIdx, &str)> = HashMap::new();
    let mut queue: VecDeque<(VertexIdx, usize)> = VecDeque::from([(from, 0)]);

    while let Some((node, depth)) = queue.pop_front() {
        if depth >= max_hops {
            continue;
        }
        params.check_deadline()?;

        let step: Box<dyn Iterator<Item = (VertexIdx, &Relationship)> + '_> = match direction {
            Direction::Outgoing => Box::new(graph.outgoing(node).iter().map(|r| (r.target, r))),
            Direction::Both => Box::new(graph.neighbors(node)),
        };

        for (next, rel) in step {
            if next == from || parents.contains_key(&next) {
                continue;
            }
            parents.insert(next, (node, rel.rel_type.as_str()));
            if next == to {
                return Ok(Some(unwind(&parents, from, to)));
            }
            queue.push_back((next, depth + 1));
        }
    }

    Ok(None)
}

fn unwind(
    parents: &HashMap<VertexIdx, (VertexIdx, &str)>,
    from: VertexIdx,
    to: VertexIdx,
) -> (Vec<VertexIdx>, Vec<String>) {
    let mut vertices = vec![to];
    let mut relationships = Vec::new();
    let mut current = to;
    while current != from {
        let Some(&(parent, rel_type)) = parents.get(&current) else {
            break;
        };
        relationships.push(rel_type.to_string());
        vertices.push(parent);
        current = parent;
    }
    vertices.reverse();
    relationships.reverse();
    (vertices, relationships)
}

/// Resolve both endpoints and run [`bounded_path`].
pub(crate) fn path_between(
    graph: &GraphStore,
    from: &str,
    to: &str,
    max_hops: usize,
    direction: Direction,
    params: &AlgorithmParams,
) -> Result<PathResult, AlgorithmError> {
    let (Some(a), Some(b)) = (graph.resolve(from), graph.resolve(to)) else {
        return Ok(PathResult::unreachable(from, to));
    };

    Ok(match bounded_path(graph, a, b, max_hops, direction, params)? {
        Some((vertices, relationships)) => PathResult {
            entity1: from.to_string(),
            entity2: to.to_string(),
            reachable: true,
            distance: Some(relationships.len()),
            path: vertices.into_iter().map(|idx| EntityRef::of(graph, idx)).collect(),
            relationships,
        },
        None => PathResult::unreachable(from, to),
    })
}

/// Distance capability: undirected, hop-bounded.
///
/// Parameters: `entity1`, `entity2` (required), `max_hops` (4).
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceAlgorithm;

impl GraphAlgorithm for DistanceAlgorithm {
    fn name(&self) -> &'static str {
        DISTANCE_ALGORITHM
    }

    fn invoke(&self, graph: &GraphStore, params: &AlgorithmParams) -> Result<Value, AlgorithmError> {
        let from = params.str("entity1")?;
        let to = params.str("entity2")?;
        let max_hops = params.usize_or("max_hops", 4)?;

        let result = path_between(graph, from, to, max_hops, Direction::Both, params)?;
        Ok(serde_json::to_value(result)?)
    }
}
