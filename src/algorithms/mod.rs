//! Named analytic capabilities.
//!
//! The server never calls a concrete analytic directly. Each capability is
//! registered under a name in an [`AlgorithmGateway`] and invoked with a
//! read-only view of the graph plus named parameters; the result comes back
//! as serialized JSON.
//!
//! ## Contract
//!
//! - Implementations only read the graph.
//! - Implementations terminate within their own iteration / hop bounds and
//!   call [`AlgorithmParams::check_deadline`] between steps, so a caller
//!   holding the graph read lock gets it back within the wall-clock budget.
//! - An entity that does not resolve yields a neutral result that says so
//!   (`found: false` or `reachable: false`), never an error.

pub mod spreading_activation;
pub mod distance;
pub mod shortest_path;
pub mod impulse;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::GraphStore;
use crate::types::VertexIdx;

pub use spreading_activation::SpreadingActivation;
pub use distance::DistanceAlgorithm;
pub use shortest_path::ShortestPath;
pub use impulse::Impulse;

/// Capability name of spreading activation.
pub const SPREADING_ACTIVATION: &str = "spreading_activation";
/// Capability name of the hop-bounded distance query.
pub const DISTANCE_ALGORITHM: &str = "distance_algorithm";
/// Capability name of the directed shortest path.
pub const SHORTEST_PATH: &str = "shortest_path";
/// Capability name of impulse propagation.
pub const IMPULSE: &str = "impulse";

/// Error type for capability invocation.
#[derive(Debug, thiserror::Error)]
pub enum AlgorithmError {
    /// No capability registered under this name.
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),
    /// A required parameter was not supplied.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),
    /// A parameter had the wrong shape.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// What was wrong.
        reason: String,
    },
    /// The wall-clock budget ran out mid-traversal.
    #[error("Deadline exceeded")]
    DeadlineExceeded,
    /// The result could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AlgorithmError {
    fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { name: name.to_string(), reason: reason.into() }
    }
}

/// Named parameters handed to a capability, plus an optional deadline.
///
/// Numbers may be supplied as JSON numbers or numeric strings.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmParams {
    values: Map<String, Value>,
    deadline: Option<Instant>,
}

impl AlgorithmParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object.
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values, deadline: None }
    }

    /// Add a parameter.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Stop traversals at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop traversals `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Fail with [`AlgorithmError::DeadlineExceeded`] once the deadline passed.
    pub fn check_deadline(&self) -> Result<(), AlgorithmError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(AlgorithmError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Required string parameter.
    pub fn str(&self, key: &str) -> Result<&str, AlgorithmError> {
        self.opt_str(key)?
            .ok_or_else(|| AlgorithmError::MissingParameter(key.to_string()))
    }

    /// Optional string parameter; empty strings count as absent.
    pub fn opt_str(&self, key: &str) -> Result<Option<&str>, AlgorithmError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(AlgorithmError::invalid(key, format!("expected string, got {other}"))),
        }
    }

    /// Optional non-negative integer parameter.
    pub fn opt_usize(&self, key: &str) -> Result<Option<usize>, AlgorithmError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(|v| Some(v as usize))
                .ok_or_else(|| AlgorithmError::invalid(key, format!("expected non-negative integer, got {n}"))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<usize>()
                .map(Some)
                .map_err(|e| AlgorithmError::invalid(key, e.to_string())),
            Some(other) => Err(AlgorithmError::invalid(key, format!("expected integer, got {other}"))),
        }
    }

    /// Integer parameter with a default.
    pub fn usize_or(&self, key: &str, default: usize) -> Result<usize, AlgorithmError> {
        Ok(self.opt_usize(key)?.unwrap_or(default))
    }

    /// Optional floating point parameter.
    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>, AlgorithmError> {
        let value = match self.values.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| AlgorithmError::invalid(key, format!("expected number, got {n}")))?,
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| AlgorithmError::invalid(key, e.to_string()))?,
            Some(other) => return Err(AlgorithmError::invalid(key, format!("expected number, got {other}"))),
        };
        if !value.is_finite() {
            return Err(AlgorithmError::invalid(key, "must be finite"));
        }
        Ok(Some(value))
    }

    /// Floating point parameter with a default.
    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64, AlgorithmError> {
        Ok(self.opt_f64(key)?.unwrap_or(default))
    }

    /// Relationship type filter: a comma-separated list, absent means all.
    pub fn type_filter(&self, key: &str) -> Result<Option<BTreeSet<String>>, AlgorithmError> {
        Ok(self.opt_str(key)?.map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        }))
    }
}

/// Reference to a vertex in a result payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Vertex identifier.
    pub id: String,
    /// Display alias.
    pub name: String,
    /// Type label.
    #[serde(rename = "type")]
    pub vertex_type: String,
}

impl EntityRef {
    /// Describe the vertex at `idx`.
    pub fn of(graph: &GraphStore, idx: VertexIdx) -> Self {
        let v = graph.vertex(idx);
        Self {
            id: v.identifier().to_string(),
            name: v.alias().to_string(),
            vertex_type: v.vertex_type().to_string(),
        }
    }
}

/// A named analytic over the graph.
pub trait GraphAlgorithm: Send + Sync {
    /// Capability name used for dispatch.
    fn name(&self) -> &'static str;

    /// Run against a read-only graph.
    fn invoke(&self, graph: &GraphStore, params: &AlgorithmParams) -> Result<Value, AlgorithmError>;
}

/// Registry of named capabilities.
#[derive(Clone, Default)]
pub struct AlgorithmGateway {
    capabilities: BTreeMap<&'static str, Arc<dyn GraphAlgorithm>>,
}

impl AlgorithmGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway with the four reference capabilities registered.
    pub fn with_defaults() -> Self {
        let mut gateway = Self::new();
        gateway.register(SpreadingActivation::default());
        gateway.register(DistanceAlgorithm);
        gateway.register(ShortestPath);
        gateway.register(Impulse::default());
        gateway
    }

    /// Register a capability under its name, replacing any previous one.
    pub fn register<A: GraphAlgorithm + 'static>(&mut self, algorithm: A) -> Option<Arc<dyn GraphAlgorithm>> {
        self.capabilities.insert(algorithm.name(), Arc::new(algorithm))
    }

    /// Look up a capability.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn GraphAlgorithm>> {
        self.capabilities.get(name)
    }

    /// Registered capability names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.capabilities.keys().copied().collect()
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Check if no capability is registered.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Invoke a capability and return its result as a JSON value.
    pub fn invoke_value(
        &self,
        name: &str,
        graph: &GraphStore,
        params: &AlgorithmParams,
    ) -> Result<Value, AlgorithmError> {
        let algorithm = self
            .get(name)
            .ok_or_else(|| AlgorithmError::UnknownCapability(name.to_string()))?;
        params.check_deadline()?;
        algorithm.invoke(graph, params)
    }

    /// Invoke a capability and return its result as JSON text.
    pub fn invoke(
        &self,
        name: &str,
        graph: &GraphStore,
        params: &AlgorithmParams,
    ) -> Result<String, AlgorithmError> {
        let value = self.invoke_value(name, graph, params)?;
        Ok(serde_json::to_string(&value)?)
    }
}

impl fmt::Debug for AlgorithmGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmGateway")
            .field("capabilities", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct VertexCount;

    impl GraphAlgorithm for VertexCount {
        fn name(&self) -> &'static str {
            "vertex_count"
        }

        fn invoke(&self, graph: &GraphStore, _params: &AlgorithmParams) -> Result<Value, AlgorithmError> {
            Ok(json!({ "count": graph.vertex_count() }))
        }
    }

    #[test]
    fn test_defaults_registered() {
        let gateway = AlgorithmGateway::with_defaults();
        assert_eq!(
            gateway.names(),
            vec![DISTANCE_ALGORITHM, IMPULSE, SHORTEST_PATH, SPREADING_ACTIVATION]
        );
    }

    #[test]
    fn test_custom_capability_dispatch() {
        let mut gateway = AlgorithmGateway::new();
        assert!(gateway.register(VertexCount).is_none());

        let mut graph = GraphStore::new();
        graph.add_relationship("a", "b", "x");

        let out = gateway.invoke("vertex_count", &graph, &AlgorithmParams::new()).unwrap();
        assert_eq!(out, r#"{"count":2}"#);
    }

    #[test]
    fn test_unknown_capability() {
        let gateway = AlgorithmGateway::new();
        let err = gateway.invoke("pagerank", &GraphStore::new(), &AlgorithmParams::new()).unwrap_err();
        assert!(matches!(err, AlgorithmError::UnknownCapability(name) if name == "pagerank"));
    }

    #[test]
    fn test_expired_deadline_rejected_before_invoke() {
        let mut gateway = AlgorithmGateway::new();
        gateway.register(VertexCount);
        let params = AlgorithmParams::new().with_deadline(Instant::now() - Duration::from_millis(1));

        let err = gateway.invoke("vertex_count", &GraphStore::new(), &params).unwrap_err();
        assert!(matches!(err, AlgorithmError::DeadlineExceeded));
    }

    #[test]
    fn test_param_getters() {
        let params = AlgorithmParams::new()
            .with("entity", "Acme")
            .with("hops", 3)
            .with("hops_str", "7")
            .with("threshold", 0.5)
            .with("empty", "")
            .with("filter", "founded, invested_in");

        assert_eq!(params.str("entity").unwrap(), "Acme");
        assert_eq!(params.usize_or("hops", 1).unwrap(), 3);
        assert_eq!(params.usize_or("hops_str", 1).unwrap(), 7);
        assert_eq!(params.usize_or("missing", 4).unwrap(), 4);
        assert_eq!(params.f64_or("threshold", 0.0).unwrap(), 0.5);
        assert!(matches!(params.str("empty"), Err(AlgorithmError::MissingParameter(_))));
        assert!(matches!(params.usize_or("entity", 1), Err(AlgorithmError::InvalidParameter { .. })));

        let filter = params.type_filter("filter").unwrap().unwrap();
        assert!(filter.contains("founded"));
        assert!(filter.contains("invested_in"));
    }
}
