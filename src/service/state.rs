//! Service state management.
//!
//! Contains the shared graph, the edit log writer, the capability gateway and
//! the pre-serialized suggestion documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;

use crate::algorithms::AlgorithmGateway;
use crate::config::{ServerConfig, DEFAULT_ALGORITHM_TIMEOUT};
use crate::edit_log::EditLog;
use crate::store::{self, GraphStore, SharedGraph};
use crate::suggest::SuggestionIndex;

/// The three suggestion indices, serialized once at startup.
///
/// Served verbatim for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct SuggestionDocuments {
    /// `data.json`: entity autocomplete entries.
    pub entities: Bytes,
    /// `vertexTypes.json`: sorted vertex type labels.
    pub vertex_types: Bytes,
    /// `edgeTypes.json`: sorted relationship type labels.
    pub edge_types: Bytes,
    /// Number of entity entries.
    pub entity_count: usize,
}

impl SuggestionDocuments {
    /// Serialize a suggestion index.
    pub fn from_index(index: &SuggestionIndex) -> Result<Self, serde_json::Error> {
        Ok(Self {
            entities: Bytes::from(serde_json::to_vec(&index.entities)?),
            vertex_types: Bytes::from(serde_json::to_vec(&index.vertex_types)?),
            edge_types: Bytes::from(serde_json::to_vec(&index.edge_types)?),
            entity_count: index.entities.len(),
        })
    }
}

/// Shared service state.
///
/// Contains the graph, the edit log sidecars, registered capabilities and
/// the startup suggestion snapshot.
pub struct ServiceState {
    /// The graph, behind a single-writer/multiple-reader lock.
    pub graph: SharedGraph,
    /// Writer for `custom_vertices.csv` / `custom_edges.csv`.
    pub edit_log: Arc<EditLog>,
    /// Named analytic capabilities.
    pub gateway: Arc<AlgorithmGateway>,
    /// Pre-serialized suggestion indices.
    pub suggestions: SuggestionDocuments,
    /// Root of the static file service.
    pub public_dir: PathBuf,
    /// Wall-clock budget per analytic query.
    pub algorithm_timeout: Duration,
}

impl ServiceState {
    /// Create service state around a loaded graph.
    ///
    /// The suggestion index must have been built from the same graph; it is
    /// serialized here and never refreshed.
    pub fn new(
        graph: GraphStore,
        edit_log: EditLog,
        suggestions: &SuggestionIndex,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            graph: store::share(graph),
            edit_log: Arc::new(edit_log),
            gateway: Arc::new(AlgorithmGateway::with_defaults()),
            suggestions: SuggestionDocuments::from_index(suggestions)?,
            public_dir: PathBuf::from("public"),
            algorithm_timeout: DEFAULT_ALGORITHM_TIMEOUT,
        })
    }

    /// Apply the runtime settings of a server configuration.
    pub fn with_config(self, config: &ServerConfig) -> Self {
        self.with_public_dir(&config.public_dir)
            .with_algorithm_timeout(config.algorithm_timeout)
    }

    /// Replace the capability gateway.
    pub fn with_gateway(mut self, gateway: AlgorithmGateway) -> Self {
        self.gateway = Arc::new(gateway);
        self
    }

    /// Serve static files from `dir`.
    pub fn with_public_dir(mut self, dir: &Path) -> Self {
        self.public_dir = dir.to_path_buf();
        self
    }

    /// Set the analytic query budget.
    pub fn with_algorithm_timeout(mut self, timeout: Duration) -> Self {
        self.algorithm_timeout = timeout;
        self
    }
}
