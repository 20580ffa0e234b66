//! # entity-graph
//!
//! In-memory typed property graph served over HTTP.
//!
//! Organizations, people, places and their typed relationships are loaded
//! from CSV datasets at startup, queried through named analytic capabilities
//! and extended at runtime through an append-only edit log that is replayed
//! on the next start.
//!
//! ## Architecture
//!
//! ```text
//! base CSVs ─┐
//!            ├─> BulkLoader ─> GraphStore ─> SuggestionIndex
//! edit log ──┘                    │
//!                                 ├─> AlgorithmGateway (read lock)
//!                                 └─> mutation handlers (write lock) ─> EditLog
//! ```
//!
//! ## Guarantees
//!
//! - Vertex identifiers are unique; get-or-create is idempotent
//! - Relationship endpoints always exist before the relationship is recorded
//! - An edit log append has reached the disk before the request succeeds
//! - Suggestion indices are a startup snapshot and are never refreshed

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod store;
pub mod loader;
pub mod edit_log;
pub mod suggest;
pub mod algorithms;
pub mod config;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{IncomingRef, Relationship, Vertex, VertexIdx};
pub use store::{GraphStore, SharedGraph, StoreError};
pub use loader::{load_dataset, BulkLoader, DatasetLayout, LoadReport, StartupError};
pub use edit_log::{EdgeRecord, EditLog, EditLogError, VertexRecord};
pub use suggest::{EntitySuggestion, SuggestionIndex};
pub use algorithms::{
    AlgorithmError, AlgorithmGateway, AlgorithmParams, EntityRef, GraphAlgorithm,
};
pub use config::{LogFormat, OverlayEdgePolicy, ServerConfig};

#[cfg(feature = "service")]
pub use service::{create_router, RequestError, ServiceState};

/// Crate version reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
