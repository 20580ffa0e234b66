//! Graph storage.
//!
//! The graph lives in a single in-memory arena. The service shares one
//! instance behind a single-writer/multiple-reader lock: mutations take the
//! write lock, analytic traversals hold the read lock for their whole run.

pub mod memory;

use std::sync::Arc;
use parking_lot::RwLock;

pub use memory::GraphStore;

/// Error type for strict store lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No vertex with this identifier has been created yet.
    #[error("Vertex not found: {0}")]
    VertexNotFound(String),
}

/// Graph handle shared between request handlers.
pub type SharedGraph = Arc<RwLock<GraphStore>>;

/// Wrap a populated store for sharing.
pub fn share(store: GraphStore) -> SharedGraph {
    Arc::new(RwLock::new(store))
}
