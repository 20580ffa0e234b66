//! Entity Graph REST Service
//!
//! Exposes the graph over HTTP.
//!
//! ## Endpoints
//!
//! - `POST /string` - Echo the request body
//! - `POST /json` - Join `firstName` and `lastName` from a JSON body
//! - `GET /spreading_activation?entity=NAME` - Related entities by activation
//! - `GET /distance_algorithm?entity1=A&entity2=B` - Path within 4 hops
//! - `POST /algorithms/{name}` - Invoke any registered capability
//! - `POST /vertices` - Upsert a vertex (`{__id, name, type}`), 201 on success
//! - `POST /edges` - Add a relationship (`{source, target, type}`), 201 on success
//! - `GET /data.json`, `/vertexTypes.json`, `/edgeTypes.json` - Suggestion indices
//! - `GET /info` - Request echo as HTML
//! - `GET /health` - Service health
//! - `GET /*` - Static files under the public root

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod static_files;

pub use error::RequestError;
pub use middleware::{metrics_middleware, record_algorithm_metrics, record_edit};
pub use routes::create_router;
pub use state::{ServiceState, SuggestionDocuments};
pub use static_files::resolve_static_path;
