//! Axum routes for the entity graph service.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::algorithms::{AlgorithmParams, DISTANCE_ALGORITHM, SPREADING_ACTIVATION};
use crate::edit_log::{EdgeRecord, VertexRecord};
use crate::types::{NAME_PROPERTY, TYPE_PROPERTY};

use super::error::RequestError;
use super::middleware::{record_algorithm_metrics, record_edit};
use super::state::ServiceState;
use super::static_files::{content_type, resolve_static_path};

type AppState = Arc<ServiceState>;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of `POST /json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRequest {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Age, accepted and ignored.
    #[serde(default)]
    pub age: Option<u32>,
}

/// Body of `POST /vertices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVertexRequest {
    /// Vertex identifier.
    #[serde(rename = "__id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Type label.
    #[serde(rename = "type")]
    pub vertex_type: String,
}

/// Body of `POST /edges`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEdgeRequest {
    /// Source identifier.
    pub source: String,
    /// Target identifier.
    pub target: String,
    /// Relationship type.
    #[serde(rename = "type")]
    pub rel_type: String,
}

/// Service health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub vertices: usize,
    pub relationships: usize,
    pub entity_suggestions: usize,
    pub capabilities: Vec<String>,
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, RequestError> {
    serde_json::from_slice(body).map_err(|e| RequestError::Validation(e.to_string()))
}

fn require_non_empty(field: &str, value: &str) -> Result<(), RequestError> {
    if value.trim().is_empty() {
        return Err(RequestError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn json_response(body: impl Into<Body>) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body.into()).into_response()
}

fn query_params(query: Result<Query<HashMap<String, String>>, QueryRejection>) -> Result<HashMap<String, String>, RequestError> {
    query
        .map(|Query(q)| q)
        .map_err(|rejection| RequestError::Validation(rejection.body_text()))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Echo the request body.
async fn string_handler(body: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

/// Spreading activation with the fixed web parameters.
async fn spreading_activation_handler(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Response, RequestError> {
    let query = query_params(query)?;
    let entity = query.get("entity").cloned().unwrap_or_default();
    info!(entity = %entity, "Spreading activation requested");

    let mut params = AlgorithmParams::new()
        .with("entity", entity)
        .with("max_iterations", 10)
        .with("fanout_limit", 8)
        .with("min_activation", 0.0001);
    if let Some(filter) = query.get("filter") {
        params = params.with("filter", filter.as_str());
    }

    run_algorithm(&state, SPREADING_ACTIVATION, params).await
}

/// Hop-bounded distance between two entities.
async fn distance_handler(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Response, RequestError> {
    let query = query_params(query)?;
    let entity1 = query.get("entity1").cloned().unwrap_or_default();
    let entity2 = query.get("entity2").cloned().unwrap_or_default();
    info!(entity1 = %entity1, entity2 = %entity2, "Distance requested");

    let params = AlgorithmParams::new()
        .with("entity1", entity1)
        .with("entity2", entity2)
        .with("max_hops", 4);

    run_algorithm(&state, DISTANCE_ALGORITHM, params).await
}

/// Invoke any registered capability with a JSON object of parameters.
async fn algorithm_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, RequestError> {
    let values = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::Map::new()
    } else {
        match parse_body::<Value>(&body)? {
            Value::Object(map) => map,
            other => {
                return Err(RequestError::Validation(format!(
                    "expected a JSON object of parameters, got {other}"
                )))
            }
        }
    };

    run_algorithm(&state, &name, AlgorithmParams::from_map(values)).await
}

/// Run a capability on a blocking worker while holding the graph read lock.
async fn run_algorithm(
    state: &AppState,
    name: &str,
    params: AlgorithmParams,
) -> Result<Response, RequestError> {
    let params = params.with_timeout(state.algorithm_timeout);
    let graph = Arc::clone(&state.graph);
    let gateway = Arc::clone(&state.gateway);
    let capability = name.to_string();
    let start = Instant::now();

    let result = tokio::task::spawn_blocking(move || {
        let graph = graph.read();
        gateway.invoke(&capability, &graph, &params)
    })
    .await
    .map_err(|e| RequestError::Internal(e.to_string()))?;

    record_algorithm_metrics(name, result.is_ok(), start.elapsed().as_millis() as u64);
    Ok(json_response(result?))
}

/// Join `firstName` and `lastName`.
async fn json_handler(body: Bytes) -> Result<String, RequestError> {
    let person: PersonRequest = parse_body(&body)?;
    Ok(format!("{} {}", person.first_name, person.last_name))
}

/// Upsert a vertex and record it in the edit log.
async fn create_vertex_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, RequestError> {
    let request: CreateVertexRequest = parse_body(&body)?;
    require_non_empty("__id", &request.id)?;

    let record = VertexRecord {
        id: request.id,
        name: request.name,
        vertex_type: request.vertex_type,
    };

    let start = Instant::now();
    let edit_log = Arc::clone(&state.edit_log);
    let graph = Arc::clone(&state.graph);
    // The graph update runs under the sidecar lock so memory follows log order
    let record = tokio::task::spawn_blocking(move || {
        edit_log
            .append_vertex_and(&record, || {
                let mut graph = graph.write();
                let idx = graph.get_or_create_vertex(&record.id);
                graph.set_property(idx, TYPE_PROPERTY, &record.vertex_type);
                graph.set_property(idx, NAME_PROPERTY, &record.name);
            })
            .map(|()| record)
    })
    .await
    .map_err(|e| RequestError::Internal(e.to_string()))??;

    record_edit("vertex", start.elapsed().as_millis() as u64);
    info!(id = %record.id, name = %record.name, vertex_type = %record.vertex_type, "Saved vertex");
    Ok(StatusCode::CREATED)
}

/// Add a relationship and record it in the edit log.
async fn create_edge_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, RequestError> {
    let request: CreateEdgeRequest = parse_body(&body)?;
    require_non_empty("source", &request.source)?;
    require_non_empty("target", &request.target)?;

    let record = EdgeRecord {
        src: request.source,
        dst: request.target,
        rel_type: request.rel_type,
    };

    let start = Instant::now();
    let edit_log = Arc::clone(&state.edit_log);
    let graph = Arc::clone(&state.graph);
    let record = tokio::task::spawn_blocking(move || {
        edit_log
            .append_edge_and(&record, || {
                graph
                    .write()
                    .add_relationship(&record.src, &record.dst, &record.rel_type);
            })
            .map(|()| record)
    })
    .await
    .map_err(|e| RequestError::Internal(e.to_string()))??;

    record_edit("edge", start.elapsed().as_millis() as u64);
    info!(source = %record.src, target = %record.dst, rel_type = %record.rel_type, "Saved edge");
    Ok(StatusCode::CREATED)
}

/// Debug echo of the request line and headers.
async fn info_handler(method: Method, uri: Uri, version: Version, headers: HeaderMap) -> Response {
    let path = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());

    let mut html = String::from("<h1>Request:</h1>");
    html.push_str(&format!("{} {} {:?}<br>", method, escape_html(path), version));
    for (name, value) in &headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        html.push_str(&format!("{}: {}<br>", name, escape_html(&value)));
    }

    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response()
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

async fn entity_suggestions_handler(State(state): State<AppState>) -> Response {
    json_response(state.suggestions.entities.clone())
}

async fn edge_types_handler(State(state): State<AppState>) -> Response {
    json_response(state.suggestions.edge_types.clone())
}

async fn vertex_types_handler(State(state): State<AppState>) -> Response {
    json_response(state.suggestions.vertex_types.clone())
}

/// Health check endpoint.
async fn health_handler(State(state): State<AppState>) -> axum::Json<HealthResponse> {
    let (vertices, relationships) = {
        let graph = state.graph.read();
        (graph.vertex_count(), graph.relationship_count())
    };

    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
        vertices,
        relationships,
        entity_suggestions: state.suggestions.entity_count,
        capabilities: state.gateway.names().into_iter().map(str::to_string).collect(),
    })
}

/// Serve a file from the public root.
async fn static_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Result<Response, RequestError> {
    if method != Method::GET && method != Method::HEAD {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    let path = resolve_static_path(&state.public_dir, uri.path());
    let content = tokio::fs::read(&path)
        .await
        .map_err(|_| RequestError::StaticFile(path.display().to_string()))?;

    Ok(([(header::CONTENT_TYPE, content_type(&path))], content).into_response())
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the entity graph service.
pub fn create_router(state: ServiceState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/string", post(string_handler))
        .route("/string/", post(string_handler))
        .route("/json", post(json_handler))
        .route("/json/", post(json_handler))
        // Analytics
        .route("/spreading_activation", get(spreading_activation_handler))
        .route("/distance_algorithm", get(distance_handler))
        .route("/algorithms/:name", post(algorithm_handler))
        // Mutations
        .route("/vertices", post(create_vertex_handler))
        .route("/vertices/", post(create_vertex_handler))
        .route("/edges", post(create_edge_handler))
        .route("/edges/", post(create_edge_handler))
        // Suggestion indices
        .route("/data.json", get(entity_suggestions_handler))
        .route("/edgeTypes.json", get(edge_types_handler))
        .route("/vertexTypes.json", get(vertex_types_handler))
        // Diagnostics
        .route("/info", get(info_handler))
        .route("/info/", get(info_handler))
        .route("/health", get(health_handler))
        .fallback(static_handler)
        .with_state(state)
}
