//! Service middleware for request metrics.
//!
//! ## Metrics Exposed
//!
//! - `request_metric` - one event per request with route label, method,
//!   status and latency
//! - `algorithm_metric` - one event per analytic query
//! - `edit_metric` - one event per edit log append

use std::sync::OnceLock;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use regex_lite::Regex;
use tracing::info;

/// Metrics middleware that records request counts and latency.
///
/// Uses tracing events; aggregate them from the logs.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let route = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "entity_graph::metrics",
        metric_type = "request",
        route = %route,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

fn route_patterns() -> &'static [(Regex, Option<&'static str>)] {
    static PATTERNS: OnceLock<Vec<(Regex, Option<&'static str>)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // API routes keep their own path; `None` means "use the match".
            (
                r"^/(string|json|vertices|edges|info|health|spreading_activation|distance_algorithm|data\.json|edgeTypes\.json|vertexTypes\.json)",
                None,
            ),
            (r"^/algorithms/[^/]+/?$", Some("/algorithms/:name")),
        ]
        .into_iter()
        .filter_map(|(pattern, label)| Regex::new(pattern).ok().map(|re| (re, label)))
        .collect()
    })
}

/// Normalize a request path into a low-cardinality route label.
///
/// API paths are kept, capability names are replaced with `:name`, and
/// everything served by the static fallback collapses into `/static`.
pub(crate) fn normalize_path(path: &str) -> String {
    for (regex, label) in route_patterns() {
        if let Some(m) = regex.find(path) {
            let rest = &path[m.end()..];
            if label.is_some() || rest.is_empty() || rest == "/" {
                return label.map_or_else(|| m.as_str().to_string(), str::to_string);
            }
        }
    }
    "/static".to_string()
}

/// Record an analytic query.
pub fn record_algorithm_metrics(capability: &str, success: bool, latency_ms: u64) {
    let status = if success { "success" } else { "error" };
    info!(
        target: "entity_graph::metrics",
        metric_type = "algorithm",
        capability = capability,
        status = status,
        latency_ms = latency_ms,
        "algorithm_metric"
    );
}

/// Record an edit log append.
pub fn record_edit(kind: &'static str, latency_ms: u64) {
    info!(
        target: "entity_graph::metrics",
        metric_type = "edit",
        kind = kind,
        latency_ms = latency_ms,
        "edit_metric"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_keeps_api_routes() {
        assert_eq!(normalize_path("/spreading_activation"), "/spreading_activation");
        assert_eq!(normalize_path("/json/"), "/json");
        assert_eq!(normalize_path("/data.json"), "/data.json");
    }

    #[test]
    fn test_normalize_path_replaces_capability_name() {
        assert_eq!(normalize_path("/algorithms/impulse"), "/algorithms/:name");
    }

    #[test]
    fn test_normalize_path_collapses_static_files() {
        assert_eq!(normalize_path("/css/app.css"), "/static");
        assert_eq!(normalize_path("/"), "/static");
        assert_eq!(normalize_path("/jsonx"), "/static");
        assert_eq!(normalize_path("/info/secret.png"), "/static");
    }
}
