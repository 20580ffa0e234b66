//! Entity Graph Server Binary
//!
//! Loads the datasets under a data path and serves the graph over HTTP:
//! - Structured JSON logging
//! - Request tracing with correlation IDs
//! - Graceful shutdown handling
//!
//! ## Configuration
//!
//! Arguments: `<DATA_PATH> [PORT]` (port defaults to 8080).
//!
//! Environment variables:
//! - `HOST`: Bind host (default: 0.0.0.0)
//! - `PUBLIC_DIR`: Static file root (default: public)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//! - `ALGORITHM_TIMEOUT_MS`: Budget per analytic query (default: 30000)
//! - `OVERLAY_EDGE_POLICY`: "dedupe" or "append" (default: dedupe)
//! - `EDGE_DELIMITER`: Delimiter of the base edges file (default: ,)
//!
//! ## Usage
//!
//! ```bash
//! LOG_FORMAT=pretty cargo run --bin entity_graph_server -- ./data 8080
//! ```

use std::backtrace::Backtrace;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use entity_graph::service::{create_router, metrics_middleware, ServiceState};
use entity_graph::{load_dataset, EditLog, LogFormat, ServerConfig, SuggestionIndex};

/// Serve an in-memory entity graph over HTTP.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Directory with the base datasets and edit log sidecars.
    data_path: PathBuf,
    /// HTTP port.
    #[arg(default_value_t = entity_graph::config::DEFAULT_PORT)]
    port: u16,
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "entity_graph=info,entity_graph_server=info,tower_http=info".into());

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_span_events(FmtSpan::CLOSE))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .flatten_event(true),
                )
                .init();
        }
    }
}

/// Log panics with a captured backtrace before the default hook runs.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let backtrace = Backtrace::force_capture();
        error!(panic = %panic, backtrace = %backtrace, "Fatal panic");
        default_hook(panic);
    }));
}

/// Request logging middleware that adds correlation ID and timing
async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let trace_id = request
        .headers()
        .get("X-Request-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let span = info_span!(
        "request",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let response = next.run(request).instrument(span.clone()).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    span.record("status", status);
    span.record("latency_ms", latency.as_millis() as u64);

    info!(
        target: "entity_graph_server::access",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request completed"
    );

    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            eprintln!("Usage: entity_graph_server <DATA_PATH> [PORT]");
            eprintln!("{e}");
            return ExitCode::from(1);
        }
        // --help / --version
        Err(e) => e.exit(),
    };

    let mut config = ServerConfig::new(cli.data_path).with_env();
    config.port = cli.port;

    init_tracing(config.log_format);
    install_panic_hook();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Entity graph server failed");
            ExitCode::from(1)
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        version = entity_graph::VERSION,
        data_path = %config.data_path.display(),
        "Starting entity graph server"
    );

    // Startup is synchronous: nothing is served until the graph is complete
    let (graph, report) = load_dataset(&config.data_path, &config.layout)?;
    info!(
        vertex_files = report.vertex_files,
        vertices = report.vertices,
        relationships = report.relationships,
        elapsed_ms = report.elapsed_ms,
        "Graph loaded"
    );

    let suggestions = SuggestionIndex::build(&graph);
    let state = ServiceState::new(graph, EditLog::open(&config.data_path), &suggestions)?
        .with_config(&config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = config.bind_addr().parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        public_dir = %config.public_dir.display(),
        "Entity graph server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Entity graph server shutdown complete");
    Ok(())
}
