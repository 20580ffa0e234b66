//! Server and dataset configuration.
//!
//! Command-line arguments carry the data path and port; everything else is
//! read from the environment with defaults:
//!
//! - `HOST`: bind address (default: 0.0.0.0)
//! - `PUBLIC_DIR`: static file root (default: public)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//! - `ALGORITHM_TIMEOUT_MS`: wall-clock budget per analytic query (default: 30000)
//! - `OVERLAY_EDGE_POLICY`: "dedupe" or "append" (default: dedupe)
//! - `EDGE_DELIMITER`: single-byte delimiter of the base edges file (default: ,)

use std::path::PathBuf;
use std::time::Duration;

use crate::loader::DatasetLayout;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default analytic query budget.
pub const DEFAULT_ALGORITHM_TIMEOUT: Duration = Duration::from_secs(30);

/// How edge overlay rows are replayed on startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayEdgePolicy {
    /// Skip overlay edges whose `(source, target, type)` already exists.
    #[default]
    Dedupe,
    /// Re-add every overlay row, duplicates included.
    Append,
}

impl OverlayEdgePolicy {
    /// Parse policy from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dedupe" | "dedup" => Some(Self::Dedupe),
            "append" => Some(Self::Append),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Flattened JSON events.
    #[default]
    Json,
    /// Human-readable output for local development.
    Pretty,
}

impl LogFormat {
    /// Parse format from string; anything but "pretty" is JSON.
    pub fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("pretty") {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Runtime configuration of the graph server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding the base datasets and the edit log sidecars.
    pub data_path: PathBuf,
    /// HTTP port.
    pub port: u16,
    /// Bind host.
    pub host: String,
    /// Root of the static file service.
    pub public_dir: PathBuf,
    /// Log output format.
    pub log_format: LogFormat,
    /// Wall-clock budget for a single analytic query.
    pub algorithm_timeout: Duration,
    /// Which files make up the base dataset.
    pub layout: DatasetLayout,
}

impl ServerConfig {
    /// Configuration with defaults for everything but the data path.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            port: DEFAULT_PORT,
            host: "0.0.0.0".to_string(),
            public_dir: PathBuf::from("public"),
            log_format: LogFormat::default(),
            algorithm_timeout: DEFAULT_ALGORITHM_TIMEOUT,
            layout: DatasetLayout::default(),
        }
    }

    /// Apply environment overrides.
    ///
    /// Unparsable values are reported and the default is kept.
    pub fn with_env(mut self) -> Self {
        if let Ok(host) = std::env::var("HOST") {
            if !host.is_empty() {
                self.host = host;
            }
        }

        if let Ok(dir) = std::env::var("PUBLIC_DIR") {
            self.public_dir = PathBuf::from(dir);
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.log_format = LogFormat::from_str(&format);
        }

        if let Ok(raw) = std::env::var("ALGORITHM_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) => self.algorithm_timeout = Duration::from_millis(ms),
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring invalid ALGORITHM_TIMEOUT_MS"),
            }
        }

        if let Ok(raw) = std::env::var("OVERLAY_EDGE_POLICY") {
            match OverlayEdgePolicy::from_str(&raw) {
                Some(policy) => self.layout.overlay_edge_policy = policy,
                None => tracing::warn!(value = %raw, "Ignoring invalid OVERLAY_EDGE_POLICY"),
            }
        }

        if let Ok(raw) = std::env::var("EDGE_DELIMITER") {
            match raw.as_bytes() {
                [b] => self.layout.edge_delimiter = *b,
                _ if raw == "\\t" => self.layout.edge_delimiter = b'\t',
                _ => tracing::warn!(value = %raw, "EDGE_DELIMITER must be a single byte"),
            }
        }

        self
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::new("/data");
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.public_dir, PathBuf::from("public"));
        assert_eq!(config.layout.overlay_edge_policy, OverlayEdgePolicy::Dedupe);
    }

    #[test]
    fn test_overlay_policy_parse() {
        assert_eq!(OverlayEdgePolicy::from_str("APPEND"), Some(OverlayEdgePolicy::Append));
        assert_eq!(OverlayEdgePolicy::from_str("dedupe"), Some(OverlayEdgePolicy::Dedupe));
        assert_eq!(OverlayEdgePolicy::from_str("sometimes"), None);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::from_str("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str(""), LogFormat::Json);
    }
}
