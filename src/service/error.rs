//! Per-request errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::algorithms::AlgorithmError;
use crate::edit_log::EditLogError;

/// Error type for request handlers.
///
/// Every variant is recovered at the handler boundary and turned into a
/// plain-text response; none of them stops the server.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Malformed body or missing field. The body is the parser diagnostic.
    #[error("{0}")]
    Validation(String),
    /// A static file could not be opened.
    #[error("Could not open file {0}")]
    StaticFile(String),
    /// Capability dispatch failed.
    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),
    /// The edit log append failed; the graph was left untouched.
    #[error(transparent)]
    EditLog(#[from] EditLogError),
    /// Anything else, e.g. a worker task that panicked.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RequestError {
    /// Status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::StaticFile(_) => StatusCode::BAD_REQUEST,
            Self::Algorithm(e) => match e {
                AlgorithmError::UnknownCapability(_) => StatusCode::NOT_FOUND,
                AlgorithmError::MissingParameter(_) | AlgorithmError::InvalidParameter { .. } => {
                    StatusCode::BAD_REQUEST
                }
                AlgorithmError::DeadlineExceeded => StatusCode::SERVICE_UNAVAILABLE,
                AlgorithmError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::EditLog(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %body, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %body, "Request error");
        }

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RequestError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(RequestError::StaticFile("public/x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RequestError::from(AlgorithmError::UnknownCapability("pagerank".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RequestError::from(AlgorithmError::MissingParameter("entity".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RequestError::from(AlgorithmError::DeadlineExceeded).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(RequestError::Internal("boom".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_static_file_message() {
        let err = RequestError::StaticFile("public/missing.html".into());
        assert_eq!(err.to_string(), "Could not open file public/missing.html");
    }
}
