use std::path::PathBuf;

use tower::BoxError;

/// Errors produced by the admission middleware.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PaceError {
    /// The request's admission wait plus its execution exceeded the
    /// configured timeout.
    ///
    /// When the `axum` feature is enabled, this converts to `408 Request Timeout`.
    #[error("Request timed out waiting for admission")]
    Timeout,

    /// An unexpected error occurred in the inner service.
    ///
    /// The string contains the `Display` representation of the inner error.
    /// When the `axum` feature is enabled, this converts to `500 Internal Server Error`.
    #[error("Internal service error: {0}")]
    Inner(String),
}

impl PaceError {
    /// Map an error coming out of a service stack into the admission domain.
    pub fn from_boxed(err: BoxError) -> Self {
        if let Some(pace_err) = err.downcast_ref::<PaceError>() {
            pace_err.clone()
        } else if err.is::<tower::timeout::error::Elapsed>() {
            PaceError::Timeout
        } else {
            PaceError::Inner(err.to_string())
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for PaceError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match self {
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Inner(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Errors loading a [`crate::ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid limiter configuration")]
    Invalid(#[from] pace_limit::ConfigError),
}
