//! Cluster inventory error types

use thiserror::Error;

/// Errors raised while listing cluster nodes.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success API response
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        message: String,
    },

    /// In-cluster configuration could not be resolved
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error reading service-account credentials
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cluster operations
pub type ClusterResult<T> = Result<T, ClusterError>;
