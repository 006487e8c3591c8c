//! Daemon error types

use thiserror::Error;

/// Startup errors. Once the reconciliation loop runs, per-cycle failures
/// are counted and logged instead of surfacing here.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid matcher or product specification
    #[error(transparent)]
    Core(#[from] spotmon_core::CoreError),

    /// Cluster client could not be constructed
    #[error("Cluster error: {0}")]
    Cluster(#[from] spotmon_cluster::ClusterError),

    /// Spot price provider could not be constructed
    #[error("Provider error: {0}")]
    Provider(#[from] spotmon_pricing::ProviderError),

    /// Pricing feed client could not be constructed
    #[error("Feed error: {0}")]
    Feed(#[from] spotmon_pricing::FeedError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
