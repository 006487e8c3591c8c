//! Spot price provider seam and failure classification

use std::collections::BTreeSet;

use async_trait::async_trait;
use spotmon_core::{AvailabilityZone, InstanceType, ProductDescription, SpotPriceSample};
use thiserror::Error;

/// Provider code signaling request-quota exhaustion. The only failure that
/// escalates backoff.
pub const RATE_LIMIT_CODE: &str = "RequestLimitExceeded";

/// Errors raised by a spot price query.
///
/// Every variant exposes a machine-readable code via [`ProviderError::code`]
/// so failures can be counted per cause; API errors carry the provider's own
/// code, the rest use synthetic ones.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with an error response
    #[error("provider error {code}: {message}")]
    Api {
        /// Machine-readable provider error code
        code: String,
        /// Human-readable message from the provider
        message: String,
    },

    /// The request never completed (connect failure, timeout)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response could not be decoded
    #[error("malformed provider response: {0}")]
    Decode(String),

    /// No usable credentials for signing the request
    #[error("credentials error: {0}")]
    Credentials(String),
}

impl ProviderError {
    /// The code this failure is counted under.
    pub fn code(&self) -> &str {
        match self {
            ProviderError::Api { code, .. } => code,
            ProviderError::Transport(_) => "transport_error",
            ProviderError::Decode(_) => "decode_error",
            ProviderError::Credentials(_) => "credentials_error",
        }
    }

    /// Whether the provider signaled request-quota exhaustion.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::Api { code, .. } if code == RATE_LIMIT_CODE)
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Source of currently advertised spot prices.
#[async_trait]
pub trait SpotPriceProvider: Send + Sync {
    /// Query spot prices matching all three filters, starting from now.
    async fn describe_spot_prices(
        &self,
        instance_types: &BTreeSet<InstanceType>,
        zones: &BTreeSet<AvailabilityZone>,
        products: &[ProductDescription],
    ) -> ProviderResult<Vec<SpotPriceSample>>;
}
