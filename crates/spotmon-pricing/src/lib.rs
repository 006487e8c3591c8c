//! # spotmon-pricing - Spot and on-demand price retrieval
//!
//! Two price sources feed the reconciliation engine:
//!
//! - [`SpotPriceProvider`]: currently advertised spot prices for the
//!   cluster's instance types and zones, filtered by product. The
//!   production implementation is [`Ec2SpotPriceClient`], a SigV4-signed
//!   EC2 Query API client. Provider failures carry a machine-readable
//!   error code so the engine can distinguish request-quota exhaustion
//!   from everything else.
//! - [`PricingFeed`] / [`OndemandPriceCache`]: a bulk on-demand price
//!   table, refreshed at most once per day with bounded retry. A failed
//!   refresh spends that day's window; see [`OndemandPriceCache`].

pub mod ec2;
pub mod feed;
pub mod ondemand;
pub mod retry;
pub mod spot;

pub use ec2::Ec2SpotPriceClient;
pub use feed::{FeedError, FeedResult, HttpPricingFeed, PricingFeed, DEFAULT_PRICING_URL};
pub use ondemand::{OndemandPriceCache, REFRESH_INTERVAL};
pub use retry::with_retries;
pub use spot::{ProviderError, ProviderResult, SpotPriceProvider, RATE_LIMIT_CODE};
