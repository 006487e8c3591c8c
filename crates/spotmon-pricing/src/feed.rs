//! Bulk on-demand pricing feed
//!
//! A single HTTP GET returning a JSON list of instance entries shaped as
//! `{instance_type, pricing: {region: {linux: {ondemand: price}}}}`. The
//! document is navigated leniently: entries without a Linux on-demand price
//! are skipped, not errored, and prices arrive as either JSON strings or
//! numbers depending on the feed revision.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use spotmon_core::{InstanceType, OndemandPriceTable, Region};
use thiserror::Error;
use tracing::debug;

/// Default feed location.
pub const DEFAULT_PRICING_URL: &str =
    "https://raw.githubusercontent.com/powdahound/ec2instances.info/master/www/instances.json";

/// Errors raised while retrieving or decoding the pricing feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("feed returned status {0}")]
    Status(u16),

    /// The document is not the expected JSON shape
    #[error("feed decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// Source of the bulk on-demand price table.
#[async_trait]
pub trait PricingFeed: Send + Sync {
    /// Retrieve and decode the full table. One network attempt; retry
    /// policy belongs to the caller.
    async fn fetch(&self) -> FeedResult<OndemandPriceTable>;
}

/// HTTP implementation of the pricing feed.
pub struct HttpPricingFeed {
    client: Client,
    url: String,
}

impl HttpPricingFeed {
    /// `timeout` bounds each individual retrieval attempt.
    pub fn new(url: impl Into<String>, timeout: Duration) -> FeedResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PricingFeed for HttpPricingFeed {
    async fn fetch(&self) -> FeedResult<OndemandPriceTable> {
        debug!(url = %self.url, "Downloading ondemand price feed");

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        parse_feed(&bytes)
    }
}

/// Decode the feed document into the region x instance-type table.
pub fn parse_feed(bytes: &[u8]) -> FeedResult<OndemandPriceTable> {
    let entries: Vec<Value> = serde_json::from_slice(bytes)?;

    let mut table = OndemandPriceTable::new();
    for entry in &entries {
        let Some(instance_type) = entry.get("instance_type").and_then(Value::as_str) else {
            continue;
        };
        let Some(pricing) = entry.get("pricing").and_then(Value::as_object) else {
            continue;
        };

        for (region, region_pricing) in pricing {
            let Some(price) = region_pricing
                .get("linux")
                .and_then(|linux| linux.get("ondemand"))
                .and_then(price_value)
            else {
                continue;
            };
            table.insert(
                Region::new(region.as_str()),
                InstanceType::new(instance_type),
                price,
            );
        }
    }

    Ok(table)
}

/// Prices appear as numbers in older feed revisions and strings in newer
/// ones; accept both, skip anything else.
fn price_value(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
