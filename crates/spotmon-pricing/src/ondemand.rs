//! Daily-refreshed on-demand price cache
//!
//! The freshness timestamp advances when a refresh is *attempted*, not when
//! it succeeds. A refresh whose bounded retries all fail therefore spends
//! that day's window, and the feed is left alone until a full interval has
//! elapsed again. This keeps a systemic feed outage from being hammered
//! once per cycle; operators depend on the reduced retry pressure, so the
//! ordering is deliberate and must not be "fixed" to update-on-success.

use std::time::Duration;

use chrono::{DateTime, Utc};
use spotmon_core::OndemandPriceTable;
use tracing::info;

use crate::feed::{FeedResult, PricingFeed};
use crate::retry::with_retries;

/// Minimum time between refresh attempts.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(86_400);

const DEFAULT_RETRY_ATTEMPTS: usize = 5;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Cache of the full region x instance-type on-demand price table.
pub struct OndemandPriceCache<F> {
    feed: F,
    table: OndemandPriceTable,
    last_attempt: Option<DateTime<Utc>>,
    retry_attempts: usize,
    retry_delay: Duration,
}

impl<F: PricingFeed> OndemandPriceCache<F> {
    pub fn new(feed: F) -> Self {
        Self::with_retry(feed, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }

    pub fn with_retry(feed: F, retry_attempts: usize, retry_delay: Duration) -> Self {
        Self {
            feed,
            table: OndemandPriceTable::new(),
            last_attempt: None,
            retry_attempts,
            retry_delay,
        }
    }

    /// Whether the refresh window has elapsed. True before the first
    /// attempt ever.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.last_attempt {
            None => true,
            Some(last) => {
                (now - last).to_std().unwrap_or(Duration::ZERO) >= REFRESH_INTERVAL
            }
        }
    }

    /// Attempt a refresh, replacing the table wholesale on success.
    ///
    /// Spends the refresh window up front: the freshness timestamp is set
    /// to `now` before the feed is contacted.
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> FeedResult<&OndemandPriceTable> {
        self.last_attempt = Some(now);

        let feed = &self.feed;
        let table = with_retries(self.retry_attempts, self.retry_delay, || feed.fetch()).await?;

        info!(
            regions = table.region_count(),
            entries = table.entry_count(),
            "Refreshed ondemand price table"
        );
        self.table = table;
        Ok(&self.table)
    }

    /// The most recently published table; empty until the first successful
    /// refresh.
    pub fn table(&self) -> &OndemandPriceTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use spotmon_core::{InstanceType, Region};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StaticFeed(OndemandPriceTable);

    #[async_trait]
    impl PricingFeed for StaticFeed {
        async fn fetch(&self) -> FeedResult<OndemandPriceTable> {
            Ok(self.0.clone())
        }
    }

    struct FailingFeed(Arc<AtomicUsize>);

    #[async_trait]
    impl PricingFeed for FailingFeed {
        async fn fetch(&self) -> FeedResult<OndemandPriceTable> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(FeedError::Status(503))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    }

    fn sample_table() -> OndemandPriceTable {
        let mut table = OndemandPriceTable::new();
        table.insert(
            Region::new("us-east-1"),
            InstanceType::new("m5.large"),
            0.096,
        );
        table
    }

    #[test]
    fn test_first_refresh_is_due_immediately() {
        let cache = OndemandPriceCache::new(StaticFeed(sample_table()));
        assert!(cache.needs_refresh(t0()));
    }

    #[tokio::test]
    async fn test_refresh_gating_window() {
        let mut cache = OndemandPriceCache::new(StaticFeed(sample_table()));
        cache.refresh(t0()).await.unwrap();

        assert!(!cache.needs_refresh(t0() + chrono::Duration::seconds(86_399)));
        assert!(cache.needs_refresh(t0() + chrono::Duration::seconds(86_400)));
    }

    #[tokio::test]
    async fn test_failed_refresh_spends_the_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cache =
            OndemandPriceCache::with_retry(FailingFeed(calls.clone()), 3, Duration::ZERO);

        let result = cache.refresh(t0()).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.table().is_empty());

        // No data was obtained, but the next attempt still waits a full day.
        assert!(!cache.needs_refresh(t0() + chrono::Duration::seconds(86_399)));
        assert!(cache.needs_refresh(t0() + chrono::Duration::seconds(86_400)));
    }

    #[tokio::test]
    async fn test_successful_refresh_replaces_table() {
        let mut cache = OndemandPriceCache::new(StaticFeed(sample_table()));
        assert!(cache.table().is_empty());

        cache.refresh(t0()).await.unwrap();
        assert_eq!(
            cache
                .table()
                .price(&Region::new("us-east-1"), &InstanceType::new("m5.large")),
            Some(0.096)
        );
    }
}
