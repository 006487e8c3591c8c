//! Reconciliation loop
//!
//! One sequential loop owns all mutable state: the rate-limit backoff and
//! the sample list retained from the last successful fetch. Per cycle it
//! re-derives the cluster inventory, fetches spot prices, projects them,
//! and refreshes the on-demand table when its daily window has elapsed.
//! Cycle failures are classified, counted, and logged; nothing short of
//! process termination stops the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use spotmon_cluster::{ClusterInventory, NodeLister};
use spotmon_core::{Backoff, LabelMatcher, ProductDescription, SpotPriceSample};
use spotmon_metrics::{
    observed_dimensions, project_ondemand, project_spot, SpotMetrics, CLUSTER_FAILURE_CODE,
    ONDEMAND_FAILURE_CODE,
};
use spotmon_pricing::{OndemandPriceCache, PricingFeed, SpotPriceProvider};
use tracing::{error, info, warn};

/// Engine parameters fixed at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub scrape_interval: Duration,
    pub matcher: LabelMatcher,
    pub products: Vec<ProductDescription>,
    pub on_demand: bool,
}

/// The reconciliation engine and its explicit state.
pub struct ReconcileEngine<L, P, F> {
    config: EngineConfig,
    inventory: ClusterInventory<L>,
    provider: P,
    cache: OndemandPriceCache<F>,
    metrics: Arc<SpotMetrics>,
    backoff: Backoff,
    /// Samples from the last successful fetch; re-projected when the
    /// current cycle's fetch fails.
    last_samples: Vec<SpotPriceSample>,
}

impl<L, P, F> ReconcileEngine<L, P, F>
where
    L: NodeLister,
    P: SpotPriceProvider,
    F: PricingFeed,
{
    pub fn new(
        config: EngineConfig,
        inventory: ClusterInventory<L>,
        provider: P,
        cache: OndemandPriceCache<F>,
        metrics: Arc<SpotMetrics>,
    ) -> Self {
        Self {
            config,
            inventory,
            provider,
            cache,
            metrics,
            backoff: Backoff::new(),
            last_samples: Vec::new(),
        }
    }

    /// Current backoff multiplier, always >= 1.
    pub fn backoff_multiplier(&self) -> u32 {
        self.backoff.multiplier()
    }

    /// Run cycles forever, sleeping `scrape_interval x backoff` between
    /// them.
    pub async fn run(&mut self) {
        info!(
            interval_secs = self.config.scrape_interval.as_secs(),
            on_demand = self.config.on_demand,
            "Starting reconciliation loop"
        );
        loop {
            self.run_cycle(Utc::now()).await;
            let sleep = self.config.scrape_interval * self.backoff.multiplier();
            tokio::time::sleep(sleep).await;
        }
    }

    /// One reconciliation pass at the given instant.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) {
        let zones = match self.inventory.zones().await {
            Ok(zones) => zones,
            Err(e) => {
                error!(error = %e, "Failed to enumerate cluster zones");
                self.metrics.record_request_error(CLUSTER_FAILURE_CODE);
                return;
            }
        };

        match self.inventory.instance_types(&self.config.matcher).await {
            Ok(instance_types) => {
                match self
                    .provider
                    .describe_spot_prices(&instance_types, &zones, &self.config.products)
                    .await
                {
                    Ok(samples) => {
                        info!(
                            samples = samples.len(),
                            instance_types = instance_types.len(),
                            zones = zones.len(),
                            "Fetched spot prices"
                        );
                        self.last_samples = samples;
                        self.backoff.reset();
                    }
                    Err(e) => {
                        self.metrics.record_request_error(e.code());
                        if e.is_rate_limited() {
                            self.backoff.escalate();
                            warn!(
                                error = %e,
                                backoff = self.backoff.multiplier(),
                                "Spot price request was rate limited, backing off"
                            );
                        } else {
                            error!(error = %e, code = e.code(), "Spot price request failed");
                        }
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to enumerate spot instance types");
                self.metrics.record_request_error(CLUSTER_FAILURE_CODE);
                return;
            }
        }

        // The retained list when this cycle's fetch failed.
        project_spot(&self.metrics, &self.last_samples);

        if self.config.on_demand && self.cache.needs_refresh(now) {
            let (types, zones) = observed_dimensions(&self.last_samples);
            match self.cache.refresh(now).await {
                Ok(_) => {
                    let written =
                        project_ondemand(&self.metrics, self.cache.table(), &types, &zones);
                    info!(series = written, "Projected ondemand prices");
                }
                Err(e) => {
                    error!(error = %e, "Ondemand refresh failed, next attempt in a day");
                    self.metrics.record_request_error(ONDEMAND_FAILURE_CODE);
                }
            }
        }
    }
}
