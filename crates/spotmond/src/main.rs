//! spotmond - Spot price monitoring daemon
//!
//! Classifies cluster nodes by label, fetches the AWS spot prices for the
//! instance types and zones in use, and exposes them as Prometheus gauges
//! alongside an optional daily-refreshed on-demand price series.

use std::sync::Arc;

use clap::Parser;
use prometheus::Registry;
use spotmon_cluster::{ClusterInventory, KubeNodeLister};
use spotmon_metrics::{metrics_router, SpotMetrics};
use spotmon_pricing::{Ec2SpotPriceClient, HttpPricingFeed, OndemandPriceCache};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod engine;
mod error;

use config::Cli;
use engine::{EngineConfig, ReconcileEngine};
use error::DaemonResult;

/// Per-attempt bound on a feed download; the cache retries around it.
const FEED_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = cli.into_config()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        region = %config.region,
        listen = %config.listen_addr,
        matcher = ?config.matcher,
        on_demand = config.on_demand,
        "Starting spotmond"
    );

    let lister = if config.running_in_cluster {
        KubeNodeLister::in_cluster()?
    } else {
        let token = match &config.kube_token_file {
            Some(path) => Some(std::fs::read_to_string(path)?.trim().to_string()),
            None => None,
        };
        KubeNodeLister::new(&config.kube_api_url, token)?
    };
    let inventory = ClusterInventory::new(lister);

    let provider = Ec2SpotPriceClient::from_env(&config.region).await?;

    let feed = HttpPricingFeed::new(&config.pricing_url, FEED_TIMEOUT)?;
    let cache = OndemandPriceCache::new(feed);

    let registry = Arc::new(Registry::new());
    let metrics = Arc::new(SpotMetrics::new(&registry));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    let router = metrics_router(registry.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Metrics server terminated");
        }
    });
    info!(addr = %config.listen_addr, "Serving metrics");

    let engine_config = EngineConfig {
        scrape_interval: config.scrape_interval,
        matcher: config.matcher.clone(),
        products: config.products.clone(),
        on_demand: config.on_demand,
    };
    let mut engine = ReconcileEngine::new(engine_config, inventory, provider, cache, metrics);
    engine.run().await;

    Ok(())
}
