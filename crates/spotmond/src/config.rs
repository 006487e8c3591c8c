//! CLI surface and resolved configuration
//!
//! Everything that can go wrong here is fatal at startup: a malformed
//! matcher specification, a product outside the allowed set, or an
//! unparseable listen address. The loop never sees configuration errors.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use spotmon_core::{LabelMatcher, ProductDescription};
use spotmon_pricing::DEFAULT_PRICING_URL;

use crate::error::{DaemonError, DaemonResult};

/// spotmon daemon CLI
#[derive(Debug, Parser)]
#[command(name = "spotmond")]
#[command(about = "Monitors Kubernetes for spot instances and exposes current spot prices as Prometheus metrics", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Load apiserver location and credentials from the pod environment
    #[arg(long, env = "SPOTMON_RUNNING_IN_CLUSTER")]
    pub running_in_cluster: bool,

    /// Kubernetes apiserver URL when running outside the cluster
    /// (defaults to a local `kubectl proxy`)
    #[arg(
        long,
        env = "SPOTMON_KUBE_API_URL",
        default_value = "http://127.0.0.1:8001"
    )]
    pub kube_api_url: String,

    /// Bearer token file for the apiserver, if required
    #[arg(long, env = "SPOTMON_KUBE_TOKEN_FILE")]
    pub kube_token_file: Option<PathBuf>,

    /// Label identifying spot nodes: `key` or `key=value`
    #[arg(
        short = 'l',
        long,
        env = "SPOTMON_SPOT_LABEL",
        default_value = "node-role.kubernetes.io/spot-worker"
    )]
    pub spot_label: String,

    /// How often (in seconds) prices are scraped from AWS
    #[arg(short = 'i', long, env = "SPOTMON_SCRAPE_INTERVAL", default_value_t = 60)]
    pub scrape_interval: u64,

    /// Address to expose Prometheus metrics on
    #[arg(short = 'm', long, env = "SPOTMON_LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: String,

    /// The region the cluster is running in
    #[arg(short = 'r', long, env = "SPOTMON_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Also publish daily-refreshed on-demand prices
    #[arg(long, env = "SPOTMON_ON_DEMAND")]
    pub on_demand: bool,

    /// Product descriptions to filter spot prices by,
    /// e.g. -p "Linux/UNIX" "Linux/UNIX (Amazon VPC)"
    #[arg(short = 'p', long = "products", num_args = 1.., default_value = "Linux/UNIX")]
    pub products: Vec<String>,

    /// On-demand pricing feed URL
    #[arg(long, env = "SPOTMON_PRICING_URL", default_value = DEFAULT_PRICING_URL)]
    pub pricing_url: String,

    /// Log level
    #[arg(long, env = "SPOTMON_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "SPOTMON_LOG_JSON")]
    pub json: bool,
}

/// Validated daemon configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub listen_addr: SocketAddr,
    pub scrape_interval: Duration,
    pub matcher: LabelMatcher,
    pub products: Vec<ProductDescription>,
    pub region: String,
    pub on_demand: bool,
    pub pricing_url: String,
    pub running_in_cluster: bool,
    pub kube_api_url: String,
    pub kube_token_file: Option<PathBuf>,
}

impl Cli {
    /// Validate and resolve the raw arguments.
    pub fn into_config(self) -> DaemonResult<MonitorConfig> {
        let listen_addr = self
            .listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {e}")))?;

        let matcher: LabelMatcher = self.spot_label.parse()?;

        let products = self
            .products
            .iter()
            .map(|p| p.parse())
            .collect::<Result<Vec<ProductDescription>, _>>()?;

        Ok(MonitorConfig {
            listen_addr,
            scrape_interval: Duration::from_secs(self.scrape_interval),
            matcher,
            products,
            region: self.region,
            on_demand: self.on_demand,
            pricing_url: self.pricing_url,
            running_in_cluster: self.running_in_cluster,
            kube_api_url: self.kube_api_url,
            kube_token_file: self.kube_token_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("spotmond").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let config = cli(&[]).into_config().unwrap();
        assert_eq!(config.scrape_interval, Duration::from_secs(60));
        assert_eq!(config.listen_addr.port(), 8000);
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.products, vec![ProductDescription::LinuxUnix]);
        assert!(!config.on_demand);
        assert_eq!(
            config.matcher,
            LabelMatcher::Presence {
                key: "node-role.kubernetes.io/spot-worker".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_product_is_fatal() {
        let result = cli(&["-p", "FreeBSD"]).into_config();
        assert!(matches!(
            result,
            Err(DaemonError::Core(spotmon_core::CoreError::InvalidProduct { .. }))
        ));
    }

    #[test]
    fn test_invalid_matcher_is_fatal() {
        let result = cli(&["-l", "a=b=c"]).into_config();
        assert!(matches!(
            result,
            Err(DaemonError::Core(spotmon_core::CoreError::InvalidMatcher { .. }))
        ));
    }

    #[test]
    fn test_multiple_products() {
        let config = cli(&["-p", "Linux/UNIX", "Linux/UNIX (Amazon VPC)"])
            .into_config()
            .unwrap();
        assert_eq!(
            config.products,
            vec![
                ProductDescription::LinuxUnix,
                ProductDescription::LinuxUnixVpc
            ]
        );
    }

    #[test]
    fn test_value_matcher_accepted() {
        let config = cli(&["-l", "kubernetes.io/role=spot-worker"])
            .into_config()
            .unwrap();
        assert_eq!(
            config.matcher,
            LabelMatcher::Value {
                key: "kubernetes.io/role".to_string(),
                value: "spot-worker".to_string()
            }
        );
    }
}
