//! Metric definitions and registration

use prometheus::{GaugeVec, IntCounterVec, Opts, Registry};

/// Synthetic error code for an on-demand refresh that exhausted its
/// retries.
pub const ONDEMAND_FAILURE_CODE: &str = "ondemand_failure";

/// Synthetic error code for a failed cluster node enumeration.
pub const CLUSTER_FAILURE_CODE: &str = "cluster_failure";

/// All spotmon metrics combined.
pub struct SpotMetrics {
    /// Current spot price per (instance type, availability zone)
    pub spot_price: GaugeVec,

    /// Current on-demand price per (instance type, availability zone)
    pub ondemand_price: GaugeVec,

    /// Request errors keyed by provider error code
    pub request_errors: IntCounterVec,
}

impl SpotMetrics {
    /// Create all metrics and register them.
    pub fn new(registry: &Registry) -> Self {
        let spot_price = GaugeVec::new(
            Opts::new(
                "aws_spot_price_dollars_per_hour",
                "Reports the AWS spot price of node types used in the cluster",
            ),
            &["instance_type", "availability_zone"],
        )
        .expect("Failed to create aws_spot_price_dollars_per_hour metric");
        registry
            .register(Box::new(spot_price.clone()))
            .expect("Failed to register aws_spot_price_dollars_per_hour");

        let ondemand_price = GaugeVec::new(
            Opts::new(
                "aws_on_demand_dollars_per_hour",
                "Reports the AWS ondemand price of node types used in the cluster",
            ),
            &["instance_type", "availability_zone"],
        )
        .expect("Failed to create aws_on_demand_dollars_per_hour metric");
        registry
            .register(Box::new(ondemand_price.clone()))
            .expect("Failed to register aws_on_demand_dollars_per_hour");

        let request_errors = IntCounterVec::new(
            Opts::new(
                "aws_spot_price_request_errors",
                "Reports errors while calling the AWS api.",
            ),
            &["code"],
        )
        .expect("Failed to create aws_spot_price_request_errors metric");
        registry
            .register(Box::new(request_errors.clone()))
            .expect("Failed to register aws_spot_price_request_errors");

        Self {
            spot_price,
            ondemand_price,
            request_errors,
        }
    }

    /// Count one failure under the given error code.
    pub fn record_request_error(&self, code: &str) {
        self.request_errors.with_label_values(&[code]).inc();
    }
}
