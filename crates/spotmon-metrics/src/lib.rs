//! # spotmon-metrics - Price series and Prometheus exposition
//!
//! The produced surface is two gauge series and one error counter:
//!
//! - `aws_spot_price_dollars_per_hour{instance_type, availability_zone}`
//! - `aws_on_demand_dollars_per_hour{instance_type, availability_zone}`
//! - `aws_spot_price_request_errors{code}`
//!
//! Series values are monotonically overwritten per label pair; pairs that
//! stop appearing keep their last value rather than expiring. The registry
//! is safe for concurrent scraping while the reconciliation loop writes.

pub mod exporter;
pub mod projector;
pub mod registry;

pub use exporter::{export_metrics, metrics_router, MetricsState};
pub use projector::{observed_dimensions, project_ondemand, project_spot};
pub use registry::{SpotMetrics, CLUSTER_FAILURE_CODE, ONDEMAND_FAILURE_CODE};
