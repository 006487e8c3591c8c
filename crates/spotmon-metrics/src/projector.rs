//! Projection of fetched prices onto labeled series
//!
//! Values are overwritten per (instance type, zone) label pair. Pairs from
//! a prior cycle that no longer appear in the input are left untouched --
//! there is no metric expiry, by design.

use std::collections::BTreeSet;

use spotmon_core::{AvailabilityZone, InstanceType, OndemandPriceTable, SpotPriceSample};
use tracing::debug;

use crate::registry::SpotMetrics;

/// Set the spot gauge for each sample's label pair.
pub fn project_spot(metrics: &SpotMetrics, samples: &[SpotPriceSample]) {
    for sample in samples {
        metrics
            .spot_price
            .with_label_values(&[
                sample.instance_type.as_str(),
                sample.availability_zone.as_str(),
            ])
            .set(sample.price);
    }
}

/// The instance types and zones actually observed in a spot price response.
///
/// On-demand projection is scoped to these, not to the full cluster
/// inventory.
pub fn observed_dimensions(
    samples: &[SpotPriceSample],
) -> (BTreeSet<InstanceType>, BTreeSet<AvailabilityZone>) {
    let types = samples.iter().map(|s| s.instance_type.clone()).collect();
    let zones = samples
        .iter()
        .map(|s| s.availability_zone.clone())
        .collect();
    (types, zones)
}

/// Set the on-demand gauge for each (instance type, zone) pair found in the
/// table under the zone's derived region. Pairs absent from the table are
/// skipped without error. Returns the number of series written.
pub fn project_ondemand(
    metrics: &SpotMetrics,
    table: &OndemandPriceTable,
    instance_types: &BTreeSet<InstanceType>,
    zones: &BTreeSet<AvailabilityZone>,
) -> usize {
    let mut written = 0;

    for zone in zones {
        let region = zone.region();
        for instance_type in instance_types {
            let Some(price) = table.price(&region, instance_type) else {
                continue;
            };
            metrics
                .ondemand_price
                .with_label_values(&[instance_type.as_str(), zone.as_str()])
                .set(price);
            written += 1;
        }
    }

    debug!(written, "Projected ondemand prices");
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prometheus::proto::MetricFamily;
    use prometheus::Registry;
    use spotmon_core::{ProductDescription, Region};

    fn sample(instance_type: &str, zone: &str, price: f64) -> SpotPriceSample {
        SpotPriceSample {
            instance_type: InstanceType::new(instance_type),
            availability_zone: AvailabilityZone::new(zone),
            price,
            product: ProductDescription::LinuxUnix,
            timestamp: Utc::now(),
        }
    }

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> Option<&'a MetricFamily> {
        families.iter().find(|f| f.get_name() == name)
    }

    #[test]
    fn test_spot_projection_only_creates_observed_pairs() {
        // Cluster has zones {us-east-1a, us-east-1b}; the provider answered
        // for us-east-1a only. No series may be fabricated for 1b.
        let registry = Registry::new();
        let metrics = SpotMetrics::new(&registry);

        project_spot(&metrics, &[sample("m5.large", "us-east-1a", 0.0421)]);

        let families = registry.gather();
        let spot = family(&families, "aws_spot_price_dollars_per_hour").unwrap();
        assert_eq!(spot.get_metric().len(), 1);

        let metric = &spot.get_metric()[0];
        assert_eq!(metric.get_gauge().get_value(), 0.0421);
        let labels: Vec<_> = metric
            .get_label()
            .iter()
            .map(|l| (l.get_name(), l.get_value()))
            .collect();
        assert!(labels.contains(&("instance_type", "m5.large")));
        assert!(labels.contains(&("availability_zone", "us-east-1a")));
    }

    #[test]
    fn test_spot_values_are_not_expired() {
        let registry = Registry::new();
        let metrics = SpotMetrics::new(&registry);

        project_spot(&metrics, &[sample("m5.large", "us-east-1a", 0.0421)]);
        // Next cycle observes nothing for the pair; the value must remain.
        project_spot(&metrics, &[]);

        let value = metrics
            .spot_price
            .with_label_values(&["m5.large", "us-east-1a"])
            .get();
        assert_eq!(value, 0.0421);
    }

    #[test]
    fn test_spot_values_are_overwritten() {
        let registry = Registry::new();
        let metrics = SpotMetrics::new(&registry);

        project_spot(&metrics, &[sample("m5.large", "us-east-1a", 0.0421)]);
        project_spot(&metrics, &[sample("m5.large", "us-east-1a", 0.0533)]);

        let families = registry.gather();
        let spot = family(&families, "aws_spot_price_dollars_per_hour").unwrap();
        assert_eq!(spot.get_metric().len(), 1);
        assert_eq!(spot.get_metric()[0].get_gauge().get_value(), 0.0533);
    }

    #[test]
    fn test_observed_dimensions() {
        let samples = [
            sample("m5.large", "us-east-1a", 0.04),
            sample("m5.large", "us-east-1b", 0.05),
            sample("c5.xlarge", "us-east-1a", 0.08),
        ];
        let (types, zones) = observed_dimensions(&samples);
        assert_eq!(types.len(), 2);
        assert_eq!(zones.len(), 2);
    }

    #[test]
    fn test_ondemand_projection_skips_absent_pairs() {
        let registry = Registry::new();
        let metrics = SpotMetrics::new(&registry);

        let mut table = OndemandPriceTable::new();
        table.insert(
            Region::new("us-east-1"),
            InstanceType::new("m5.large"),
            0.096,
        );

        let types = BTreeSet::from([InstanceType::new("m5.large"), InstanceType::new("c5.2xlarge")]);
        let zones = BTreeSet::from([
            AvailabilityZone::new("us-east-1a"),
            AvailabilityZone::new("eu-west-1a"),
        ]);

        // m5.large x us-east-1a resolves; the other three pairs are absent
        // from the table and skipped without error.
        let written = project_ondemand(&metrics, &table, &types, &zones);
        assert_eq!(written, 1);

        let value = metrics
            .ondemand_price
            .with_label_values(&["m5.large", "us-east-1a"])
            .get();
        assert_eq!(value, 0.096);
    }

    #[test]
    fn test_ondemand_projection_uses_derived_region() {
        let registry = Registry::new();
        let metrics = SpotMetrics::new(&registry);

        let mut table = OndemandPriceTable::new();
        table.insert(
            Region::new("eu-central-1"),
            InstanceType::new("r5.large"),
            0.152,
        );

        let types = BTreeSet::from([InstanceType::new("r5.large")]);
        let zones = BTreeSet::from([AvailabilityZone::new("eu-central-1b")]);

        assert_eq!(project_ondemand(&metrics, &table, &types, &zones), 1);
        // The series label keeps the zone; only the lookup uses the region.
        let value = metrics
            .ondemand_price
            .with_label_values(&["r5.large", "eu-central-1b"])
            .get();
        assert_eq!(value, 0.152);
    }
}
