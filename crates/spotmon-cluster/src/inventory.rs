//! Instance type and availability zone derivation from node labels
//!
//! Zone and instance-type keys exist in two label generations; nodes are
//! checked against the GA key first and the legacy beta key second, so mixed
//! clusters mid-upgrade report correctly.

use std::collections::BTreeSet;

use spotmon_core::{AvailabilityZone, InstanceType, LabelMatcher, NodeLabels};

use crate::error::ClusterResult;
use crate::node::NodeLister;

/// Zone label keys, newest generation first.
const ZONE_LABEL_KEYS: [&str; 2] = [
    "topology.kubernetes.io/zone",
    "failure-domain.beta.kubernetes.io/zone",
];

/// Instance-type label keys, newest generation first.
const INSTANCE_TYPE_LABEL_KEYS: [&str; 2] = [
    "node.kubernetes.io/instance-type",
    "beta.kubernetes.io/instance-type",
];

fn first_label<'a>(labels: &'a NodeLabels, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| labels.get(*k).map(String::as_str))
}

/// Derives the inventory the pricing queries need from live node state.
pub struct ClusterInventory<L> {
    lister: L,
}

impl<L: NodeLister> ClusterInventory<L> {
    pub fn new(lister: L) -> Self {
        Self { lister }
    }

    /// The set of all zone label values across all nodes, regardless of
    /// spot classification. Nodes without a zone label are skipped.
    pub async fn zones(&self) -> ClusterResult<BTreeSet<AvailabilityZone>> {
        let nodes = self.lister.list_node_labels().await?;
        Ok(nodes
            .iter()
            .filter_map(|labels| first_label(labels, &ZONE_LABEL_KEYS))
            .map(AvailabilityZone::new)
            .collect())
    }

    /// The set of instance-type label values restricted to nodes matching
    /// the spot matcher. Nodes without an instance-type label are skipped.
    pub async fn instance_types(
        &self,
        matcher: &LabelMatcher,
    ) -> ClusterResult<BTreeSet<InstanceType>> {
        let nodes = self.lister.list_node_labels().await?;
        Ok(nodes
            .iter()
            .filter(|labels| matcher.matches(labels))
            .filter_map(|labels| first_label(labels, &INSTANCE_TYPE_LABEL_KEYS))
            .map(InstanceType::new)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedNodes(Vec<NodeLabels>);

    #[async_trait]
    impl NodeLister for FixedNodes {
        async fn list_node_labels(&self) -> ClusterResult<Vec<NodeLabels>> {
            Ok(self.0.clone())
        }
    }

    fn node(pairs: &[(&str, &str)]) -> NodeLabels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_zones_ignore_spot_classification() {
        let inventory = ClusterInventory::new(FixedNodes(vec![
            node(&[
                ("topology.kubernetes.io/zone", "us-east-1a"),
                ("node-role.kubernetes.io/spot-worker", "true"),
            ]),
            // On-demand node still contributes its zone.
            node(&[("topology.kubernetes.io/zone", "us-east-1b")]),
        ]));

        let zones = inventory.zones().await.unwrap();
        assert_eq!(
            zones.into_iter().collect::<Vec<_>>(),
            vec![
                AvailabilityZone::new("us-east-1a"),
                AvailabilityZone::new("us-east-1b"),
            ]
        );
    }

    #[tokio::test]
    async fn test_zone_label_generation_fallback() {
        let inventory = ClusterInventory::new(FixedNodes(vec![
            node(&[("failure-domain.beta.kubernetes.io/zone", "us-east-1c")]),
            node(&[
                ("topology.kubernetes.io/zone", "us-east-1a"),
                ("failure-domain.beta.kubernetes.io/zone", "us-east-1a"),
            ]),
        ]));

        let zones = inventory.zones().await.unwrap();
        assert_eq!(zones.len(), 2);
        assert!(zones.contains(&AvailabilityZone::new("us-east-1c")));
    }

    #[tokio::test]
    async fn test_missing_zone_label_is_not_an_error() {
        let inventory = ClusterInventory::new(FixedNodes(vec![node(&[("other", "label")])]));
        assert!(inventory.zones().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_instance_types_restricted_to_matcher() {
        let matcher: LabelMatcher = "node-role.kubernetes.io/spot-worker".parse().unwrap();
        let inventory = ClusterInventory::new(FixedNodes(vec![
            node(&[
                ("node-role.kubernetes.io/spot-worker", "true"),
                ("node.kubernetes.io/instance-type", "m5.large"),
            ]),
            node(&[("node.kubernetes.io/instance-type", "c5.xlarge")]),
            node(&[
                ("node-role.kubernetes.io/spot-worker", ""),
                ("beta.kubernetes.io/instance-type", "r5.large"),
            ]),
        ]));

        let types = inventory.instance_types(&matcher).await.unwrap();
        assert_eq!(
            types.into_iter().collect::<Vec<_>>(),
            vec![InstanceType::new("m5.large"), InstanceType::new("r5.large")]
        );
    }

    #[tokio::test]
    async fn test_spot_node_without_type_label_is_skipped() {
        let matcher: LabelMatcher = "spot".parse().unwrap();
        let inventory =
            ClusterInventory::new(FixedNodes(vec![node(&[("spot", "true")])]));
        assert!(inventory.instance_types(&matcher).await.unwrap().is_empty());
    }
}
