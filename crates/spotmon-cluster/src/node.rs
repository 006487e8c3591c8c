//! Node inventory source seam

use async_trait::async_trait;
use spotmon_core::NodeLabels;

use crate::error::ClusterResult;

/// Source of cluster node state.
///
/// The engine requires only the label map of each node and tolerates absent
/// keys; anything else about the node is irrelevant here.
#[async_trait]
pub trait NodeLister: Send + Sync {
    /// Snapshot the label maps of all nodes currently in the cluster.
    async fn list_node_labels(&self) -> ClusterResult<Vec<NodeLabels>>;
}
