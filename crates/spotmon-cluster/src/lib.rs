//! # spotmon-cluster - Cluster node inventory
//!
//! Derives the distinct instance types and availability zones currently in
//! use by the cluster from node labels. The inventory re-enumerates nodes on
//! every call so topology changes are reflected within one reconciliation
//! cycle; nothing is cached here.
//!
//! The node source sits behind the [`NodeLister`] trait. The production
//! implementation is [`KubeNodeLister`], a thin Kubernetes API client that
//! only needs `GET /api/v1/nodes` and the label maps in the response.

pub mod error;
pub mod inventory;
pub mod kube;
pub mod node;

pub use error::{ClusterError, ClusterResult};
pub use inventory::ClusterInventory;
pub use kube::KubeNodeLister;
pub use node::NodeLister;
