//! Kubernetes API node lister
//!
//! A deliberately small client: the engine only ever issues
//! `GET /api/v1/nodes` and reads `items[].metadata.labels`. In-cluster it
//! resolves the apiserver from the pod environment and authenticates with
//! the mounted service-account token; outside the cluster an explicit
//! endpoint and token can be supplied.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use spotmon_core::NodeLabels;
use tracing::debug;

use crate::error::{ClusterError, ClusterResult};
use crate::node::NodeLister;

const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const SERVICE_ACCOUNT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Per-request timeout so a wedged apiserver cannot block the loop.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct NodeList {
    #[serde(default)]
    items: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Node {
    #[serde(default)]
    metadata: NodeMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct NodeMetadata {
    #[serde(default)]
    labels: HashMap<String, String>,
}

fn labels_from_list(list: NodeList) -> Vec<NodeLabels> {
    list.items.into_iter().map(|n| n.metadata.labels).collect()
}

/// Node lister backed by the Kubernetes API.
pub struct KubeNodeLister {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl KubeNodeLister {
    /// Connect to an explicit apiserver endpoint, optionally with a bearer
    /// token.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> ClusterResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Resolve the apiserver from the pod environment: service host/port
    /// env vars plus the mounted service-account token and CA certificate.
    pub fn in_cluster() -> ClusterResult<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| ClusterError::Config("KUBERNETES_SERVICE_HOST not set".to_string()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT")
            .map_err(|_| ClusterError::Config("KUBERNETES_SERVICE_PORT not set".to_string()))?;

        let token = std::fs::read_to_string(SERVICE_ACCOUNT_TOKEN)?
            .trim()
            .to_string();
        let ca_pem = std::fs::read(SERVICE_ACCOUNT_CA)?;
        let ca = reqwest::Certificate::from_pem(&ca_pem)?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .add_root_certificate(ca)
            .build()?;

        Ok(Self {
            client,
            base_url: format!("https://{host}:{port}"),
            token: Some(token),
        })
    }
}

#[async_trait]
impl NodeLister for KubeNodeLister {
    async fn list_node_labels(&self) -> ClusterResult<Vec<NodeLabels>> {
        let url = format!("{}/api/v1/nodes", self.base_url);

        let mut request = self.client.get(&url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClusterError::Api {
                status: status.as_u16(),
                message: message.chars().take(256).collect(),
            });
        }

        let list: NodeList = response.json().await?;
        let labels = labels_from_list(list);
        debug!(nodes = labels.len(), "Listed cluster nodes");
        Ok(labels)
    }
}
