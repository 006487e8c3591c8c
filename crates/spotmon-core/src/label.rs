//! Spot-node label matching
//!
//! Two generations of the cluster labeling convention are in the wild: the
//! older one marks spot nodes with a bare role label
//! (`node-role.kubernetes.io/spot-worker`), the newer one with a key=value
//! pair (`kubernetes.io/role=spot-worker`). The matcher supports both so the
//! operator does not need to know which generation a cluster runs.

use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::types::NodeLabels;

/// Node classification rule, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelMatcher {
    /// `<key>`: the label key is present, any value
    Presence { key: String },

    /// `<key>=<value>`: the label key is present with exactly this value
    Value { key: String, value: String },
}

impl LabelMatcher {
    /// Whether a node with the given labels is classified as a spot node.
    pub fn matches(&self, labels: &NodeLabels) -> bool {
        match self {
            LabelMatcher::Presence { key } => labels.contains_key(key),
            LabelMatcher::Value { key, value } => {
                labels.get(key).is_some_and(|v| v == value)
            }
        }
    }

    /// The label key this matcher inspects.
    pub fn key(&self) -> &str {
        match self {
            LabelMatcher::Presence { key } => key,
            LabelMatcher::Value { key, .. } => key,
        }
    }
}

impl FromStr for LabelMatcher {
    type Err = CoreError;

    /// Parse a matcher specification: `key` or `key=value`. More than one
    /// `=` is a configuration error, raised at startup rather than per node.
    fn from_str(spec: &str) -> CoreResult<Self> {
        let mut parts = spec.split('=');
        let key = parts.next().unwrap_or_default();

        match (parts.next(), parts.next()) {
            (None, _) => Ok(LabelMatcher::Presence {
                key: key.to_string(),
            }),
            (Some(value), None) => Ok(LabelMatcher::Value {
                key: key.to_string(),
                value: value.to_string(),
            }),
            (Some(_), Some(_)) => Err(CoreError::InvalidMatcher {
                spec: spec.to_string(),
            }),
        }
    }
}
