//! Core error types

use thiserror::Error;

use crate::types::ProductDescription;

/// Errors raised while resolving engine configuration.
///
/// These are fatal at startup and never occur once the reconciliation
/// loop is running.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Label matcher specification contains more than one `=`
    #[error("invalid label matcher {spec:?}: expected `key` or `key=value`")]
    InvalidMatcher {
        /// The offending specification string
        spec: String,
    },

    /// Product descriptor outside the allowed set
    #[error("invalid product {product:?}, expected one of {expected}")]
    InvalidProduct {
        /// The offending descriptor
        product: String,
        /// Comma-separated allowed descriptors
        expected: String,
    },
}

impl CoreError {
    pub(crate) fn invalid_product(product: &str) -> Self {
        let expected = ProductDescription::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self::InvalidProduct {
            product: product.to_string(),
            expected,
        }
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
