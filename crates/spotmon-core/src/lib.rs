//! # spotmon-core - Domain types for the spot-price reconciliation engine
//!
//! Shared vocabulary for the spotmon crates:
//!
//! - [`InstanceType`] / [`AvailabilityZone`] / [`Region`]: opaque identifying
//!   strings derived fresh from cluster state every cycle, with the pure
//!   zone-to-region derivation.
//! - [`SpotPriceSample`]: one advertised spot price for an
//!   (instance type, availability zone) pair.
//! - [`OndemandPriceTable`]: the daily-refreshed region x instance-type
//!   on-demand price table.
//! - [`ProductDescription`]: the fixed set of product descriptors accepted
//!   by the spot price query.
//! - [`LabelMatcher`]: node classification across both label schema
//!   generations, resolved once at startup.
//! - [`Backoff`]: the rate-limit backoff multiplier.

pub mod backoff;
pub mod error;
pub mod label;
pub mod types;

pub use backoff::Backoff;
pub use error::{CoreError, CoreResult};
pub use label::LabelMatcher;
pub use types::{
    AvailabilityZone, InstanceType, NodeLabels, OndemandPriceTable, ProductDescription, Region,
    SpotPriceSample,
};
