//! Identifying strings and price records exchanged between the engine stages
//!
//! Instance types, availability zones, and regions are opaque strings with
//! no identity beyond equality; sets of them are derived fresh from cluster
//! state every cycle and never retained.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Label key -> label value snapshot for one node, taken once per cycle.
pub type NodeLabels = HashMap<String, String>;

/// An EC2 instance type identifier, e.g. `m5.large`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceType(String);

impl InstanceType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An availability zone identifier, e.g. `us-east-1a`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilityZone(String);

impl AvailabilityZone {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the region by stripping the single trailing lowercase zone
    /// letter (`us-east-1a` -> `us-east-1`). Total over any zone string:
    /// identity when no such suffix exists.
    pub fn region(&self) -> Region {
        match self.0.strip_suffix(|c: char| c.is_ascii_lowercase()) {
            Some(prefix) => Region::new(prefix),
            None => Region::new(self.0.as_str()),
        }
    }
}

impl fmt::Display for AvailabilityZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An AWS region identifier, e.g. `us-east-1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Product descriptors accepted by the spot price query.
///
/// The set is fixed; anything else is rejected when configuration is
/// resolved, never per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductDescription {
    LinuxUnix,
    SuseLinux,
    Windows,
    LinuxUnixVpc,
    SuseLinuxVpc,
    WindowsVpc,
}

impl ProductDescription {
    /// All allowed descriptors.
    pub const ALL: [ProductDescription; 6] = [
        ProductDescription::LinuxUnix,
        ProductDescription::SuseLinux,
        ProductDescription::Windows,
        ProductDescription::LinuxUnixVpc,
        ProductDescription::SuseLinuxVpc,
        ProductDescription::WindowsVpc,
    ];

    /// The descriptor exactly as the provider spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductDescription::LinuxUnix => "Linux/UNIX",
            ProductDescription::SuseLinux => "SUSE Linux",
            ProductDescription::Windows => "Windows",
            ProductDescription::LinuxUnixVpc => "Linux/UNIX (Amazon VPC)",
            ProductDescription::SuseLinuxVpc => "SUSE Linux (Amazon VPC)",
            ProductDescription::WindowsVpc => "Windows (Amazon VPC)",
        }
    }
}

impl FromStr for ProductDescription {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::invalid_product(s))
    }
}

impl fmt::Display for ProductDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One currently advertised spot price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotPriceSample {
    /// Instance type the price applies to
    pub instance_type: InstanceType,

    /// Availability zone the price applies to
    pub availability_zone: AvailabilityZone,

    /// Price in dollars per hour
    pub price: f64,

    /// Product the price was advertised for
    pub product: ProductDescription,

    /// Provider-reported timestamp of the price record
    pub timestamp: DateTime<Utc>,
}

/// Region x instance-type on-demand price table.
///
/// Replaced wholesale on each successful refresh; read-only once published
/// to metric projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OndemandPriceTable {
    prices: HashMap<Region, HashMap<InstanceType, f64>>,
}

impl OndemandPriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the on-demand price for an instance type in a region.
    pub fn insert(&mut self, region: Region, instance_type: InstanceType, price: f64) {
        self.prices
            .entry(region)
            .or_default()
            .insert(instance_type, price);
    }

    /// Look up a price; `None` when the region or type is absent.
    pub fn price(&self, region: &Region, instance_type: &InstanceType) -> Option<f64> {
        self.prices.get(region)?.get(instance_type).copied()
    }

    /// Number of regions with at least one price.
    pub fn region_count(&self) -> usize {
        self.prices.len()
    }

    /// Total number of (region, instance type) entries.
    pub fn entry_count(&self) -> usize {
        self.prices.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
