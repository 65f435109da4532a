//! Arbitrary-precision "wei-style" quantities (spec §3, §9). Kept as a
//! big integer internally, serialized as a decimal string at the store
//! boundary the way the spec requires.

use crate::{CoreError, Result};
use primitive_types::U256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Wei(pub U256);

impl Wei {
    pub const ZERO: Wei = Wei(U256::zero());

    pub fn from_decimal_str(s: &str) -> Result<Self> {
        U256::from_dec_str(s)
            .map(Wei)
            .map_err(|e| CoreError::InvalidArgument(format!("invalid decimal quantity {s:?}: {e}")))
    }

    /// Converts an ether-denominated threshold (as used by `AlertRule`
    /// conditions) into wei, i.e. `threshold * 10^18`.
    pub fn from_ether(threshold: f64) -> Self {
        let threshold = threshold.max(0.0);
        let scaled = (threshold * 1e18).round();
        Wei(U256::from(scaled as u128))
    }
}

impl From<u64> for Wei {
    fn from(v: u64) -> Self {
        Wei(U256::from(v))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Wei {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self> {
        Self::from_decimal_str(s)
    }
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Wei::from_decimal_str(&s).map_err(D::Error::custom)
    }
}
