use crate::model::bigint::Wei;
use crate::time::TimestampMillis;
use serde::{Deserialize, Serialize};

/// Persisted address (spec §3). Natural key `(network, address)`. Never
/// deleted; `tx_count` only ever increases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub network: String,
    pub address: String,
    pub balance: Wei,
    pub tx_count: i64,
    pub is_contract: bool,
    pub contract_creator: Option<String>,
    pub label: Option<String>,
    pub tags: Vec<String>,
    pub first_seen: TimestampMillis,
    pub last_seen: TimestampMillis,
}

impl Address {
    /// A zero-balance stub synthesized by higher layers when a lookup
    /// misses (spec §4.B: "higher layers synthesize a zero-balance
    /// stub").
    pub fn stub(network: impl Into<String>, address: impl Into<String>, now: TimestampMillis) -> Self {
        Self {
            network: network.into(),
            address: address.into(),
            balance: Wei::ZERO,
            tx_count: 0,
            is_contract: false,
            contract_creator: None,
            label: None,
            tags: Vec::new(),
            first_seen: now,
            last_seen: now,
        }
    }
}
