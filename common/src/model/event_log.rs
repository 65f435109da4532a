use crate::model::contract::TransferKind;
use crate::time::TimestampMillis;
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Persisted event log (spec §3). Natural key `(network, tx_hash,
/// log_index)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    pub network: String,
    pub tx_hash: String,
    pub log_index: i64,
    pub block_number: i64,
    pub contract_address: String,
    pub topic0: Option<String>,
    pub topic1: Option<String>,
    pub topic2: Option<String>,
    pub topic3: Option<String>,
    pub data: String,
    pub timestamp: TimestampMillis,
    pub decoded_name: Option<String>,
    pub decoded_args: Map<String, serde_json::Value>,
    pub removed: bool,
}

impl EventLog {
    /// Promotes `topics[i]` into `topic0..topic3` (spec §4.I); absent
    /// indices are `None`.
    pub fn topic(&self, index: usize) -> Option<&str> {
        match index {
            0 => self.topic0.as_deref(),
            1 => self.topic1.as_deref(),
            2 => self.topic2.as_deref(),
            3 => self.topic3.as_deref(),
            _ => None,
        }
    }
}

/// Raw log as returned by a `ChainClient`, pre-normalization.
#[derive(Debug, Clone)]
pub struct RawLog {
    pub tx_hash: String,
    pub log_index: u64,
    pub block_number: u64,
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub timestamp_secs: u64,
    pub removed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub from_block: u64,
    pub to_block: u64,
    pub address: Option<String>,
    pub topics: Vec<String>,
}

/// A decoded event delivered to the Contract Monitor (spec §3, §4.F).
/// Distinct from `EventLog`: this is the in-memory, already-decoded
/// shape fanned out to the Monitor, Alert Manager and CDC Bridge, not
/// the persisted row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractEvent {
    pub chain_id: u64,
    pub contract_address: String,
    pub tx_hash: String,
    pub log_index: i64,
    pub block_number: i64,
    pub event_name: String,
    pub topics: Vec<String>,
    pub data: String,
    pub decoded_args: Map<String, serde_json::Value>,
    pub timestamp: TimestampMillis,
    /// Mint/Burn/Transfer classification for a decoded `Transfer` event
    /// (spec §8 boundary behavior); `None` for any other event or when
    /// `from`/`to` weren't decoded.
    pub transfer_kind: Option<TransferKind>,
}
