use crate::model::bigint::Wei;
use crate::time::TimestampMillis;
use serde::{Deserialize, Serialize};

/// Persisted block (spec §3). Natural key `(network, block_number)`;
/// unique `(network, block_hash)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub network: String,
    pub block_number: i64,
    pub block_hash: String,
    pub parent_hash: String,
    pub timestamp: TimestampMillis,
    pub miner: String,
    pub gas_used: i64,
    pub gas_limit: i64,
    pub base_fee: Option<Wei>,
    pub transaction_count: i64,
    pub size: i64,
    pub created_at: TimestampMillis,
}

/// Raw block as returned by a `ChainClient`, pre-normalization. Carries
/// its own transactions; logs are fetched separately via `get_logs`.
#[derive(Debug, Clone)]
pub struct BlockPayload {
    pub chain_id: u64,
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp_secs: u64,
    pub miner: String,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub base_fee: Option<Wei>,
    pub size: u64,
    pub transactions: Vec<RawTransaction>,
}

#[derive(Debug, Clone)]
pub struct RawTransaction {
    pub hash: String,
    pub index: u64,
    pub from: String,
    pub to: Option<String>,
    pub value: Wei,
    pub gas_limit: u64,
    pub gas_used: Option<u64>,
    pub gas_price: Option<Wei>,
    pub max_fee_per_gas: Option<Wei>,
    pub max_priority_fee_per_gas: Option<Wei>,
    pub input: String,
    pub nonce: u64,
    pub tx_type: u64,
    /// `None` until the receipt is known; `Some(true)` is success.
    pub status: Option<bool>,
    pub contract_address: Option<String>,
    pub error_message: Option<String>,
}
