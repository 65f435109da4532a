use crate::model::bigint::Wei;
use crate::time::TimestampMillis;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Success,
    Failure,
}

/// Persisted transaction (spec §3). Natural key `(network, tx_hash)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub network: String,
    pub tx_hash: String,
    pub block_number: i64,
    pub tx_index: i64,
    pub from: String,
    pub to: Option<String>,
    pub value: Wei,
    pub gas_limit: i64,
    pub gas_used: Option<i64>,
    pub gas_price: Option<Wei>,
    pub max_fee_per_gas: Option<Wei>,
    pub max_priority_fee_per_gas: Option<Wei>,
    pub input: String,
    pub nonce: i64,
    pub tx_type: i64,
    pub status: Option<TxStatus>,
    pub contract_address: Option<String>,
    pub error_message: Option<String>,
    pub created_at: TimestampMillis,
}

impl Transaction {
    /// Addresses this transaction touches: `from`, `to` (if present) and
    /// `contract_address` (if present) — the set the Network Indexer
    /// credits via `IncrementAddressTxCount` (spec §4.D).
    pub fn touched_addresses(&self) -> Vec<String> {
        let mut addrs = vec![self.from.clone()];
        if let Some(to) = &self.to {
            addrs.push(to.clone());
        }
        if let Some(contract) = &self.contract_address {
            addrs.push(contract.clone());
        }
        addrs.sort();
        addrs.dedup();
        addrs
    }
}
