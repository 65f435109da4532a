//! Polymorphic access to one network (spec §4.A). The transport itself
//! (JSON-RPC or otherwise) is out of scope — implementations are injected
//! by the host. Not mutated post-registration; implementations must be
//! safe for concurrent use.

use crate::model::{BlockPayload, LogFilter, RawLog, RawTransaction, Wei};
use crate::Result;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct CallRequest {
    pub to: String,
    pub data: String,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;

    async fn get_block_number(&self) -> Result<u64>;

    async fn get_block(&self, number: u64) -> Result<BlockPayload>;

    async fn get_logs(&self, filter: LogFilter) -> Result<Vec<RawLog>>;

    async fn get_balance(&self, address: &str) -> Result<Wei>;

    async fn get_transaction(&self, tx_hash: &str) -> Result<Option<RawTransaction>>;

    async fn get_receipt(&self, tx_hash: &str) -> Result<Option<RawTransaction>>;

    async fn trace_transaction(&self, tx_hash: &str) -> Result<serde_json::Value>;

    async fn call(&self, msg: CallRequest) -> Result<Vec<u8>>;
}
