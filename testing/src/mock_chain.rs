//! An in-memory `ChainClient` double: blocks, logs and balances are
//! pushed in by the test; the tip tracks the highest block pushed.

use async_trait::async_trait;
use chainlens_common::model::{BlockPayload, LogFilter, RawLog, RawTransaction, Wei};
use chainlens_common::traits::{CallRequest, ChainClient};
use chainlens_common::{CoreError, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub struct MockChainClient {
    chain_id: u64,
    blocks: Mutex<BTreeMap<u64, BlockPayload>>,
    logs: Mutex<BTreeMap<u64, Vec<RawLog>>>,
    balances: Mutex<BTreeMap<String, Wei>>,
    tip: AtomicU64,
}

impl MockChainClient {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            blocks: Mutex::new(BTreeMap::new()),
            logs: Mutex::new(BTreeMap::new()),
            balances: Mutex::new(BTreeMap::new()),
            tip: AtomicU64::new(0),
        }
    }

    /// Loads one block (and its logs) and advances the tip if needed.
    pub fn push_block(&self, block: BlockPayload, logs: Vec<RawLog>) {
        let number = block.number;
        self.tip.fetch_max(number, Ordering::SeqCst);
        self.logs.lock().unwrap().insert(number, logs);
        self.blocks.lock().unwrap().insert(number, block);
    }

    pub fn set_balance(&self, address: &str, balance: Wei) {
        self.balances.lock().unwrap().insert(address.to_lowercase(), balance);
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_block_number(&self) -> Result<u64> {
        Ok(self.tip.load(Ordering::SeqCst))
    }

    async fn get_block(&self, number: u64) -> Result<BlockPayload> {
        self.blocks
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("block {number}")))
    }

    async fn get_logs(&self, filter: LogFilter) -> Result<Vec<RawLog>> {
        if filter.from_block > filter.to_block {
            return Ok(Vec::new());
        }
        let logs = self.logs.lock().unwrap();
        let mut out = Vec::new();
        for (number, entries) in logs.range(filter.from_block..=filter.to_block) {
            let _ = number;
            for log in entries {
                if let Some(address) = &filter.address {
                    if !log.address.eq_ignore_ascii_case(address) {
                        continue;
                    }
                }
                out.push(log.clone());
            }
        }
        Ok(out)
    }

    async fn get_balance(&self, address: &str) -> Result<Wei> {
        Ok(self.balances.lock().unwrap().get(&address.to_lowercase()).copied().unwrap_or(Wei::ZERO))
    }

    async fn get_transaction(&self, tx_hash: &str) -> Result<Option<RawTransaction>> {
        for block in self.blocks.lock().unwrap().values() {
            if let Some(tx) = block.transactions.iter().find(|t| t.hash.eq_ignore_ascii_case(tx_hash)) {
                return Ok(Some(tx.clone()));
            }
        }
        Ok(None)
    }

    async fn get_receipt(&self, tx_hash: &str) -> Result<Option<RawTransaction>> {
        self.get_transaction(tx_hash).await
    }

    async fn trace_transaction(&self, _tx_hash: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn call(&self, _msg: CallRequest) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}
