//! In-memory `IndexedStore` implementation honoring the idempotency,
//! merge and pagination contracts of spec §4.B. This is the store the
//! test suite runs against (spec §9); it's also usable directly by an
//! embedder that hasn't wired a real database yet.

use async_trait::async_trait;
use chainlens_common::model::{
    Address, Block, EventLog, NetworkStats, NetworkSyncState, Page, PageRequest, Transaction,
};
use chainlens_common::time::{now_millis, TimestampMillis};
use chainlens_common::traits::IndexedStore;
use chainlens_common::{CoreError, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;

fn norm(s: &str) -> String {
    s.to_lowercase()
}

#[derive(Default)]
struct Inner {
    blocks: HashMap<(String, i64), Block>,
    block_hash_index: HashMap<(String, String), i64>,
    transactions: HashMap<(String, String), Transaction>,
    addresses: HashMap<(String, String), Address>,
    event_logs: HashMap<(String, String, i64), EventLog>,
    sync_states: HashMap<String, NetworkSyncState>,
}

/// A single `RwLock` over every in-memory map (spec §5's shared-resource
/// policy): writes take the write side, reads take the read side.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexedStore for MemoryStore {
    async fn insert_block(&self, mut block: Block) -> Result<()> {
        block.network = norm(&block.network);
        block.block_hash = norm(&block.block_hash);
        block.parent_hash = norm(&block.parent_hash);
        block.miner = norm(&block.miner);

        let key = (block.network.clone(), block.block_number);
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.blocks.get(&key) {
            // preserve created_at across upserts; every other field is
            // mutable and takes the latest write (spec §4.B merge rule).
            block.created_at = existing.created_at;
        }
        inner
            .block_hash_index
            .insert((block.network.clone(), block.block_hash.clone()), block.block_number);
        inner.blocks.insert(key, block);
        Ok(())
    }

    async fn insert_blocks(&self, blocks: Vec<Block>) -> Result<()> {
        for (index, block) in blocks.into_iter().enumerate() {
            self.insert_block(block)
                .await
                .map_err(|e| CoreError::Internal(format!("batch block insert failed at index {index}: {e}")))?;
        }
        Ok(())
    }

    async fn insert_transaction(&self, mut tx: Transaction) -> Result<()> {
        tx.network = norm(&tx.network);
        tx.tx_hash = norm(&tx.tx_hash);
        tx.from = norm(&tx.from);
        tx.to = tx.to.as_deref().map(norm);
        tx.contract_address = tx.contract_address.as_deref().map(norm);

        let key = (tx.network.clone(), tx.tx_hash.clone());
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.transactions.get(&key) {
            // merge rule: only status/gas_used/error_message are mutable
            // on a re-insert; everything else keeps its first value.
            let mut merged = existing.clone();
            merged.status = tx.status.or(merged.status);
            merged.gas_used = tx.gas_used.or(merged.gas_used);
            merged.error_message = tx.error_message.or(merged.error_message);
            inner.transactions.insert(key, merged);
        } else {
            inner.transactions.insert(key, tx);
        }
        Ok(())
    }

    async fn insert_transactions(&self, txs: Vec<Transaction>) -> Result<()> {
        for (index, tx) in txs.into_iter().enumerate() {
            self.insert_transaction(tx)
                .await
                .map_err(|e| CoreError::Internal(format!("batch tx insert failed at index {index}: {e}")))?;
        }
        Ok(())
    }

    async fn insert_event_log(&self, mut log: EventLog) -> Result<()> {
        log.network = norm(&log.network);
        log.tx_hash = norm(&log.tx_hash);
        log.contract_address = norm(&log.contract_address);

        let key = (log.network.clone(), log.tx_hash.clone(), log.log_index);
        let mut inner = self.inner.write().await;
        // insert-or-ignore (spec §4.B).
        inner.event_logs.entry(key).or_insert(log);
        Ok(())
    }

    async fn insert_event_logs(&self, logs: Vec<EventLog>) -> Result<()> {
        for (index, log) in logs.into_iter().enumerate() {
            self.insert_event_log(log)
                .await
                .map_err(|e| CoreError::Internal(format!("batch log insert failed at index {index}: {e}")))?;
        }
        Ok(())
    }

    async fn get_block_by_number(&self, network: &str, block_number: i64) -> Result<Option<Block>> {
        let inner = self.inner.read().await;
        Ok(inner.blocks.get(&(norm(network), block_number)).cloned())
    }

    async fn get_block_by_hash(&self, network: &str, block_hash: &str) -> Result<Option<Block>> {
        let inner = self.inner.read().await;
        let Some(number) = inner.block_hash_index.get(&(norm(network), norm(block_hash))) else {
            return Ok(None);
        };
        Ok(inner.blocks.get(&(norm(network), *number)).cloned())
    }

    async fn get_latest_block(&self, network: &str) -> Result<Option<Block>> {
        let network = norm(network);
        let inner = self.inner.read().await;
        Ok(inner
            .blocks
            .values()
            .filter(|b| b.network == network)
            .max_by_key(|b| b.block_number)
            .cloned())
    }

    async fn get_transaction(&self, network: &str, tx_hash: &str) -> Result<Option<Transaction>> {
        let inner = self.inner.read().await;
        Ok(inner.transactions.get(&(norm(network), norm(tx_hash))).cloned())
    }

    async fn get_transactions_by_block(&self, network: &str, block_number: i64) -> Result<Vec<Transaction>> {
        let network = norm(network);
        let inner = self.inner.read().await;
        let mut txs: Vec<Transaction> = inner
            .transactions
            .values()
            .filter(|t| t.network == network && t.block_number == block_number)
            .cloned()
            .collect();
        txs.sort_by_key(|t| t.tx_index);
        Ok(txs)
    }

    async fn get_transaction_logs(&self, network: &str, tx_hash: &str) -> Result<Vec<EventLog>> {
        let network = norm(network);
        let tx_hash = norm(tx_hash);
        let inner = self.inner.read().await;
        let mut logs: Vec<EventLog> = inner
            .event_logs
            .values()
            .filter(|l| l.network == network && l.tx_hash == tx_hash)
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.log_index);
        Ok(logs)
    }

    async fn get_address(&self, network: &str, address: &str) -> Result<Option<Address>> {
        let inner = self.inner.read().await;
        Ok(inner.addresses.get(&(norm(network), norm(address))).cloned())
    }

    async fn upsert_address(&self, mut address: Address) -> Result<()> {
        address.network = norm(&address.network);
        address.address = norm(&address.address);

        let key = (address.network.clone(), address.address.clone());
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.addresses.get(&key) {
            address.first_seen = address.first_seen.min(existing.first_seen);
            address.last_seen = address.last_seen.max(existing.last_seen);
        }
        inner.addresses.insert(key, address);
        Ok(())
    }

    async fn increment_address_tx_count(
        &self,
        network: &str,
        addresses: &[String],
        ts: TimestampMillis,
    ) -> Result<()> {
        let network = norm(network);
        let mut inner = self.inner.write().await;
        for address in addresses {
            let address = norm(address);
            let key = (network.clone(), address.clone());
            let entry = inner.addresses.entry(key).or_insert_with(|| Address {
                network: network.clone(),
                address: address.clone(),
                balance: Default::default(),
                tx_count: 0,
                is_contract: false,
                contract_creator: None,
                label: None,
                tags: Vec::new(),
                first_seen: ts,
                last_seen: ts,
            });
            entry.tx_count += 1;
            entry.last_seen = entry.last_seen.max(ts);
        }
        Ok(())
    }

    async fn get_address_transactions(
        &self,
        network: &str,
        address: &str,
        page: PageRequest,
    ) -> Result<Page<Transaction>> {
        let network = norm(network);
        let address = norm(address);
        let inner = self.inner.read().await;
        let mut matches: Vec<Transaction> = inner
            .transactions
            .values()
            .filter(|t| {
                t.network == network
                    && (t.from == address
                        || t.to.as_deref() == Some(address.as_str())
                        || t.contract_address.as_deref() == Some(address.as_str()))
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| (b.block_number, b.tx_index).cmp(&(a.block_number, a.tx_index)));
        Ok(paginate(matches, page))
    }

    async fn get_address_logs(&self, network: &str, address: &str, page: PageRequest) -> Result<Page<EventLog>> {
        let network = norm(network);
        let address = norm(address);
        let inner = self.inner.read().await;
        let mut matches: Vec<EventLog> = inner
            .event_logs
            .values()
            .filter(|l| l.network == network && l.contract_address == address)
            .cloned()
            .collect();
        matches.sort_by(|a, b| (b.block_number, b.log_index).cmp(&(a.block_number, a.log_index)));
        Ok(paginate(matches, page))
    }

    async fn list_blocks(&self, network: &str, page: PageRequest) -> Result<Page<Block>> {
        let network = norm(network);
        let inner = self.inner.read().await;
        let mut blocks: Vec<Block> = inner.blocks.values().filter(|b| b.network == network).cloned().collect();
        blocks.sort_by(|a, b| b.block_number.cmp(&a.block_number));
        Ok(paginate(blocks, page))
    }

    async fn list_transactions(&self, network: &str, page: PageRequest) -> Result<Page<Transaction>> {
        let network = norm(network);
        let inner = self.inner.read().await;
        let mut txs: Vec<Transaction> = inner.transactions.values().filter(|t| t.network == network).cloned().collect();
        txs.sort_by(|a, b| (b.block_number, b.tx_index).cmp(&(a.block_number, a.tx_index)));
        Ok(paginate(txs, page))
    }

    async fn list_event_logs(&self, network: &str, page: PageRequest) -> Result<Page<EventLog>> {
        let network = norm(network);
        let inner = self.inner.read().await;
        let mut logs: Vec<EventLog> = inner.event_logs.values().filter(|l| l.network == network).cloned().collect();
        logs.sort_by(|a, b| (b.block_number, b.log_index).cmp(&(a.block_number, a.log_index)));
        Ok(paginate(logs, page))
    }

    async fn update_sync_state(&self, mut state: NetworkSyncState) -> Result<()> {
        state.network = norm(&state.network);
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.sync_states.get(&state.network) {
            // invariant 3 (spec §3): never regress on a successful commit.
            state.last_indexed_block = state.last_indexed_block.max(existing.last_indexed_block);
        }
        inner.sync_states.insert(state.network.clone(), state);
        Ok(())
    }

    async fn get_sync_state(&self, network: &str) -> Result<Option<NetworkSyncState>> {
        let inner = self.inner.read().await;
        Ok(inner.sync_states.get(&norm(network)).cloned())
    }

    async fn get_network_stats(&self, network: &str) -> Result<NetworkStats> {
        let network = norm(network);
        let inner = self.inner.read().await;
        let sync = inner.sync_states.get(&network);
        Ok(NetworkStats {
            network: network.clone(),
            block_count: inner.blocks.values().filter(|b| b.network == network).count() as u64,
            tx_count: inner.transactions.values().filter(|t| t.network == network).count() as u64,
            address_count: inner.addresses.values().filter(|a| a.network == network).count() as u64,
            event_count: inner.event_logs.values().filter(|l| l.network == network).count() as u64,
            last_indexed_block: sync.map(|s| s.last_indexed_block).unwrap_or(0),
            blocks_behind: sync.map(|s| s.blocks_behind).unwrap_or(0),
        })
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let offset = page.offset() as usize;
    let limit = page.page_size() as usize;
    let page_items = items.into_iter().skip(offset).take(limit).collect();
    Page::new(page_items, total, page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainlens_common::model::Wei;

    fn sample_block(network: &str, number: i64) -> Block {
        Block {
            network: network.to_string(),
            block_number: number,
            block_hash: format!("0xhash{number}"),
            parent_hash: format!("0xhash{}", number - 1),
            timestamp: now_millis(),
            miner: "0xminer".into(),
            gas_used: 21000,
            gas_limit: 30_000_000,
            base_fee: None,
            transaction_count: 0,
            size: 1000,
            created_at: now_millis(),
        }
    }

    #[tokio::test]
    async fn block_upsert_preserves_created_at() {
        let store = MemoryStore::new();
        let mut block = sample_block("ethereum", 1);
        block.created_at = 100;
        store.insert_block(block.clone()).await.unwrap();

        let mut updated = block;
        updated.created_at = 999;
        updated.gas_used = 50_000;
        store.insert_block(updated).await.unwrap();

        let stored = store.get_block_by_number("ethereum", 1).await.unwrap().unwrap();
        assert_eq!(stored.created_at, 100);
        assert_eq!(stored.gas_used, 50_000);
    }

    #[tokio::test]
    async fn transaction_merge_only_touches_status_gas_error() {
        let store = MemoryStore::new();
        let tx = Transaction {
            network: "ethereum".into(),
            tx_hash: "0xabc".into(),
            block_number: 1,
            tx_index: 0,
            from: "0xAAA".into(),
            to: Some("0xBBB".into()),
            value: Wei::from(1u64),
            gas_limit: 21000,
            gas_used: None,
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            input: "0x".into(),
            nonce: 0,
            tx_type: 0,
            status: None,
            contract_address: None,
            error_message: None,
            created_at: now_millis(),
        };
        store.insert_transaction(tx.clone()).await.unwrap();

        let mut replay = tx.clone();
        replay.gas_used = Some(21000);
        replay.status = Some(chainlens_common::model::TxStatus::Success);
        replay.from = "0xCCC".into(); // should not overwrite
        store.insert_transaction(replay).await.unwrap();

        let stored = store.get_transaction("ethereum", "0xabc").await.unwrap().unwrap();
        assert_eq!(stored.from, "0xaaa");
        assert_eq!(stored.gas_used, Some(21000));
    }

    #[tokio::test]
    async fn event_log_insert_is_ignore_on_conflict() {
        let store = MemoryStore::new();
        let log = EventLog {
            network: "ethereum".into(),
            tx_hash: "0xabc".into(),
            log_index: 0,
            block_number: 1,
            contract_address: "0xccc".into(),
            topic0: Some("0xddf2".into()),
            topic1: None,
            topic2: None,
            topic3: None,
            data: "0x".into(),
            timestamp: now_millis(),
            decoded_name: Some("Transfer".into()),
            decoded_args: Default::default(),
            removed: false,
        };
        store.insert_event_log(log.clone()).await.unwrap();

        let mut replay = log;
        replay.decoded_name = Some("Other".into());
        store.insert_event_log(replay).await.unwrap();

        let logs = store.get_transaction_logs("ethereum", "0xabc").await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].decoded_name.as_deref(), Some("Transfer"));
    }

    #[tokio::test]
    async fn sync_state_last_indexed_block_is_monotonic() {
        let store = MemoryStore::new();
        store
            .update_sync_state(NetworkSyncState {
                network: "ethereum".into(),
                last_indexed_block: 100,
                is_syncing: true,
                blocks_behind: 0,
                last_error: None,
                updated_at: now_millis(),
            })
            .await
            .unwrap();
        store
            .update_sync_state(NetworkSyncState {
                network: "ethereum".into(),
                last_indexed_block: 50,
                is_syncing: true,
                blocks_behind: 0,
                last_error: None,
                updated_at: now_millis(),
            })
            .await
            .unwrap();

        let state = store.get_sync_state("ethereum").await.unwrap().unwrap();
        assert_eq!(state.last_indexed_block, 100);
    }

    #[tokio::test]
    async fn pagination_covers_every_item_exactly_once() {
        let store = MemoryStore::new();
        for i in 1..=25 {
            store.insert_block(sample_block("ethereum", i)).await.unwrap();
        }

        let mut seen = std::collections::HashSet::new();
        let mut page_num = 1;
        loop {
            let page = store
                .list_blocks("ethereum", PageRequest::new(page_num, 10))
                .await
                .unwrap();
            if page.items.is_empty() {
                break;
            }
            for block in &page.items {
                assert!(seen.insert(block.block_number), "duplicate item across pages");
            }
            if page_num as u64 >= page.total_pages {
                break;
            }
            page_num += 1;
        }
        assert_eq!(seen.len(), 25);
    }
}
