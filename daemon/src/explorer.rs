//! Pure translation layer (spec §4.I): raw chain-client payloads into
//! the Indexed Store's entity shapes, plus the public search surface
//! built on top of the store. No I/O, no state held here beyond what's
//! passed in.

use chainlens_common::model::{
    canonical_name, Address, Block, BlockPayload, EventLog, RawLog, RawTransaction, Transaction, TxStatus,
};
use chainlens_common::time::now_millis;
use chainlens_common::traits::IndexedStore;
use chainlens_common::Result;
use serde::Serialize;

/// Translates one fetched block into the three entity shapes the store
/// expects. Case-normalization happens here, not in the store, so every
/// caller of the store already sees lowercase identifiers.
pub fn translate_block(payload: &BlockPayload) -> (Block, Vec<Transaction>, Vec<EventLog>) {
    let network = canonical_name(payload.chain_id);
    let now = now_millis();

    let block = Block {
        network: network.clone(),
        block_number: payload.number as i64,
        block_hash: payload.hash.to_lowercase(),
        parent_hash: payload.parent_hash.to_lowercase(),
        timestamp: payload.timestamp_secs * 1000,
        miner: payload.miner.to_lowercase(),
        gas_used: payload.gas_used as i64,
        gas_limit: payload.gas_limit as i64,
        base_fee: payload.base_fee,
        transaction_count: payload.transactions.len() as i64,
        size: payload.size as i64,
        created_at: now,
    };

    let txs = payload
        .transactions
        .iter()
        .map(|raw| translate_transaction(&network, payload.number as i64, raw, now))
        .collect();

    (block, txs, Vec::new())
}

fn translate_transaction(network: &str, block_number: i64, raw: &RawTransaction, now: u64) -> Transaction {
    Transaction {
        network: network.to_string(),
        tx_hash: raw.hash.to_lowercase(),
        block_number,
        tx_index: raw.index as i64,
        from: raw.from.to_lowercase(),
        to: raw.to.as_deref().map(str::to_lowercase),
        value: raw.value,
        gas_limit: raw.gas_limit as i64,
        gas_used: raw.gas_used.map(|g| g as i64),
        gas_price: raw.gas_price,
        max_fee_per_gas: raw.max_fee_per_gas,
        max_priority_fee_per_gas: raw.max_priority_fee_per_gas,
        input: raw.input.clone(),
        nonce: raw.nonce as i64,
        tx_type: raw.tx_type as i64,
        status: raw.status.map(|ok| if ok { TxStatus::Success } else { TxStatus::Failure }),
        contract_address: raw.contract_address.as_deref().map(str::to_lowercase),
        error_message: raw.error_message.clone(),
        created_at: now,
    }
}

/// Translates one fetched log into the persisted `EventLog` shape,
/// promoting `topics[i]` into `topic0..topic3` (absent = `None`).
pub fn translate_log(chain_id: u64, raw: &RawLog) -> EventLog {
    let network = canonical_name(chain_id);
    EventLog {
        network,
        tx_hash: raw.tx_hash.to_lowercase(),
        log_index: raw.log_index as i64,
        block_number: raw.block_number as i64,
        contract_address: raw.address.to_lowercase(),
        topic0: raw.topics.first().map(|t| t.to_lowercase()),
        topic1: raw.topics.get(1).map(|t| t.to_lowercase()),
        topic2: raw.topics.get(2).map(|t| t.to_lowercase()),
        topic3: raw.topics.get(3).map(|t| t.to_lowercase()),
        data: raw.data.clone(),
        timestamp: raw.timestamp_secs * 1000,
        decoded_name: None,
        decoded_args: Default::default(),
        removed: raw.removed,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchResultKind {
    Block,
    Transaction,
    Address,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(rename = "type")]
    pub kind: SearchResultKind,
    pub network: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SearchResults {
    pub items: Vec<SearchResult>,
    pub total: u64,
}

fn is_hex_of_digit_len(s: &str, digits: usize) -> bool {
    s.len() == digits + 2 && s.starts_with("0x") && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn entry(kind: SearchResultKind, network: &str, data: &impl Serialize) -> Result<SearchResult> {
    Ok(SearchResult {
        kind,
        network: network.to_string(),
        data: serde_json::to_value(data)
            .map_err(|e| chainlens_common::CoreError::Internal(format!("search entry serialization failed: {e}")))?,
    })
}

/// Dispatches by query shape (spec §4.I, §6). A 66-char hex string
/// triggers *both* a transaction-hash and a block-hash lookup — the
/// redundancy is deliberate (spec §9 open question), kept as-is.
pub async fn search(store: &dyn IndexedStore, network: &str, query: &str) -> Result<SearchResults> {
    let mut items = Vec::new();

    if is_hex_of_digit_len(query, 64) {
        if let Some(tx) = store.get_transaction(network, query).await? {
            items.push(entry(SearchResultKind::Transaction, network, &tx)?);
        }
        if let Some(block) = store.get_block_by_hash(network, query).await? {
            items.push(entry(SearchResultKind::Block, network, &block)?);
        }
    }

    if is_hex_of_digit_len(query, 40) {
        let address = match store.get_address(network, query).await? {
            Some(address) => address,
            None => Address::stub(network, query, now_millis()),
        };
        items.push(entry(SearchResultKind::Address, network, &address)?);
    }

    if is_decimal(query) {
        if let Ok(number) = query.parse::<i64>() {
            if let Some(block) = store.get_block_by_number(network, number).await? {
                items.push(entry(SearchResultKind::Block, network, &block)?);
            }
        }
    }

    Ok(SearchResults { total: items.len() as u64, items })
}
