use crate::time::TimestampMillis;
use serde::{Deserialize, Serialize};

/// One row per network (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSyncState {
    pub network: String,
    pub last_indexed_block: i64,
    pub is_syncing: bool,
    pub blocks_behind: i64,
    pub last_error: Option<String>,
    pub updated_at: TimestampMillis,
}

impl NetworkSyncState {
    pub fn new(network: impl Into<String>, now: TimestampMillis) -> Self {
        Self {
            network: network.into(),
            last_indexed_block: 0,
            is_syncing: false,
            blocks_behind: 0,
            last_error: None,
            updated_at: now,
        }
    }
}

/// Aggregate counters for a network, derived from the entities in §3
/// (spec §4.B `GetNetworkStats`, supplemented per SPEC_FULL.md).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkStats {
    pub network: String,
    pub block_count: u64,
    pub tx_count: u64,
    pub address_count: u64,
    pub event_count: u64,
    pub last_indexed_block: i64,
    pub blocks_behind: i64,
}
