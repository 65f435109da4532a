//! Config shapes for the runtime components. Loading these from a file,
//! env, or CLI flags is out of scope (spec §1) — the core only defines
//! the shapes and the numeric defaults spec §5 calls out.

use crate::model::network::Network;

/// Per-network poller/processor tuning (spec §4.D).
#[derive(Debug, Clone)]
pub struct NetworkIndexerConfig {
    pub network: Network,
    /// How often the poller queries the chain tip.
    pub block_time: std::time::Duration,
    /// Blocks withheld from indexing behind the chain tip.
    pub confirmations: u64,
    /// First block to index if no sync state exists yet.
    pub start_block: u64,
    /// Depth of the poller -> processor block-number queue.
    pub queue_depth: usize,
}

impl NetworkIndexerConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            block_time: std::time::Duration::from_secs(12),
            confirmations: 0,
            start_block: 0,
            queue_depth: 100,
        }
    }
}

/// Contract Monitor tuning (spec §4.F).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: std::time::Duration,
    pub balance_timeout: std::time::Duration,
    pub event_channel_depth: usize,
    pub max_events_per_contract: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: std::time::Duration::from_secs(15),
            balance_timeout: std::time::Duration::from_secs(10),
            event_channel_depth: 1000,
            max_events_per_contract: 500,
        }
    }
}

/// Alert Manager tuning (spec §4.G / §5).
#[derive(Debug, Clone)]
pub struct AlertManagerConfig {
    pub worker_count: usize,
    pub pending_queue_depth: usize,
}

impl Default for AlertManagerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            pending_queue_depth: 256,
        }
    }
}

/// CDC Bridge tuning (spec §4.H).
#[derive(Debug, Clone)]
pub struct CdcBridgeConfig {
    pub batch_size: usize,
    pub flush_interval: std::time::Duration,
    pub balance_sync_interval: std::time::Duration,
    pub event_channel_depth: usize,
}

impl Default for CdcBridgeConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            flush_interval: std::time::Duration::from_secs(1),
            balance_sync_interval: std::time::Duration::from_secs(60),
            event_channel_depth: 1000,
        }
    }
}

/// Overview-refresh timeout (spec §5): used by callers aggregating status
/// across the supervisor, not by any single component loop.
pub const OVERVIEW_REFRESH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
