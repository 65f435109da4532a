//! Multi-Network Supervisor (spec §4.E): registers a chain client per
//! network, owns the resulting Network Indexer, and forwards the same
//! client to the Contract Monitor so its poll loop can reach that chain.

use chainlens_common::config::NetworkIndexerConfig;
use chainlens_common::traits::{ChainClient, IndexedStore};
use chainlens_common::{CoreError, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::monitor::ContractMonitor;
use crate::network_indexer::{NetworkIndexer, NetworkStatus};

pub struct Supervisor {
    store: Arc<dyn IndexedStore>,
    monitor: Arc<ContractMonitor>,
    indexers: RwLock<BTreeMap<u64, Arc<NetworkIndexer>>>,
    running: AtomicBool,
}

impl Supervisor {
    pub fn new(store: Arc<dyn IndexedStore>, monitor: Arc<ContractMonitor>) -> Self {
        Self { store, monitor, indexers: RwLock::new(BTreeMap::new()), running: AtomicBool::new(false) }
    }

    /// Fails loudly with `AlreadyExists` on a duplicate `chain_id`. If
    /// the supervisor is already running, the new indexer is started
    /// immediately rather than waiting for the next `start()`.
    pub async fn register(&self, chain_id: u64, client: Arc<dyn ChainClient>, config: NetworkIndexerConfig) -> Result<()> {
        let mut indexers = self.indexers.write().await;
        if indexers.contains_key(&chain_id) {
            return Err(CoreError::AlreadyExists(format!("network {chain_id} already registered")));
        }
        self.monitor.register_chain_client(chain_id, client.clone()).await;

        let indexer = Arc::new(NetworkIndexer::new(config, client, self.store.clone(), self.monitor.sender()));
        if self.running.load(Ordering::SeqCst) {
            indexer.start().await?;
        }
        indexers.insert(chain_id, indexer);
        Ok(())
    }

    /// Idempotent: starts every registered indexer not already running.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        for indexer in self.indexers.read().await.values() {
            indexer.start().await?;
        }
        Ok(())
    }

    /// Idempotent: signals every indexer to stop.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for indexer in self.indexers.read().await.values() {
            indexer.stop().await;
        }
    }

    pub async fn get_all_network_status(&self) -> BTreeMap<u64, NetworkStatus> {
        let mut out = BTreeMap::new();
        for (chain_id, indexer) in self.indexers.read().await.iter() {
            out.insert(*chain_id, indexer.status().await);
        }
        out
    }
}
