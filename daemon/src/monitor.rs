//! Contract Monitor (spec §4.F): tracks contracts of interest, keeps a
//! bounded per-contract event ring, polls balances/logs on a timer, and
//! fans events out to whichever components subscribed (Alert Manager,
//! CDC Bridge).

use chainlens_common::config::MonitorConfig;
use chainlens_common::model::{classify_transfer_event, Contract, ContractEvent, ContractKey, ContractStatus, LogFilter};
use chainlens_common::traits::ChainClient;
use chainlens_common::{CoreError, Result};
use indexmap::IndexMap;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::explorer::translate_log;

#[derive(Debug, Clone, Default)]
pub struct MonitorStats {
    pub total_contracts: usize,
    pub by_chain: BTreeMap<u64, usize>,
    pub by_status: BTreeMap<&'static str, usize>,
    pub total_buffered_events: usize,
}

struct Inner {
    contracts: IndexMap<ContractKey, Contract>,
    events: IndexMap<ContractKey, VecDeque<ContractEvent>>,
}

type ChainClients = RwLock<BTreeMap<u64, Arc<dyn ChainClient>>>;
type Sinks = RwLock<Vec<mpsc::Sender<ContractEvent>>>;

pub struct ContractMonitor {
    config: MonitorConfig,
    inner: Arc<RwLock<Inner>>,
    chain_clients: Arc<ChainClients>,
    sinks: Arc<Sinks>,
    event_tx: mpsc::Sender<ContractEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<ContractEvent>>>,
    running: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ContractMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_depth);
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            config,
            inner: Arc::new(RwLock::new(Inner { contracts: IndexMap::new(), events: IndexMap::new() })),
            chain_clients: Arc::new(RwLock::new(BTreeMap::new())),
            sinks: Arc::new(RwLock::new(Vec::new())),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            running: Arc::new(AtomicBool::new(false)),
            stop_tx,
            stop_rx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Sender the Network Indexer fans ingestion-path events into.
    pub fn sender(&self) -> mpsc::Sender<ContractEvent> {
        self.event_tx.clone()
    }

    /// Called directly by the Network Indexer path (spec §4.F).
    pub fn handle_event(&self, event: ContractEvent) {
        let _ = self.event_tx.try_send(event);
    }

    /// Registers a downstream consumer of monitor events (Alert Manager,
    /// CDC Bridge). Each dispatched event is offered to every subscriber;
    /// a full subscriber channel just drops it (that consumer's policy).
    pub async fn subscribe(&self, sink: mpsc::Sender<ContractEvent>) {
        self.sinks.write().await.push(sink);
    }

    pub async fn register_chain_client(&self, chain_id: u64, client: Arc<dyn ChainClient>) {
        self.chain_clients.write().await.insert(chain_id, client);
    }

    pub async fn add(&self, contract: Contract) -> Result<()> {
        let key = contract.key();
        let mut inner = self.inner.write().await;
        if inner.contracts.contains_key(&key) {
            return Err(CoreError::AlreadyExists(format!("contract {key:?} already monitored")));
        }
        inner.events.insert(key.clone(), VecDeque::new());
        inner.contracts.insert(key, contract);
        Ok(())
    }

    pub async fn remove(&self, key: &ContractKey) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .contracts
            .shift_remove(key)
            .ok_or_else(|| CoreError::NotFound(format!("contract {key:?}")))?;
        inner.events.shift_remove(key);
        Ok(())
    }

    pub async fn pause(&self, key: &ContractKey) -> Result<()> {
        self.set_status(key, ContractStatus::Paused).await
    }

    pub async fn resume(&self, key: &ContractKey) -> Result<()> {
        self.set_status(key, ContractStatus::Active).await
    }

    async fn set_status(&self, key: &ContractKey, status: ContractStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        let contract = inner.contracts.get_mut(key).ok_or_else(|| CoreError::NotFound(format!("contract {key:?}")))?;
        contract.status = status;
        Ok(())
    }

    /// Replaces user-editable fields (name, abi, poll_interval, tags);
    /// runtime-maintained fields (status, cached_balance, last_event_at,
    /// last_seen_block) are preserved from the existing entry.
    pub async fn update(&self, contract: Contract) -> Result<()> {
        let key = contract.key();
        let mut inner = self.inner.write().await;
        let existing = inner.contracts.get_mut(&key).ok_or_else(|| CoreError::NotFound(format!("contract {key:?}")))?;
        existing.name = contract.name;
        existing.abi = contract.abi;
        existing.poll_interval = contract.poll_interval;
        existing.tags = contract.tags;
        Ok(())
    }

    pub async fn list(&self) -> Vec<Contract> {
        self.inner.read().await.contracts.values().cloned().collect()
    }

    /// Cached balance for a monitored contract, read by the CDC Bridge's
    /// balance-sync ticker (spec §4.H) without touching the chain.
    pub async fn cached_balance(&self, key: &ContractKey) -> Option<chainlens_common::model::Wei> {
        self.inner.read().await.contracts.get(key).map(|c| c.cached_balance)
    }

    pub async fn get_events(&self, key: &ContractKey, limit: usize) -> Vec<ContractEvent> {
        let inner = self.inner.read().await;
        inner
            .events
            .get(key)
            .map(|q| q.iter().rev().take(limit).rev().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn get_recent_events(&self, limit: usize) -> Vec<ContractEvent> {
        let inner = self.inner.read().await;
        let mut all: Vec<ContractEvent> = inner.events.values().flat_map(|q| q.iter().cloned()).collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all.truncate(limit);
        all
    }

    pub async fn stats(&self) -> MonitorStats {
        let inner = self.inner.read().await;
        let mut stats = MonitorStats { total_contracts: inner.contracts.len(), ..Default::default() };
        for contract in inner.contracts.values() {
            *stats.by_chain.entry(contract.chain_id).or_insert(0) += 1;
            let label = match contract.status {
                ContractStatus::Active => "active",
                ContractStatus::Paused => "paused",
            };
            *stats.by_status.entry(label).or_insert(0) += 1;
        }
        stats.total_buffered_events = inner.events.values().map(|q| q.len()).sum();
        stats
    }

    /// Idempotent; spawns the poll loop and event pump.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_tx.send_replace(false);

        let mut handles = Vec::new();

        if let Some(event_rx) = self.event_rx.lock().await.take() {
            handles.push(tokio::spawn(event_pump(
                event_rx,
                self.sinks.clone(),
                self.inner.clone(),
                self.config.max_events_per_contract,
                self.stop_rx.clone(),
            )));
        }

        handles.push(tokio::spawn(poll_loop(
            self.config.clone(),
            self.inner.clone(),
            self.chain_clients.clone(),
            self.event_tx.clone(),
            self.stop_rx.clone(),
        )));

        *self.handles.lock().await = handles;
    }

    /// Idempotent; no drain (spec §5).
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.send(true);
        self.handles.lock().await.clear();
    }
}

async fn event_pump(
    mut event_rx: mpsc::Receiver<ContractEvent>,
    sinks: Arc<Sinks>,
    inner: Arc<RwLock<Inner>>,
    max_events_per_contract: usize,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            next = event_rx.recv() => {
                let Some(event) = next else { break };

                for sink in sinks.read().await.iter() {
                    let _ = sink.try_send(event.clone());
                }

                let key = ContractKey::new(event.contract_address.clone(), event.chain_id);
                let mut inner = inner.write().await;
                if let Some(contract) = inner.contracts.get_mut(&key) {
                    contract.last_event_at = Some(event.timestamp);
                }
                let queue = inner.events.entry(key).or_default();
                if queue.len() >= max_events_per_contract {
                    queue.pop_front();
                }
                queue.push_back(event);
            }
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
}

async fn poll_loop(
    config: MonitorConfig,
    inner: Arc<RwLock<Inner>>,
    chain_clients: Arc<ChainClients>,
    event_tx: mpsc::Sender<ContractEvent>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.poll_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let active: Vec<Contract> = {
                    let inner = inner.read().await;
                    inner.contracts.values().filter(|c| c.status == ContractStatus::Active).cloned().collect()
                };

                for contract in active {
                    let Some(client) = chain_clients.read().await.get(&contract.chain_id).cloned() else {
                        continue;
                    };
                    poll_contract(&config, &inner, &client, &event_tx, contract).await;
                }
            }
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
}

async fn poll_contract(
    config: &MonitorConfig,
    inner: &Arc<RwLock<Inner>>,
    client: &Arc<dyn ChainClient>,
    event_tx: &mpsc::Sender<ContractEvent>,
    contract: Contract,
) {
    let key = contract.key();

    match tokio::time::timeout(config.balance_timeout, client.get_balance(&contract.address)).await {
        Ok(Ok(balance)) => {
            if let Some(c) = inner.write().await.contracts.get_mut(&key) {
                c.cached_balance = balance;
            }
        }
        Ok(Err(e)) => warn!("balance poll failed for {}: {e}", contract.address),
        Err(_) => warn!("balance poll timed out for {}", contract.address),
    }

    let tip = match client.get_block_number().await {
        Ok(tip) => tip,
        Err(e) => {
            warn!("chain tip fetch failed while polling {}: {e}", contract.address);
            return;
        }
    };
    let from_block = (contract.last_seen_block as u64) + 1;
    if from_block > tip {
        return;
    }

    let filter = LogFilter { from_block, to_block: tip, address: Some(contract.address.clone()), topics: Vec::new() };
    let logs = match client.get_logs(filter).await {
        Ok(logs) => logs,
        Err(e) => {
            warn!("log poll failed for {}: {e}", contract.address);
            return;
        }
    };

    for raw in &logs {
        let log = translate_log(contract.chain_id, raw);
        let event_name = log.decoded_name.clone().unwrap_or_default();
        let transfer_kind = classify_transfer_event(&event_name, &log.decoded_args);
        let event = ContractEvent {
            chain_id: contract.chain_id,
            contract_address: log.contract_address.clone(),
            tx_hash: log.tx_hash.clone(),
            log_index: log.log_index,
            block_number: log.block_number,
            event_name,
            topics: [&log.topic0, &log.topic1, &log.topic2, &log.topic3]
                .into_iter()
                .filter_map(|t| t.clone())
                .collect(),
            data: log.data.clone(),
            decoded_args: log.decoded_args.clone(),
            timestamp: log.timestamp,
            transfer_kind,
        };
        let _ = event_tx.try_send(event);
    }

    if let Some(c) = inner.write().await.contracts.get_mut(&key) {
        c.last_seen_block = tip as i64;
    }
}
