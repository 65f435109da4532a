//! Per-network ingestion loop (spec §4.D): a poller task discovers
//! confirmed block numbers, a processor task fetches, normalizes and
//! stores each one, then fans its events out to the Contract Monitor's
//! event channel.

use chainlens_common::config::NetworkIndexerConfig;
use chainlens_common::model::{classify_transfer_event, ContractEvent, EventLog, LogFilter};
use chainlens_common::traits::{ChainClient, IndexedStore};
use chainlens_common::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::explorer::{translate_block, translate_log};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Syncing,
    Synced,
    Stopped,
    Error,
}

#[derive(Debug, Clone)]
pub struct NetworkStatus {
    pub running: bool,
    pub last_block: u64,
    pub sync_status: SyncStatus,
}

struct State {
    last_block: Mutex<u64>,
    last_tip: Mutex<u64>,
    last_error: Mutex<Option<String>>,
}

/// Owns the poller/processor pair for a single network. Cheap to
/// construct; `start`/`stop` are idempotent (spec §4.E semantics apply
/// equally at this layer).
pub struct NetworkIndexer {
    config: NetworkIndexerConfig,
    chain: Arc<dyn ChainClient>,
    store: Arc<dyn IndexedStore>,
    event_sink: mpsc::Sender<ContractEvent>,
    state: Arc<State>,
    running: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl NetworkIndexer {
    pub fn new(
        config: NetworkIndexerConfig,
        chain: Arc<dyn ChainClient>,
        store: Arc<dyn IndexedStore>,
        event_sink: mpsc::Sender<ContractEvent>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            config,
            chain,
            store,
            event_sink,
            state: Arc::new(State {
                last_block: Mutex::new(0),
                last_tip: Mutex::new(0),
                last_error: Mutex::new(None),
            }),
            running: Arc::new(AtomicBool::new(false)),
            stop_tx,
            stop_rx,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn network_name(&self) -> &str {
        &self.config.network.name
    }

    /// Idempotent. Loads prior sync state (if any) so a restart resumes
    /// instead of re-walking from `start_block`.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.stop_tx.send_replace(false);

        let resume_from = match self.store.get_sync_state(&self.config.network.name).await? {
            Some(s) if s.last_indexed_block > 0 => s.last_indexed_block as u64,
            _ => self.config.start_block.saturating_sub(1),
        };
        *self.state.last_block.lock().await = resume_from;

        let (queue_tx, queue_rx) = mpsc::channel::<u64>(self.config.queue_depth);

        let poller = tokio::spawn(poller_loop(
            self.config.clone(),
            self.chain.clone(),
            self.state.clone(),
            queue_tx,
            self.stop_rx.clone(),
        ));
        let processor = tokio::spawn(processor_loop(
            self.chain.clone(),
            self.store.clone(),
            self.event_sink.clone(),
            self.state.clone(),
            queue_rx,
            self.stop_rx.clone(),
        ));

        *self.handles.lock().await = vec![poller, processor];
        Ok(())
    }

    /// Idempotent; no drain (spec §5): in-flight work is abandoned.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.send(true);
        self.handles.lock().await.clear();
    }

    pub async fn status(&self) -> NetworkStatus {
        let running = self.running.load(Ordering::SeqCst);
        let last_block = *self.state.last_block.lock().await;
        let last_tip = *self.state.last_tip.lock().await;
        let has_error = self.state.last_error.lock().await.is_some();

        let sync_status = if !running {
            SyncStatus::Stopped
        } else if has_error {
            SyncStatus::Error
        } else if last_tip > last_block {
            SyncStatus::Syncing
        } else {
            SyncStatus::Synced
        };

        NetworkStatus { running, last_block, sync_status }
    }
}

async fn poller_loop(
    config: NetworkIndexerConfig,
    chain: Arc<dyn ChainClient>,
    state: Arc<State>,
    queue_tx: mpsc::Sender<u64>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.block_time);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let tip = match chain.get_block_number().await {
                    Ok(tip) => tip,
                    Err(e) => {
                        warn!("{}: failed to fetch chain tip: {e}", config.network.name);
                        continue;
                    }
                };
                let confirmed = tip.saturating_sub(config.confirmations);
                *state.last_tip.lock().await = confirmed;

                let from = *state.last_block.lock().await + 1;
                for b in from..=confirmed {
                    if queue_tx.try_send(b).is_err() {
                        // queue full: drop silently, last_block hasn't moved so the
                        // next poll re-offers everything from `from` onward.
                        break;
                    }
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

async fn processor_loop(
    chain: Arc<dyn ChainClient>,
    store: Arc<dyn IndexedStore>,
    event_sink: mpsc::Sender<ContractEvent>,
    state: Arc<State>,
    mut queue_rx: mpsc::Receiver<u64>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            next = queue_rx.recv() => {
                let Some(b) = next else { break };
                match process_one(chain.as_ref(), store.as_ref(), &event_sink, b).await {
                    Ok(()) => {
                        let mut last_block = state.last_block.lock().await;
                        *last_block = (*last_block).max(b);
                        *state.last_error.lock().await = None;
                    }
                    Err(e) => {
                        error!("failed to index block {b}: {e}");
                        *state.last_error.lock().await = Some(e.to_string());
                    }
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

async fn process_one(
    chain: &dyn ChainClient,
    store: &dyn IndexedStore,
    event_sink: &mpsc::Sender<ContractEvent>,
    number: u64,
) -> Result<()> {
    let payload = chain.get_block(number).await?;
    let raw_logs = chain
        .get_logs(LogFilter { from_block: number, to_block: number, address: None, topics: Vec::new() })
        .await?;

    let (block, txs, _) = translate_block(&payload);
    let logs: Vec<EventLog> = raw_logs.iter().map(|l| translate_log(payload.chain_id, l)).collect();

    store.index_block(block, txs, logs.clone()).await?;
    metrics::counter!("blocks_indexed_total").increment(1);

    for log in &logs {
        let event_name = log.decoded_name.clone().unwrap_or_default();
        let transfer_kind = classify_transfer_event(&event_name, &log.decoded_args);
        let event = ContractEvent {
            chain_id: payload.chain_id,
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
        // monitor-owned channel: drop on full (spec §4.F event channel).
        let _ = event_sink.try_send(event);
    }

    Ok(())
}
