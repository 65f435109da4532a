//! CDC Bridge (spec §4.H): the single subscriber translating Contract
//! Monitor events into CDC events for arbitrary downstream databases.
//! Delivery is at-most-once by design — a failed flush drops its batch
//! rather than retrying (spec §9 open question, preserved as-is).

use chainlens_common::config::CdcBridgeConfig;
use chainlens_common::model::{CdcEvent, CdcOperation, CdcSyncConfig, ContractEvent, ContractKey, CDC_SOURCE};
use chainlens_common::time::now_millis;
use chainlens_common::traits::CdcClient;
use chainlens_common::{CoreError, Result};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::monitor::ContractMonitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Running,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct ConfigStatus {
    pub events_processed: u64,
    pub errors: u64,
    pub last_sync_at: Option<u64>,
    pub last_error: Option<String>,
    pub status: SyncStatus,
}

type ConfigMap = RwLock<IndexMap<String, CdcSyncConfig>>;
type StatusMap = RwLock<BTreeMap<String, ConfigStatus>>;

pub struct CdcBridge {
    config: CdcBridgeConfig,
    cdc_client: Arc<dyn CdcClient>,
    monitor: Arc<ContractMonitor>,
    configs: Arc<ConfigMap>,
    status: Arc<StatusMap>,
    event_tx: mpsc::Sender<ContractEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<ContractEvent>>>,
    next_id: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl CdcBridge {
    pub fn new(config: CdcBridgeConfig, cdc_client: Arc<dyn CdcClient>, monitor: Arc<ContractMonitor>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_depth);
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            config,
            cdc_client,
            monitor,
            configs: Arc::new(RwLock::new(IndexMap::new())),
            status: Arc::new(RwLock::new(BTreeMap::new())),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            next_id: Arc::new(AtomicU64::new(1)),
            running: Arc::new(AtomicBool::new(false)),
            stop_tx,
            stop_rx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Passed to `ContractMonitor::subscribe` by whatever wires the
    /// pipeline together; the monitor drops on a full channel so this
    /// satisfies "bounded at 1000, on full silently dropped" on its own.
    pub fn sender(&self) -> mpsc::Sender<ContractEvent> {
        self.event_tx.clone()
    }

    pub async fn add_config(&self, mut config: CdcSyncConfig) -> String {
        if config.id.is_empty() {
            config.id = format!("cdc-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        }
        config.created_at = now_millis();
        let id = config.id.clone();
        self.configs.write().await.insert(id.clone(), config);
        self.status.write().await.insert(
            id.clone(),
            ConfigStatus { events_processed: 0, errors: 0, last_sync_at: None, last_error: None, status: SyncStatus::Running },
        );
        id
    }

    pub async fn pause_sync(&self, id: &str) -> Result<()> {
        self.set_enabled(id, false, SyncStatus::Stopped).await
    }

    pub async fn resume_sync(&self, id: &str) -> Result<()> {
        self.set_enabled(id, true, SyncStatus::Running).await
    }

    async fn set_enabled(&self, id: &str, enabled: bool, status: SyncStatus) -> Result<()> {
        let mut configs = self.configs.write().await;
        let config = configs.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("cdc config {id}")))?;
        config.enabled = enabled;
        drop(configs);
        if let Some(s) = self.status.write().await.get_mut(id) {
            s.status = status;
        }
        Ok(())
    }

    pub async fn delete_config(&self, id: &str) -> Result<()> {
        let removed = self.configs.write().await.shift_remove(id);
        self.status.write().await.remove(id);
        removed.map(|_| ()).ok_or_else(|| CoreError::NotFound(format!("cdc config {id}")))
    }

    pub async fn list_configs(&self) -> Vec<CdcSyncConfig> {
        self.configs.read().await.values().cloned().collect()
    }

    pub async fn get_status(&self, id: &str) -> Option<ConfigStatus> {
        self.status.read().await.get(id).cloned()
    }

    /// Idempotent; spawns the transform/batch task and the balance-sync
    /// ticker.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_tx.send_replace(false);

        let mut handles = Vec::new();
        if let Some(event_rx) = self.event_rx.lock().await.take() {
            handles.push(tokio::spawn(transform_batch_loop(
                event_rx,
                self.configs.clone(),
                self.status.clone(),
                self.cdc_client.clone(),
                self.config.batch_size,
                self.config.flush_interval,
                self.stop_rx.clone(),
            )));
        }
        handles.push(tokio::spawn(balance_sync_loop(
            self.configs.clone(),
            self.status.clone(),
            self.monitor.clone(),
            self.cdc_client.clone(),
            self.config.balance_sync_interval,
            self.stop_rx.clone(),
        )));

        *self.handles.lock().await = handles;
    }

    /// Idempotent; no drain (spec §5) — any buffered, unflushed batch is
    /// abandoned along with the at-most-once contract.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.send(true);
        self.handles.lock().await.clear();
    }
}

fn project(event: &ContractEvent, config: &CdcSyncConfig, mapping: &chainlens_common::model::EventMapping) -> CdcEvent {
    let mut data = serde_json::Map::new();
    for (src, dst) in &mapping.field_map {
        if let Some(value) = event.decoded_args.get(src) {
            data.insert(dst.clone(), value.clone());
        }
    }
    data.insert("tx_hash".into(), serde_json::Value::String(event.tx_hash.clone()));
    data.insert("block_number".into(), serde_json::json!(event.block_number));
    data.insert("log_index".into(), serde_json::json!(event.log_index));
    data.insert("timestamp".into(), serde_json::json!(event.timestamp));

    let metadata = serde_json::json!({
        "chain_id": event.chain_id,
        "contract_address": event.contract_address,
        "event_name": event.event_name,
    });
    let metadata = match metadata {
        serde_json::Value::Object(m) => m,
        _ => unreachable!(),
    };

    CdcEvent {
        operation: CdcOperation::Insert,
        database: config.target_database.clone(),
        table: mapping.table.clone(),
        data,
        timestamp: event.timestamp,
        source: CDC_SOURCE.to_string(),
        metadata,
    }
}

async fn transform_batch_loop(
    mut event_rx: mpsc::Receiver<ContractEvent>,
    configs: Arc<ConfigMap>,
    status: Arc<StatusMap>,
    cdc_client: Arc<dyn CdcClient>,
    batch_size: usize,
    flush_interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut buffer: Vec<(String, CdcEvent)> = Vec::new();
    let mut ticker = tokio::time::interval(flush_interval);
    loop {
        tokio::select! {
            next = event_rx.recv() => {
                let Some(event) = next else { break };
                let configs = configs.read().await;
                for (id, config) in configs.iter() {
                    if !config.enabled || config.contract != event.contract_address || config.chain_id != event.chain_id {
                        continue;
                    }
                    if let Some(mapping) = config.mappings.get(&event.event_name) {
                        buffer.push((id.clone(), project(&event, config, mapping)));
                    }
                }
                drop(configs);
                if buffer.len() >= batch_size {
                    flush(&mut buffer, &cdc_client, &status).await;
                }
            }
            _ = ticker.tick() => {
                if !buffer.is_empty() {
                    flush(&mut buffer, &cdc_client, &status).await;
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

async fn flush(buffer: &mut Vec<(String, CdcEvent)>, cdc_client: &Arc<dyn CdcClient>, status: &Arc<StatusMap>) {
    let batch = std::mem::take(buffer);
    let mut per_config: BTreeMap<String, u64> = BTreeMap::new();
    for (id, _) in &batch {
        *per_config.entry(id.clone()).or_insert(0) += 1;
    }
    let events: Vec<CdcEvent> = batch.into_iter().map(|(_, e)| e).collect();

    let now = now_millis();
    let result = cdc_client.batch_publish(events).await;
    let mut status = status.write().await;
    match result {
        Ok(()) => {
            let total: u64 = per_config.values().sum();
            metrics::counter!("cdc_events_published_total").increment(total);
            for (id, count) in per_config {
                if let Some(s) = status.get_mut(&id) {
                    s.events_processed += count;
                    s.last_sync_at = Some(now);
                }
            }
        }
        Err(e) => {
            metrics::counter!("cdc_publish_errors_total").increment(1);
            let message = e.to_string();
            for id in per_config.keys() {
                if let Some(s) = status.get_mut(id) {
                    s.errors += 1;
                    s.last_error = Some(message.clone());
                }
            }
        }
    }
}

async fn balance_sync_loop(
    configs: Arc<ConfigMap>,
    status: Arc<StatusMap>,
    monitor: Arc<ContractMonitor>,
    cdc_client: Arc<dyn CdcClient>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let targets: Vec<(String, CdcSyncConfig)> = configs
                    .read()
                    .await
                    .iter()
                    .filter(|(_, c)| c.enabled && c.balance_sync)
                    .map(|(id, c)| (id.clone(), c.clone()))
                    .collect();

                for (id, config) in targets {
                    let key = ContractKey::new(config.contract.clone(), config.chain_id);
                    let Some(balance) = monitor.cached_balance(&key).await else { continue };

                    let mut data = serde_json::Map::new();
                    data.insert("contract_address".into(), serde_json::Value::String(config.contract.clone()));
                    data.insert("chain_id".into(), serde_json::json!(config.chain_id));
                    data.insert("balance".into(), serde_json::Value::String(balance.to_string()));

                    let event = CdcEvent {
                        operation: CdcOperation::Upsert,
                        database: config.target_database.clone(),
                        table: "contract_balances".into(),
                        data,
                        timestamp: now_millis(),
                        source: CDC_SOURCE.to_string(),
                        metadata: serde_json::Map::new(),
                    };

                    let now = now_millis();
                    let result = cdc_client.publish_event(event).await;
                    let mut status = status.write().await;
                    match result {
                        Ok(()) => {
                            metrics::counter!("cdc_events_published_total").increment(1);
                            if let Some(s) = status.get_mut(&id) {
                                s.events_processed += 1;
                                s.last_sync_at = Some(now);
                            }
                        }
                        Err(e) => {
                            metrics::counter!("cdc_publish_errors_total").increment(1);
                            if let Some(s) = status.get_mut(&id) {
                                s.errors += 1;
                                s.last_error = Some(e.to_string());
                            }
                        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chainlens_common::config::MonitorConfig;
    use chainlens_common::model::EventMapping;
    use std::collections::BTreeMap as StdBTreeMap;
    use std::time::Duration as StdDuration;
    use tokio::sync::Mutex as TokioMutex;

    struct RecordingCdcClient {
        batches: Arc<TokioMutex<Vec<Vec<CdcEvent>>>>,
    }

    #[async_trait]
    impl CdcClient for RecordingCdcClient {
        async fn publish_event(&self, event: CdcEvent) -> Result<()> {
            self.batches.lock().await.push(vec![event]);
            Ok(())
        }
        async fn batch_publish(&self, events: Vec<CdcEvent>) -> Result<()> {
            self.batches.lock().await.push(events);
            Ok(())
        }
        async fn create_table(&self, _database: &str, _table: &str, _schema: serde_json::Value) -> Result<()> {
            Ok(())
        }
    }

    fn transfer_config(contract: &str) -> CdcSyncConfig {
        let mut mappings = StdBTreeMap::new();
        let mut field_map = StdBTreeMap::new();
        field_map.insert("from".to_string(), "sender".to_string());
        field_map.insert("to".to_string(), "receiver".to_string());
        field_map.insert("amount".to_string(), "value".to_string());
        mappings.insert("Transfer".to_string(), EventMapping { table: "transfers".into(), field_map });

        CdcSyncConfig {
            id: String::new(),
            contract: contract.to_string(),
            chain_id: 1,
            target_database: "analytics".into(),
            enabled: true,
            mappings,
            balance_sync: false,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn transfer_event_projects_to_mapped_fields_plus_standard_fields() {
        let batches = Arc::new(TokioMutex::new(Vec::new()));
        let cdc_client: Arc<dyn CdcClient> = Arc::new(RecordingCdcClient { batches: batches.clone() });
        let monitor = Arc::new(ContractMonitor::new(MonitorConfig::default()));

        let mut config = CdcBridgeConfig::default();
        config.flush_interval = StdDuration::from_millis(30);
        let bridge = CdcBridge::new(config, cdc_client, monitor);
        bridge.add_config(transfer_config("0xc0ntract")).await;
        bridge.start().await;

        let mut decoded_args = serde_json::Map::new();
        decoded_args.insert("from".into(), serde_json::Value::String("0x111".into()));
        decoded_args.insert("to".into(), serde_json::Value::String("0x222".into()));
        decoded_args.insert("amount".into(), serde_json::Value::String("1000".into()));

        bridge
            .sender()
            .send(ContractEvent {
                chain_id: 1,
                contract_address: "0xc0ntract".into(),
                tx_hash: "0xT".into(),
                log_index: 5,
                block_number: 42,
                event_name: "Transfer".into(),
                topics: Vec::new(),
                data: "0x".into(),
                decoded_args,
                timestamp: 1_700_000_000_000,
                transfer_kind: None,
            })
            .await
            .unwrap();

        tokio::time::sleep(StdDuration::from_millis(100)).await;
        bridge.stop().await;

        let batches = batches.lock().await;
        assert_eq!(batches.len(), 1);
        let event = &batches[0][0];
        assert_eq!(event.database, "analytics");
        assert_eq!(event.table, "transfers");
        assert_eq!(event.operation, CdcOperation::Insert);
        assert_eq!(event.data.get("sender").unwrap(), "0x111");
        assert_eq!(event.data.get("receiver").unwrap(), "0x222");
        assert_eq!(event.data.get("value").unwrap(), "1000");
        assert_eq!(event.data.get("tx_hash").unwrap(), "0xT");
        assert_eq!(event.data.get("block_number").unwrap(), 42);
        assert_eq!(event.data.get("log_index").unwrap(), 5);
    }

    #[tokio::test]
    async fn pause_then_delete_config() {
        let batches = Arc::new(TokioMutex::new(Vec::new()));
        let cdc_client: Arc<dyn CdcClient> = Arc::new(RecordingCdcClient { batches });
        let monitor = Arc::new(ContractMonitor::new(MonitorConfig::default()));
        let bridge = CdcBridge::new(CdcBridgeConfig::default(), cdc_client, monitor);

        let id = bridge.add_config(transfer_config("0xabc")).await;
        bridge.pause_sync(&id).await.unwrap();
        assert_eq!(bridge.get_status(&id).await.unwrap().status, SyncStatus::Stopped);
        assert!(!bridge.list_configs().await[0].enabled);

        bridge.delete_config(&id).await.unwrap();
        assert!(bridge.get_status(&id).await.is_none());
        assert!(bridge.delete_config(&id).await.is_err());
    }
}
