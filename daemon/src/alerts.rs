//! Alert Manager (spec §4.G): matches incoming signals against rules,
//! materializes and stores Alerts, and dispatches them to notifiers.
//! `Evaluate*` calls never block the caller — they enqueue onto a
//! bounded pending-task queue consumed by a worker pool.

use chainlens_common::config::AlertManagerConfig;
use chainlens_common::model::{Alert, AlertRule, AlertRuleType, AlertStatus, ContractEvent, TxStatus, Wei};
use chainlens_common::time::now_millis;
use chainlens_common::traits::Notifier;
use chainlens_common::{CoreError, Result};
use futures::FutureExt;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

const ONE_HOUR_MILLIS: u64 = 3_600_000;

/// Input shape for `EvaluateTransaction`. Distinct from the persisted
/// `Transaction` row: rule matching needs `chain_id`, which the store
/// entity tracks only indirectly via network name.
#[derive(Debug, Clone)]
pub struct TxSignal {
    pub chain_id: u64,
    pub tx_hash: String,
    pub to: Option<String>,
    pub contract_address: Option<String>,
    pub value: Wei,
    pub gas_used: Option<i64>,
    pub status: Option<TxStatus>,
}

enum PendingTask {
    Event(ContractEvent),
    Transaction(TxSignal),
    Balance { address: String, chain_id: u64, balance: Wei },
}

#[derive(Debug, Clone, Default)]
pub struct AlertStats {
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_type: BTreeMap<&'static str, usize>,
    pub by_severity: BTreeMap<&'static str, usize>,
    pub fired_last_hour: usize,
}

type RuleMap = RwLock<IndexMap<String, AlertRule>>;
type AlertMap = RwLock<IndexMap<String, Alert>>;
type NotifierMap = RwLock<BTreeMap<String, Arc<dyn Notifier>>>;

pub struct AlertManager {
    config: AlertManagerConfig,
    rules: Arc<RuleMap>,
    alerts: Arc<AlertMap>,
    notifiers: Arc<NotifierMap>,
    task_tx: mpsc::Sender<PendingTask>,
    task_rx: Arc<Mutex<mpsc::Receiver<PendingTask>>>,
    next_alert_id: Arc<AtomicU64>,
    next_rule_id: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl AlertManager {
    pub fn new(config: AlertManagerConfig) -> Self {
        let (task_tx, task_rx) = mpsc::channel(config.pending_queue_depth);
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            config,
            rules: Arc::new(RwLock::new(IndexMap::new())),
            alerts: Arc::new(RwLock::new(IndexMap::new())),
            notifiers: Arc::new(RwLock::new(BTreeMap::new())),
            task_tx,
            task_rx: Arc::new(Mutex::new(task_rx)),
            next_alert_id: Arc::new(AtomicU64::new(1)),
            next_rule_id: Arc::new(AtomicU64::new(1)),
            running: Arc::new(AtomicBool::new(false)),
            stop_tx,
            stop_rx,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub async fn register_notifier(&self, channel: impl Into<String>, notifier: Arc<dyn Notifier>) {
        self.notifiers.write().await.insert(channel.into(), notifier);
    }

    pub async fn add_rule(&self, mut rule: AlertRule) -> String {
        if rule.id.is_empty() {
            rule.id = format!("rule-{}", self.next_rule_id.fetch_add(1, Ordering::SeqCst));
        }
        let id = rule.id.clone();
        self.rules.write().await.insert(id.clone(), rule);
        id
    }

    pub async fn update_rule(&self, rule: AlertRule) -> Result<()> {
        let mut rules = self.rules.write().await;
        if !rules.contains_key(&rule.id) {
            return Err(CoreError::NotFound(format!("rule {}", rule.id)));
        }
        rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    pub async fn remove_rule(&self, id: &str) -> Result<()> {
        self.rules
            .write()
            .await
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("rule {id}")))
    }

    pub async fn list_rules(&self) -> Vec<AlertRule> {
        self.rules.read().await.values().cloned().collect()
    }

    /// Enqueues onto the pending-task queue; drops silently if full
    /// (spec §4.G is explicit that `Evaluate*` never blocks).
    pub fn evaluate_event(&self, event: ContractEvent) {
        let _ = self.task_tx.try_send(PendingTask::Event(event));
    }

    pub fn evaluate_transaction(&self, tx: TxSignal) {
        let _ = self.task_tx.try_send(PendingTask::Transaction(tx));
    }

    pub fn evaluate_balance(&self, address: String, chain_id: u64, balance: Wei) {
        let _ = self.task_tx.try_send(PendingTask::Balance { address, chain_id, balance });
    }

    pub async fn acknowledge_alert(&self, id: &str, actor: &str) -> Result<()> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("alert {id}")))?;
        if !alert.can_transition_to(AlertStatus::Acknowledged) {
            return Err(CoreError::Internal(format!(
                "alert {id} cannot transition from {:?} to acknowledged",
                alert.status
            )));
        }
        alert.status = AlertStatus::Acknowledged;
        alert.acked_by = Some(actor.to_string());
        alert.acked_at = Some(now_millis());
        Ok(())
    }

    pub async fn close_alert(&self, id: &str) -> Result<()> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("alert {id}")))?;
        if !alert.can_transition_to(AlertStatus::Closed) {
            return Err(CoreError::Internal(format!("alert {id} cannot transition from {:?} to closed", alert.status)));
        }
        alert.status = AlertStatus::Closed;
        Ok(())
    }

    pub async fn get_alert(&self, id: &str) -> Option<Alert> {
        self.alerts.read().await.get(id).cloned()
    }

    pub async fn list_alerts(&self) -> Vec<Alert> {
        self.alerts.read().await.values().cloned().collect()
    }

    pub async fn stats(&self) -> AlertStats {
        let alerts = self.alerts.read().await;
        let mut stats = AlertStats { total: alerts.len(), ..Default::default() };
        let cutoff = now_millis().saturating_sub(ONE_HOUR_MILLIS);
        for alert in alerts.values() {
            *stats.by_status.entry(status_label(alert.status)).or_insert(0) += 1;
            *stats.by_type.entry(type_label(alert.alert_type)).or_insert(0) += 1;
            *stats.by_severity.entry(severity_label(alert.severity)).or_insert(0) += 1;
            if alert.fired_at >= cutoff {
                stats.fired_last_hour += 1;
            }
        }
        stats
    }

    /// Idempotent; spawns `config.worker_count` pending-task workers.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_tx.send_replace(false);

        let mut handles = Vec::with_capacity(self.config.worker_count);
        for _ in 0..self.config.worker_count {
            handles.push(tokio::spawn(worker_loop(
                self.task_rx.clone(),
                self.rules.clone(),
                self.alerts.clone(),
                self.notifiers.clone(),
                self.next_alert_id.clone(),
                self.stop_rx.clone(),
            )));
        }
        *self.handles.lock().await = handles;
    }

    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.send(true);
        self.handles.lock().await.clear();
    }
}

fn status_label(status: AlertStatus) -> &'static str {
    match status {
        AlertStatus::Open => "open",
        AlertStatus::Acknowledged => "acknowledged",
        AlertStatus::Closed => "closed",
    }
}

fn type_label(rule_type: AlertRuleType) -> &'static str {
    match rule_type {
        AlertRuleType::Event => "event",
        AlertRuleType::LargeTransfer => "large_transfer",
        AlertRuleType::FailedTx => "failed_tx",
        AlertRuleType::GasSpike => "gas_spike",
        AlertRuleType::LowBalance => "low_balance",
        AlertRuleType::HighBalance => "high_balance",
    }
}

fn severity_label(severity: chainlens_common::model::Severity) -> &'static str {
    use chainlens_common::model::Severity;
    match severity {
        Severity::Critical => "critical",
        Severity::High => "high",
        Severity::Medium => "medium",
        Severity::Low => "low",
        Severity::Info => "info",
    }
}

fn optional_filter_matches(rule: &AlertRule, chain_id: u64, contract: Option<&str>) -> bool {
    if let Some(rule_chain) = rule.chain_id {
        if rule_chain != chain_id {
            return false;
        }
    }
    if let Some(rule_contract) = &rule.contract {
        match contract {
            Some(c) if rule_contract == c => {}
            _ => return false,
        }
    }
    true
}

fn matches_event(rule: &AlertRule, event: &ContractEvent) -> bool {
    rule.chain_id == Some(event.chain_id)
        && rule.contract.as_deref() == Some(event.contract_address.as_str())
        && rule.condition.event_name.as_deref() == Some(event.event_name.as_str())
}

fn matches_large_transfer(rule: &AlertRule, tx: &TxSignal) -> bool {
    let Some(threshold) = rule.condition.threshold else { return false };
    tx.value >= Wei::from_ether(threshold)
        && optional_filter_matches(rule, tx.chain_id, tx.contract_address.as_deref().or(tx.to.as_deref()))
}

fn matches_failed_tx(rule: &AlertRule, tx: &TxSignal) -> bool {
    tx.status == Some(TxStatus::Failure)
        && optional_filter_matches(rule, tx.chain_id, tx.contract_address.as_deref().or(tx.to.as_deref()))
}

fn matches_gas_spike(rule: &AlertRule, tx: &TxSignal) -> bool {
    let (Some(threshold), Some(gas_used)) = (rule.condition.threshold, tx.gas_used) else { return false };
    (gas_used as f64) > threshold
        && optional_filter_matches(rule, tx.chain_id, tx.contract_address.as_deref().or(tx.to.as_deref()))
}

fn matches_low_balance(rule: &AlertRule, address: &str, chain_id: u64, balance: Wei) -> bool {
    let Some(threshold) = rule.condition.threshold else { return false };
    rule.contract.as_deref() == Some(address)
        && balance < Wei::from_ether(threshold)
        && rule.chain_id.map_or(true, |c| c == chain_id)
}

fn matches_high_balance(rule: &AlertRule, address: &str, chain_id: u64, balance: Wei) -> bool {
    let Some(threshold) = rule.condition.threshold else { return false };
    balance > Wei::from_ether(threshold) && optional_filter_matches(rule, chain_id, Some(address))
}

async fn worker_loop(
    task_rx: Arc<Mutex<mpsc::Receiver<PendingTask>>>,
    rules: Arc<RuleMap>,
    alerts: Arc<AlertMap>,
    notifiers: Arc<NotifierMap>,
    next_alert_id: Arc<AtomicU64>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        let task = {
            let mut rx = task_rx.lock().await;
            tokio::select! {
                task = rx.recv() => task,
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        None
                    } else {
                        continue;
                    }
                }
            }
        };
        let Some(task) = task else { break };

        let outcome = AssertUnwindSafe(process_task(&rules, &alerts, &notifiers, &next_alert_id, task))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            error!("alert worker task panicked; continuing");
        }
    }
}

async fn process_task(
    rules: &Arc<RuleMap>,
    alerts: &Arc<AlertMap>,
    notifiers: &Arc<NotifierMap>,
    next_alert_id: &Arc<AtomicU64>,
    task: PendingTask,
) {
    let rules = rules.read().await;
    match task {
        PendingTask::Event(event) => {
            for rule in rules.values().filter(|r| r.enabled && r.rule_type == AlertRuleType::Event) {
                if matches_event(rule, &event) {
                    let message = format!("event {} fired on {}", event.event_name, event.contract_address);
                    let data = serde_json::json!({
                        "tx_hash": event.tx_hash,
                        "block_number": event.block_number,
                        "log_index": event.log_index,
                    });
                    fire_alert(rule, AlertRuleType::Event, message, data, alerts, notifiers, next_alert_id).await;
                }
            }
        }
        PendingTask::Transaction(tx) => {
            for rule in rules.values().filter(|r| r.enabled) {
                let fires = match rule.rule_type {
                    AlertRuleType::LargeTransfer => matches_large_transfer(rule, &tx),
                    AlertRuleType::FailedTx => matches_failed_tx(rule, &tx),
                    AlertRuleType::GasSpike => matches_gas_spike(rule, &tx),
                    _ => false,
                };
                if fires {
                    let message = format!("{} matched tx {}", type_label(rule.rule_type), tx.tx_hash);
                    let data = serde_json::json!({ "tx_hash": tx.tx_hash, "value": tx.value.to_string() });
                    fire_alert(rule, rule.rule_type, message, data, alerts, notifiers, next_alert_id).await;
                }
            }
        }
        PendingTask::Balance { address, chain_id, balance } => {
            for rule in rules.values().filter(|r| r.enabled) {
                let fires = match rule.rule_type {
                    AlertRuleType::LowBalance => matches_low_balance(rule, &address, chain_id, balance),
                    AlertRuleType::HighBalance => matches_high_balance(rule, &address, chain_id, balance),
                    _ => false,
                };
                if fires {
                    let message = format!("{} for {address}", type_label(rule.rule_type));
                    let data = serde_json::json!({ "address": address, "balance": balance.to_string() });
                    fire_alert(rule, rule.rule_type, message, data, alerts, notifiers, next_alert_id).await;
                }
            }
        }
    }
}

async fn fire_alert(
    rule: &AlertRule,
    alert_type: AlertRuleType,
    message: String,
    data: serde_json::Value,
    alerts: &Arc<AlertMap>,
    notifiers: &Arc<NotifierMap>,
    next_alert_id: &Arc<AtomicU64>,
) {
    let id = format!("alert-{}", next_alert_id.fetch_add(1, Ordering::SeqCst));
    let alert = Alert {
        id: id.clone(),
        rule_id: rule.id.clone(),
        alert_type,
        severity: alert_type.severity(),
        status: AlertStatus::Open,
        fired_at: now_millis(),
        acked_by: None,
        acked_at: None,
        message,
        data,
    };
    alerts.write().await.insert(id.clone(), alert.clone());
    metrics::counter!("alerts_fired_total").increment(1);

    let notifiers = notifiers.read().await;
    for channel in &rule.channels {
        match notifiers.get(channel) {
            Some(notifier) => {
                if let Err(e) = notifier.send(&alert).await {
                    warn!("notifier {} failed for alert {id}: {e}", notifier.kind());
                }
            }
            None => warn!("rule {} references unknown notifier channel {channel}", rule.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chainlens_common::model::AlertCondition;
    use std::time::Duration;

    struct RecordingNotifier(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, alert: &Alert) -> anyhow::Result<()> {
            self.0.lock().await.push(alert.id.clone());
            Ok(())
        }
        fn kind(&self) -> &'static str {
            "recording"
        }
    }

    fn rule(rule_type: AlertRuleType, chain_id: Option<u64>, contract: Option<&str>, threshold: Option<f64>) -> AlertRule {
        AlertRule {
            id: String::new(),
            rule_type,
            contract: contract.map(str::to_string),
            chain_id,
            condition: AlertCondition { event_name: None, threshold },
            channels: vec!["default".into()],
            enabled: true,
        }
    }

    #[tokio::test]
    async fn large_transfer_scenario_fires_one_high_severity_alert() {
        let manager = AlertManager::new(AlertManagerConfig::default());
        let sent = Arc::new(Mutex::new(Vec::new()));
        manager.register_notifier("default", Arc::new(RecordingNotifier(sent.clone()))).await;
        manager.add_rule(rule(AlertRuleType::LargeTransfer, Some(1), None, Some(1.0))).await;
        manager.start().await;

        manager.evaluate_transaction(TxSignal {
            chain_id: 1,
            tx_hash: "0xtx".into(),
            to: Some("0xbbb".into()),
            contract_address: None,
            value: Wei::from_ether(2.0),
            gas_used: Some(21000),
            status: Some(TxStatus::Success),
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.stop().await;

        let alerts = manager.list_alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, chainlens_common::model::Severity::High);
        assert_eq!(alerts[0].status, AlertStatus::Open);
        assert_eq!(sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn low_balance_boundary_is_strict() {
        let manager = AlertManager::new(AlertManagerConfig::default());
        manager.add_rule(rule(AlertRuleType::LowBalance, Some(1), Some("0x123"), Some(1.0))).await;
        manager.start().await;

        manager.evaluate_balance("0x123".into(), 1, Wei::from_ether(0.5));
        tokio::time::sleep(Duration::from_millis(30)).await;
        manager.evaluate_balance("0x123".into(), 1, Wei::from_ether(1.0));
        tokio::time::sleep(Duration::from_millis(30)).await;
        manager.stop().await;

        assert_eq!(manager.list_alerts().await.len(), 1);
    }

    #[tokio::test]
    async fn closed_alert_rejects_further_transitions() {
        let manager = AlertManager::new(AlertManagerConfig::default());
        manager.add_rule(rule(AlertRuleType::LargeTransfer, None, None, Some(0.1))).await;
        manager.start().await;
        manager.evaluate_transaction(TxSignal {
            chain_id: 1,
            tx_hash: "0xtx".into(),
            to: None,
            contract_address: None,
            value: Wei::from_ether(1.0),
            gas_used: None,
            status: Some(TxStatus::Success),
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        manager.stop().await;

        let id = manager.list_alerts().await[0].id.clone();
        manager.close_alert(&id).await.unwrap();
        let err = manager.acknowledge_alert(&id, "operator").await.unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }
}
