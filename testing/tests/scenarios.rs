//! End-to-end pipeline scenarios (spec §8 S1-S6), built on the mock
//! chain/CDC/notifier doubles plus the real in-memory store.

use chainlens_common::config::{AlertManagerConfig, CdcBridgeConfig, MonitorConfig, NetworkIndexerConfig};
use chainlens_common::model::{
    BlockPayload, CdcOperation, CdcSyncConfig, ContractEvent, EventMapping, Network, RawLog, RawTransaction,
    TxStatus, Wei,
};
use chainlens_common::traits::IndexedStore;
use chainlens_daemon::alerts::{AlertManager, TxSignal};
use chainlens_daemon::cdc_bridge::CdcBridge;
use chainlens_daemon::explorer;
use chainlens_daemon::monitor::ContractMonitor;
use chainlens_daemon::network_indexer::NetworkIndexer;
use chainlens_store_memory::MemoryStore;
use chainlens_testing::{MockCdcClient, MockChainClient};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn s1_block() -> (BlockPayload, Vec<RawLog>) {
    let block = BlockPayload {
        chain_id: 1,
        number: 100,
        hash: "0xblockhash100".into(),
        parent_hash: "0xblockhash99".into(),
        timestamp_secs: 1_700_000_000,
        miner: "0xMINER".into(),
        gas_used: 42_000,
        gas_limit: 30_000_000,
        base_fee: None,
        size: 2000,
        transactions: vec![
            RawTransaction {
                hash: "0xTX1".into(),
                index: 0,
                from: "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".into(),
                to: Some("0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB".into()),
                value: Wei::from_decimal_str("1000000000000000000").unwrap(),
                gas_limit: 21000,
                gas_used: Some(21000),
                gas_price: None,
                max_fee_per_gas: None,
                max_priority_fee_per_gas: None,
                input: "0x".into(),
                nonce: 0,
                tx_type: 0,
                status: Some(true),
                contract_address: None,
                error_message: None,
            },
            RawTransaction {
                hash: "0xTX2".into(),
                index: 1,
                from: "0xCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC".into(),
                to: Some("0xDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDD".into()),
                value: Wei::from_decimal_str("1").unwrap(),
                gas_limit: 21000,
                gas_used: Some(21000),
                gas_price: None,
                max_fee_per_gas: None,
                max_priority_fee_per_gas: None,
                input: "0x".into(),
                nonce: 0,
                tx_type: 0,
                status: Some(true),
                contract_address: None,
                error_message: None,
            },
        ],
    };
    let logs = vec![RawLog {
        tx_hash: "0xTX1".into(),
        log_index: 0,
        block_number: 100,
        address: "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB".into(),
        topics: vec!["0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef".into()],
        data: "0x".into(),
        timestamp_secs: 1_700_000_000,
        removed: false,
    }];
    (block, logs)
}

#[tokio::test]
async fn s1_block_ingestion_populates_every_entity() {
    let chain = Arc::new(MockChainClient::new(1));
    let (block, logs) = s1_block();
    chain.push_block(block, logs);

    let store: Arc<dyn IndexedStore> = Arc::new(MemoryStore::new());
    let (sink, _rx) = tokio::sync::mpsc::channel(16);

    let mut config = NetworkIndexerConfig::new(Network::new(1));
    config.block_time = Duration::from_millis(20);
    config.confirmations = 0;
    config.start_block = 100;

    let indexer = NetworkIndexer::new(config, chain, store.clone(), sink);
    indexer.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    indexer.stop().await;

    let block = store.get_block_by_number("ethereum", 100).await.unwrap().unwrap();
    assert_eq!(block.transaction_count, 2);

    let txs = store.get_transactions_by_block("ethereum", 100).await.unwrap();
    assert_eq!(txs.len(), 2);

    let sender = store
        .get_address("ethereum", "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sender.tx_count, 1);
    let receiver = store
        .get_address("ethereum", "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(receiver.tx_count, 1);

    let event_logs = store.get_transaction_logs("ethereum", "0xtx1").await.unwrap();
    assert_eq!(event_logs.len(), 1);

    let sync_state = store.get_sync_state("ethereum").await.unwrap().unwrap();
    assert_eq!(sync_state.last_indexed_block, 100);
}

#[tokio::test]
async fn s2_search_resolves_by_shape() {
    let store = MemoryStore::new();
    let (block, logs) = s1_block();
    let (block, txs, _) = explorer::translate_block(&block);
    let event_logs: Vec<_> = logs.iter().map(|l| explorer::translate_log(1, l)).collect();
    store.index_block(block, txs, event_logs).await.unwrap();

    let by_number = explorer::search(&store, "ethereum", "100").await.unwrap();
    assert_eq!(by_number.total, 1);
    assert_eq!(by_number.items[0].kind, explorer::SearchResultKind::Block);

    let by_address = explorer::search(&store, "ethereum", "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")
        .await
        .unwrap();
    assert_eq!(by_address.total, 1);
    assert_eq!(by_address.items[0].kind, explorer::SearchResultKind::Address);

    let empty = explorer::search(&store, "ethereum", "").await.unwrap();
    assert_eq!(empty.total, 0);
}

#[tokio::test]
async fn s3_large_transfer_alert_fires_once_at_high_severity() {
    let manager = AlertManager::new(AlertManagerConfig::default());
    manager
        .add_rule(chainlens_common::model::AlertRule {
            id: String::new(),
            rule_type: chainlens_common::model::AlertRuleType::LargeTransfer,
            contract: None,
            chain_id: Some(1),
            condition: chainlens_common::model::AlertCondition { event_name: None, threshold: Some(1.0) },
            channels: vec![],
            enabled: true,
        })
        .await;
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
    assert_eq!(alerts[0].alert_type, chainlens_common::model::AlertRuleType::LargeTransfer);
    assert_eq!(alerts[0].status, chainlens_common::model::AlertStatus::Open);
}

#[tokio::test]
async fn s4_low_balance_boundary_is_strict() {
    let manager = AlertManager::new(AlertManagerConfig::default());
    manager
        .add_rule(chainlens_common::model::AlertRule {
            id: String::new(),
            rule_type: chainlens_common::model::AlertRuleType::LowBalance,
            contract: Some("0x123".into()),
            chain_id: Some(1),
            condition: chainlens_common::model::AlertCondition { event_name: None, threshold: Some(1.0) },
            channels: vec![],
            enabled: true,
        })
        .await;
    manager.start().await;

    manager.evaluate_balance("0x123".into(), 1, Wei::from_decimal_str("500000000000000000").unwrap());
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(manager.list_alerts().await.len(), 1);

    manager.evaluate_balance("0x123".into(), 1, Wei::from_decimal_str("1000000000000000000").unwrap());
    tokio::time::sleep(Duration::from_millis(40)).await;
    manager.stop().await;

    assert_eq!(manager.list_alerts().await.len(), 1);
}

#[tokio::test]
async fn s5_cdc_projection_matches_literal_example() {
    let cdc_client = Arc::new(MockCdcClient::new());
    let monitor = Arc::new(ContractMonitor::new(MonitorConfig::default()));

    let mut config = CdcBridgeConfig::default();
    config.flush_interval = Duration::from_millis(20);
    let bridge = CdcBridge::new(config, cdc_client.clone(), monitor);

    let mut field_map = BTreeMap::new();
    field_map.insert("from".to_string(), "sender".to_string());
    field_map.insert("to".to_string(), "receiver".to_string());
    field_map.insert("amount".to_string(), "value".to_string());
    let mut mappings = BTreeMap::new();
    mappings.insert("Transfer".to_string(), EventMapping { table: "transfers".into(), field_map });

    bridge
        .add_config(CdcSyncConfig {
            id: String::new(),
            contract: "0xc".into(),
            chain_id: 1,
            target_database: "analytics".into(),
            enabled: true,
            mappings,
            balance_sync: false,
            created_at: 0,
        })
        .await;
    bridge.start().await;

    let mut decoded_args = serde_json::Map::new();
    decoded_args.insert("from".into(), serde_json::Value::String("0x111".into()));
    decoded_args.insert("to".into(), serde_json::Value::String("0x222".into()));
    decoded_args.insert("amount".into(), serde_json::Value::String("1000".into()));

    bridge
        .sender()
        .send(ContractEvent {
            chain_id: 1,
            contract_address: "0xc".into(),
            tx_hash: "0xT".into(),
            log_index: 7,
            block_number: 55,
            event_name: "Transfer".into(),
            topics: Vec::new(),
            data: "0x".into(),
            decoded_args,
            timestamp: 1_700_000_000_000,
            transfer_kind: None,
        })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;
    bridge.stop().await;

    let batches = cdc_client.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    let event = &batches[0][0];
    assert_eq!(event.operation, CdcOperation::Insert);
    assert_eq!(event.database, "analytics");
    assert_eq!(event.table, "transfers");
    assert_eq!(event.data.get("sender").unwrap(), "0x111");
    assert_eq!(event.data.get("receiver").unwrap(), "0x222");
    assert_eq!(event.data.get("value").unwrap(), "1000");
    assert_eq!(event.data.get("tx_hash").unwrap(), "0xT");
    assert_eq!(event.data.get("block_number").unwrap(), 55);
    assert_eq!(event.data.get("log_index").unwrap(), 7);
}

#[tokio::test]
async fn s6_replaying_a_block_is_idempotent() {
    let store = MemoryStore::new();
    let (block, logs) = s1_block();
    let (b, txs, _) = explorer::translate_block(&block);
    let event_logs: Vec<_> = logs.iter().map(|l| explorer::translate_log(1, l)).collect();

    store.index_block(b.clone(), txs.clone(), event_logs.clone()).await.unwrap();
    store.index_block(b, txs, event_logs).await.unwrap();

    let sender = store
        .get_address("ethereum", "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sender.tx_count, 1);

    let stored = store.get_block_by_number("ethereum", 100).await.unwrap().unwrap();
    assert_eq!(stored.transaction_count, 2);
    let logs = store.get_transaction_logs("ethereum", "0xtx1").await.unwrap();
    assert_eq!(logs.len(), 1);
}
