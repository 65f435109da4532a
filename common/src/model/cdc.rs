use crate::time::TimestampMillis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CdcOperation {
    Insert,
    Upsert,
    Update,
    Delete,
}

/// Per-event-name projection rule within a `CdcSyncConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMapping {
    pub table: String,
    pub field_map: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdcSyncConfig {
    pub id: String,
    pub contract: String,
    pub chain_id: u64,
    pub target_database: String,
    pub enabled: bool,
    /// event name -> mapping.
    pub mappings: BTreeMap<String, EventMapping>,
    pub balance_sync: bool,
    pub created_at: TimestampMillis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdcEvent {
    pub operation: CdcOperation,
    pub database: String,
    pub table: String,
    pub data: serde_json::Map<String, serde_json::Value>,
    pub timestamp: TimestampMillis,
    pub source: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// `source` field stamped on every CDC event emitted by this pipeline.
pub const CDC_SOURCE: &str = "chainlens";
