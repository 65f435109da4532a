pub mod address;
pub mod alert;
pub mod bigint;
pub mod block;
pub mod cdc;
pub mod contract;
pub mod event_log;
pub mod network;
pub mod pagination;
pub mod sync_state;
pub mod transaction;

pub use address::Address;
pub use alert::{Alert, AlertCondition, AlertRule, AlertRuleType, AlertStatus, Severity};
pub use bigint::Wei;
pub use block::{Block, BlockPayload, RawTransaction};
pub use cdc::{CdcEvent, CdcOperation, CdcSyncConfig, EventMapping, CDC_SOURCE};
pub use contract::{classify_transfer, classify_transfer_event, Contract, ContractKey, ContractStatus, TransferKind};
pub use event_log::{ContractEvent, EventLog, LogFilter, RawLog};
pub use network::{canonical_name, Network, SUPPORTED_NETWORKS};
pub use pagination::{Page, PageRequest};
pub use sync_state::{NetworkStats, NetworkSyncState};
pub use transaction::{Transaction, TxStatus};
