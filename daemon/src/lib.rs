//! The indexing pipeline: per-network ingestion, the contract monitor,
//! the alert manager, the CDC bridge and the explorer's translation
//! layer.

#[macro_use]
extern crate log;

pub mod alerts;
pub mod cdc_bridge;
pub mod explorer;
pub mod monitor;
pub mod network_indexer;
pub mod supervisor;
