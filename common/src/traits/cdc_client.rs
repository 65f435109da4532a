//! Publish CDC events to an arbitrary downstream database (spec §4.C).
//! No ordering guarantees across batches; within a batch the client
//! preserves input order.

use crate::model::CdcEvent;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CdcClient: Send + Sync {
    async fn publish_event(&self, event: CdcEvent) -> Result<()>;

    async fn batch_publish(&self, events: Vec<CdcEvent>) -> Result<()>;

    async fn create_table(&self, database: &str, table: &str, schema: serde_json::Value) -> Result<()>;
}
