//! A recording `CdcClient` double. Can be told to fail the next N
//! publishes, to exercise the CDC Bridge's at-most-once failure path.

use async_trait::async_trait;
use chainlens_common::model::CdcEvent;
use chainlens_common::{CoreError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockCdcClient {
    published: Mutex<Vec<CdcEvent>>,
    batches: Mutex<Vec<Vec<CdcEvent>>>,
    fail_next: AtomicUsize,
}

impl MockCdcClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` publish/batch_publish calls return an error instead
    /// of recording anything.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<CdcEvent> {
        self.published.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<Vec<CdcEvent>> {
        self.batches.lock().unwrap().clone()
    }

    fn take_failure(&self) -> bool {
        let mut remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining == 0 {
            return false;
        }
        remaining -= 1;
        self.fail_next.store(remaining, Ordering::SeqCst);
        true
    }
}

#[async_trait]
impl chainlens_common::traits::CdcClient for MockCdcClient {
    async fn publish_event(&self, event: CdcEvent) -> Result<()> {
        if self.take_failure() {
            return Err(CoreError::Transport(anyhow::anyhow!("mock cdc client: forced publish failure")));
        }
        self.published.lock().unwrap().push(event);
        Ok(())
    }

    async fn batch_publish(&self, events: Vec<CdcEvent>) -> Result<()> {
        if self.take_failure() {
            return Err(CoreError::Transport(anyhow::anyhow!("mock cdc client: forced batch failure")));
        }
        self.batches.lock().unwrap().push(events);
        Ok(())
    }

    async fn create_table(&self, _database: &str, _table: &str, _schema: serde_json::Value) -> Result<()> {
        Ok(())
    }
}
