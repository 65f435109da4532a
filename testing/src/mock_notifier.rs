//! A recording `Notifier` double.

use async_trait::async_trait;
use chainlens_common::model::Alert;
use chainlens_common::traits::Notifier;
use std::sync::Mutex;

#[derive(Default)]
pub struct MockNotifier {
    received: Mutex<Vec<Alert>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<Alert> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, alert: &Alert) -> anyhow::Result<()> {
        self.received.lock().unwrap().push(alert.clone());
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "mock"
    }
}
