//! A notification channel an `AlertRule` can target (spec §6). Notifier
//! failures are logged by the caller, never propagated (spec §7): the
//! failure type is `anyhow::Error` rather than `CoreError` to keep
//! arbitrary implementor errors (webhook timeouts, SMTP failures, ...) at
//! this boundary without forcing them into the core taxonomy.

use crate::model::Alert;
use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, alert: &Alert) -> anyhow::Result<()>;

    /// Channel kind, e.g. `"slack"`, `"webhook"`, `"email"` — for logging.
    fn kind(&self) -> &'static str;
}
