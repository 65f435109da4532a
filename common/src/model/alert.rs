use crate::time::TimestampMillis;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertRuleType {
    Event,
    LargeTransfer,
    FailedTx,
    GasSpike,
    LowBalance,
    HighBalance,
}

impl AlertRuleType {
    /// Fixed severity mapping (spec §4.G).
    pub fn severity(self) -> Severity {
        match self {
            AlertRuleType::LowBalance => Severity::Critical,
            AlertRuleType::LargeTransfer => Severity::High,
            AlertRuleType::FailedTx => Severity::Medium,
            AlertRuleType::GasSpike => Severity::Low,
            AlertRuleType::Event | AlertRuleType::HighBalance => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertCondition {
    /// Used by `event` rules: the exact event name to match.
    pub event_name: Option<String>,
    /// Ether-denominated threshold used by `large_transfer`, `gas_spike`
    /// (wei-denominated there, see §4.G), `low_balance`, `high_balance`.
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub rule_type: AlertRuleType,
    pub contract: Option<String>,
    pub chain_id: Option<u64>,
    pub condition: AlertCondition,
    pub channels: Vec<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    Open,
    Acknowledged,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub alert_type: AlertRuleType,
    pub severity: Severity,
    pub status: AlertStatus,
    pub fired_at: TimestampMillis,
    pub acked_by: Option<String>,
    pub acked_at: Option<TimestampMillis>,
    pub message: String,
    pub data: serde_json::Value,
}

impl Alert {
    /// `open -> acknowledged -> closed`; no other edges (spec §3 inv. 5,
    /// §8 quantified invariant 4).
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        matches!(
            (self.status, next),
            (AlertStatus::Open, AlertStatus::Acknowledged)
                | (AlertStatus::Open, AlertStatus::Closed)
                | (AlertStatus::Acknowledged, AlertStatus::Closed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_mapping_is_fixed() {
        assert_eq!(AlertRuleType::LowBalance.severity(), Severity::Critical);
        assert_eq!(AlertRuleType::LargeTransfer.severity(), Severity::High);
        assert_eq!(AlertRuleType::FailedTx.severity(), Severity::Medium);
        assert_eq!(AlertRuleType::GasSpike.severity(), Severity::Low);
        assert_eq!(AlertRuleType::Event.severity(), Severity::Info);
        assert_eq!(AlertRuleType::HighBalance.severity(), Severity::Info);
    }

    #[test]
    fn closed_is_terminal() {
        let alert = Alert {
            id: "a1".into(),
            rule_id: "r1".into(),
            alert_type: AlertRuleType::Event,
            severity: Severity::Info,
            status: AlertStatus::Closed,
            fired_at: 0,
            acked_by: None,
            acked_at: None,
            message: String::new(),
            data: serde_json::Value::Null,
        };
        assert!(!alert.can_transition_to(AlertStatus::Open));
        assert!(!alert.can_transition_to(AlertStatus::Acknowledged));
    }
}
