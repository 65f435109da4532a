use crate::model::bigint::Wei;
use crate::time::TimestampMillis;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractKey {
    pub address: String,
    pub chain_id: u64,
}

impl ContractKey {
    pub fn new(address: impl Into<String>, chain_id: u64) -> Self {
        Self { address: address.into().to_lowercase(), chain_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    Active,
    Paused,
}

/// A contract of interest to the Contract Monitor (spec §3, §4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub address: String,
    pub chain_id: u64,
    pub name: String,
    pub abi: String,
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,
    pub tags: Vec<String>,
    pub status: ContractStatus,
    pub cached_balance: Wei,
    pub last_event_at: Option<TimestampMillis>,
    /// Last block height this contract's logs were fetched up to.
    pub last_seen_block: i64,
}

impl Contract {
    pub fn key(&self) -> ContractKey {
        ContractKey::new(self.address.clone(), self.chain_id)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Mint/Burn classification (spec GLOSSARY, §8 boundary behavior).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Mint,
    Burn,
    Transfer,
}

pub fn is_zero_address(address: &str) -> bool {
    let hex = address.strip_prefix("0x").unwrap_or(address);
    !hex.is_empty() && hex.chars().all(|c| c == '0')
}

pub fn classify_transfer(from: &str, to: &str) -> TransferKind {
    match (is_zero_address(from), is_zero_address(to)) {
        (true, _) => TransferKind::Mint,
        (_, true) => TransferKind::Burn,
        _ => TransferKind::Transfer,
    }
}

/// Classifies a decoded event as Mint/Burn/Transfer when it is a
/// `Transfer` event carrying `from`/`to` string args (spec §8 boundary
/// behavior); any other event name or missing args classifies as `None`.
pub fn classify_transfer_event(
    event_name: &str,
    decoded_args: &serde_json::Map<String, serde_json::Value>,
) -> Option<TransferKind> {
    if event_name != "Transfer" {
        return None;
    }
    let from = decoded_args.get("from")?.as_str()?;
    let to = decoded_args.get("to")?.as_str()?;
    Some(classify_transfer(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_zero_is_mint() {
        assert_eq!(
            classify_transfer("0x0000000000000000000000000000000000000000", "0xBBB"),
            TransferKind::Mint
        );
    }

    #[test]
    fn to_zero_is_burn() {
        assert_eq!(
            classify_transfer("0xAAA", "0x0000000000000000000000000000000000000000"),
            TransferKind::Burn
        );
    }

    #[test]
    fn neither_zero_is_plain_transfer() {
        assert_eq!(classify_transfer("0xAAA", "0xBBB"), TransferKind::Transfer);
    }

    #[test]
    fn non_transfer_event_is_not_classified() {
        let mut args = serde_json::Map::new();
        args.insert("from".into(), serde_json::Value::String("0xAAA".into()));
        args.insert("to".into(), serde_json::Value::String("0xBBB".into()));
        assert_eq!(classify_transfer_event("Approval", &args), None);
    }

    #[test]
    fn transfer_event_with_from_to_args_is_classified() {
        let mut args = serde_json::Map::new();
        args.insert("from".into(), serde_json::Value::String("0x0000000000000000000000000000000000000000".into()));
        args.insert("to".into(), serde_json::Value::String("0xBBB".into()));
        assert_eq!(classify_transfer_event("Transfer", &args), Some(TransferKind::Mint));
    }

    #[test]
    fn transfer_event_missing_args_is_not_classified() {
        assert_eq!(classify_transfer_event("Transfer", &serde_json::Map::new()), None);
    }
}
