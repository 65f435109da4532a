use serde::{Deserialize, Serialize};

/// A single EVM-compatible chain: chain id plus canonical lowercase name
/// (GLOSSARY "Network").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Network {
    pub chain_id: u64,
    pub name: String,
}

impl Network {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id, name: canonical_name(chain_id) }
    }
}

/// Fixed chain-id -> canonical-name table (spec §4.I). Unknown ids fall
/// back to `chain-<id>`.
pub fn canonical_name(chain_id: u64) -> String {
    match chain_id {
        1 => "ethereum",
        137 => "polygon",
        42161 => "arbitrum",
        10 => "optimism",
        8453 => "base",
        56 => "bsc",
        43114 => "avalanche",
        11155111 => "sepolia",
        80001 => "mumbai",
        other => return format!("chain-{other}"),
    }
    .to_string()
}

/// The fixed mainnet list this core ships explicit support for (spec §6).
/// Testnets resolvable via `canonical_name` aren't part of this list.
pub const SUPPORTED_NETWORKS: [(&str, u64); 7] = [
    ("ethereum", 1),
    ("polygon", 137),
    ("arbitrum", 42161),
    ("optimism", 10),
    ("base", 8453),
    ("bsc", 56),
    ("avalanche", 43114),
];
