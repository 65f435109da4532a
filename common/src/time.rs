//! Timestamp helpers. Uses `SystemTime::now()`, which is fine here: every
//! consumer is logging, TTL bookkeeping or alert/event timestamping, never
//! something that needs to be reproduced deterministically across nodes.

use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond timestamp, matching the representation used throughout the
/// entities in `model`.
pub type TimestampMillis = u64;

#[inline]
pub fn now_millis() -> TimestampMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as TimestampMillis
}
