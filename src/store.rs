//! Replay-protection store.
//!
//! Relay records are created lazily on the first attempt and never deleted.
//! `successful` is set exactly once; `failed` may be set on any number of
//! attempts and is ignored once the envelope has succeeded.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-envelope relay bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRecord {
    pub successful: bool,
    pub failed: bool,
}

/// Routing view of a [`RelayRecord`]. Success always takes precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    Unseen,
    Failed,
    Succeeded,
}

impl RelayRecord {
    pub fn state(&self) -> RelayState {
        if self.successful {
            RelayState::Succeeded
        } else if self.failed {
            RelayState::Failed
        } else {
            RelayState::Unseen
        }
    }
}

/// Append-only ledger of relay records keyed by envelope hash.
pub trait RelayLedger {
    /// Record for `hash`, or the default (unseen) record.
    fn record(&self, hash: &B256) -> RelayRecord;

    fn mark_successful(&mut self, hash: B256);

    fn mark_failed(&mut self, hash: B256);

    fn state(&self, hash: &B256) -> RelayState {
        self.record(hash).state()
    }
}

/// In-memory [`RelayLedger`].
#[derive(Debug, Default, Clone)]
pub struct InMemoryRelayLedger {
    records: HashMap<B256, RelayRecord>,
}

impl InMemoryRelayLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RelayLedger for InMemoryRelayLedger {
    fn record(&self, hash: &B256) -> RelayRecord {
        self.records.get(hash).copied().unwrap_or_default()
    }

    fn mark_successful(&mut self, hash: B256) {
        self.records.entry(hash).or_default().successful = true;
    }

    fn mark_failed(&mut self, hash: B256) {
        self.records.entry(hash).or_default().failed = true;
    }
}
