//! Message quota: a persisted counter of remaining chat messages.
//!
//! The counter starts at [`DEFAULT_MAX_QUOTA`], is decremented optimistically
//! before every remote call, refunded when the call fails, and never
//! replenished by this crate. At zero, sends are rejected before any remote
//! call is made.

pub mod store;

pub use store::{
    FileQuotaStore, MemoryQuotaStore, QuotaStore, QuotaStoreError, StoredQuota,
    parse_stored_quota,
};

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default number of messages per user.
pub const DEFAULT_MAX_QUOTA: u32 = 30;

/// Default storage key for the counter.
pub const DEFAULT_QUOTA_KEY: &str = "chefEvaQuota";

/// Returned when a consume is attempted on an exhausted counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("message quota exhausted")]
pub struct QuotaDenied;

/// Take one unit from `counter`. Fails without change when it is zero.
pub fn try_consume(counter: u32) -> Result<u32, QuotaDenied> {
    counter.checked_sub(1).ok_or(QuotaDenied)
}

/// Give back one unit taken by [`try_consume`].
pub fn refund(counter: u32) -> u32 {
    counter.saturating_add(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaState {
    Available,
    Exhausted,
}

// ── Tracker ────────────────────────────────────────────────────────

/// Stateful counter bound to a [`QuotaStore`] key.
///
/// The in-memory value is authoritative: storage failures are logged and
/// otherwise ignored.
pub struct QuotaTracker {
    remaining: u32,
    max: u32,
    key: String,
    store: Arc<dyn QuotaStore>,
}

impl std::fmt::Debug for QuotaTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaTracker")
            .field("remaining", &self.remaining)
            .field("max", &self.max)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl QuotaTracker {
    /// Load the counter from `store`, repairing the stored value if needed.
    pub fn load(store: Arc<dyn QuotaStore>, key: impl Into<String>, max: u32) -> Self {
        let key = key.into();
        let raw = match store.get(&key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to read quota '{key}': {e}; starting at {max}");
                None
            }
        };
        let parsed = parse_stored_quota(raw.as_deref(), max);
        let tracker = Self {
            remaining: parsed.remaining,
            max,
            key,
            store,
        };
        if parsed.needs_rewrite {
            info!(
                "Quota '{}' missing or invalid ({:?}); writing {}",
                tracker.key, raw, tracker.remaining
            );
            tracker.persist();
        }
        debug!("Quota loaded: {}/{}", tracker.remaining, tracker.max);
        tracker
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> QuotaState {
        if self.remaining == 0 {
            QuotaState::Exhausted
        } else {
            QuotaState::Available
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state() == QuotaState::Exhausted
    }

    /// Consume one message. Returns the new remaining count.
    pub fn try_consume(&mut self) -> Result<u32, QuotaDenied> {
        self.remaining = try_consume(self.remaining)?;
        self.persist();
        Ok(self.remaining)
    }

    /// Undo one consume. Never exceeds the maximum.
    pub fn refund(&mut self) -> u32 {
        self.remaining = refund(self.remaining).min(self.max);
        self.persist();
        self.remaining
    }

    fn persist(&self) {
        if let Err(e) = self.store.set(&self.key, &self.remaining.to_string()) {
            warn!("Failed to persist quota '{}': {e}", self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    impl QuotaStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, QuotaStoreError> {
            Err(QuotaStoreError::Poisoned)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), QuotaStoreError> {
            Err(QuotaStoreError::Poisoned)
        }
    }

    fn tracker_with(raw: Option<&str>) -> (QuotaTracker, MemoryQuotaStore) {
        let store = match raw {
            Some(v) => MemoryQuotaStore::with_value(DEFAULT_QUOTA_KEY, v),
            None => MemoryQuotaStore::new(),
        };
        let tracker = QuotaTracker::load(
            Arc::new(store.clone()),
            DEFAULT_QUOTA_KEY,
            DEFAULT_MAX_QUOTA,
        );
        (tracker, store)
    }

    fn stored(store: &MemoryQuotaStore) -> Option<String> {
        store.get(DEFAULT_QUOTA_KEY).unwrap()
    }

    #[test]
    fn pure_consume_and_refund() {
        assert_eq!(try_consume(0), Err(QuotaDenied));
        assert_eq!(try_consume(5), Ok(4));
        assert_eq!(refund(4), 5);
        assert_eq!(refund(u32::MAX), u32::MAX);
    }

    #[test]
    fn missing_value_defaults_to_max_and_is_written() {
        let (tracker, store) = tracker_with(None);
        assert_eq!(tracker.remaining(), 30);
        assert_eq!(stored(&store).as_deref(), Some("30"));
    }

    #[test]
    fn invalid_values_reset_to_max() {
        for raw in ["-5", "abc"] {
            let (tracker, store) = tracker_with(Some(raw));
            assert_eq!(tracker.remaining(), 30);
            assert_eq!(stored(&store).as_deref(), Some("30"));
        }
    }

    #[test]
    fn above_max_clamps() {
        let (tracker, store) = tracker_with(Some("100"));
        assert_eq!(tracker.remaining(), 30);
        assert_eq!(stored(&store).as_deref(), Some("30"));
    }

    #[test]
    fn consume_persists_and_exhausts() {
        let (mut tracker, store) = tracker_with(Some("2"));
        assert_eq!(tracker.state(), QuotaState::Available);
        assert_eq!(tracker.try_consume(), Ok(1));
        assert_eq!(stored(&store).as_deref(), Some("1"));
        assert_eq!(tracker.try_consume(), Ok(0));
        assert!(tracker.is_exhausted());
        assert_eq!(tracker.try_consume(), Err(QuotaDenied));
        assert_eq!(tracker.remaining(), 0);
        assert_eq!(stored(&store).as_deref(), Some("0"));
    }

    #[test]
    fn refund_restores_and_clamps() {
        let (mut tracker, store) = tracker_with(Some("1"));
        tracker.try_consume().unwrap();
        assert_eq!(tracker.refund(), 1);
        assert_eq!(stored(&store).as_deref(), Some("1"));

        let (mut full, _) = tracker_with(None);
        assert_eq!(full.refund(), 30);
    }

    #[test]
    fn storage_failures_do_not_block_consumption() {
        let mut tracker = QuotaTracker::load(Arc::new(FailingStore), DEFAULT_QUOTA_KEY, 3);
        assert_eq!(tracker.remaining(), 3);
        assert_eq!(tracker.try_consume(), Ok(2));
        assert_eq!(tracker.refund(), 3);
    }
}
