//! Stored entry: a value plus its expiry deadline
//!
//! Internal storage type. The contract type handed to the persistence layer
//! is `SnapshotEntry` (which adds the key); conversion is lossless.

use ember_core::{SnapshotEntry, Value};

/// A value as held in the store, with its optional expiry deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    /// The stored value.
    pub value: Value,
    /// Absolute expiry deadline in Unix milliseconds, if any.
    pub expires_at_ms: Option<i64>,
}

impl StoredEntry {
    /// Create an entry without an expiry.
    pub fn new(value: Value) -> Self {
        StoredEntry {
            value,
            expires_at_ms: None,
        }
    }

    /// True if the deadline has passed at `now_ms`.
    ///
    /// Deadlines are inclusive: an entry expiring at exactly `now_ms` is
    /// already gone.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        matches!(self.expires_at_ms, Some(at) if at <= now_ms)
    }

    /// Pair this entry with its key to form a snapshot entry.
    pub fn to_snapshot_entry(&self, key: &[u8]) -> SnapshotEntry {
        SnapshotEntry {
            key: key.to_vec(),
            value: self.value.clone(),
            expires_at_ms: self.expires_at_ms,
        }
    }
}

impl From<SnapshotEntry> for StoredEntry {
    fn from(entry: SnapshotEntry) -> Self {
        StoredEntry {
            value: entry.value,
            expires_at_ms: entry.expires_at_ms,
        }
    }
}
