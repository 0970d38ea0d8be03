//! Shared store stub for unit tests.

use std::time::Duration;

use parking_lot::Mutex;

use ember_core::{SnapshotEntry, SnapshotStore, StoreError, StoreResult, Value};

/// Minimal `SnapshotStore` for exercising the persistence layer without the
/// real store crate: a flat entry list, an optional capture delay (to hold
/// the save gate open), and an optional restore failure.
#[derive(Default)]
pub(crate) struct TestStore {
    pub entries: Mutex<Vec<SnapshotEntry>>,
    pub capture_delay: Option<Duration>,
    pub fail_restore: bool,
}

impl TestStore {
    pub fn with_entries(entries: Vec<SnapshotEntry>) -> Self {
        TestStore {
            entries: Mutex::new(entries),
            ..Default::default()
        }
    }
}

impl SnapshotStore for TestStore {
    fn snapshot(&self) -> Vec<SnapshotEntry> {
        if let Some(delay) = self.capture_delay {
            std::thread::sleep(delay);
        }
        self.entries.lock().clone()
    }

    fn restore(&self, entries: Vec<SnapshotEntry>) -> StoreResult<()> {
        if self.fail_restore {
            // Simulate a store rejecting the payload after partially
            // applying it.
            *self.entries.lock() = entries.into_iter().take(1).collect();
            return Err(StoreError::NotAnInteger);
        }
        *self.entries.lock() = entries;
        Ok(())
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Integer-valued entry without expiry.
pub(crate) fn int_entry(key: &[u8], n: i64) -> SnapshotEntry {
    SnapshotEntry::new(key.to_vec(), Value::Int(n))
}
