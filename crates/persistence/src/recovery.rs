//! Snapshot recovery at startup
//!
//! Reads the snapshot file back into the store. Recovery is all-or-nothing
//! and never fails the process: a missing file leaves the store empty and is
//! not an error; any corruption leaves the store empty, logs the reason, and
//! lets the server start.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use ember_core::{now_ms, SnapshotStore};

use crate::codec;

/// Outcome of a recovery attempt. Never an `Err`: the caller decides policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No snapshot file exists; the store is left empty.
    NoFile,
    /// Snapshot restored; holds the number of keys kept after expiry
    /// filtering.
    Restored(usize),
    /// The file could not be read, decoded, or applied; the store is left
    /// empty.
    Corrupted(String),
}

/// Startup-time snapshot loader.
pub struct RecoveryLoader {
    path: PathBuf,
}

impl RecoveryLoader {
    /// Loader for the snapshot at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RecoveryLoader { path: path.into() }
    }

    /// The snapshot path this loader reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restore the store from the snapshot file.
    ///
    /// Entries whose expiry deadline has already passed are dropped before
    /// the restore. If the restore itself fails, the store is cleared so a
    /// partial dataset is never visible.
    pub fn recover(&self, store: &dyn SnapshotStore) -> RecoveryOutcome {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no snapshot at {}, starting empty", self.path.display());
                return RecoveryOutcome::NoFile;
            }
            Err(e) => {
                let reason = format!("failed to read snapshot: {e}");
                error!("{reason}; starting empty");
                store.clear();
                return RecoveryOutcome::Corrupted(reason);
            }
        };

        let entries = match codec::decode(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                let reason = e.to_string();
                error!(
                    "snapshot {} is corrupt ({reason}); starting empty",
                    self.path.display()
                );
                store.clear();
                return RecoveryOutcome::Corrupted(reason);
            }
        };

        let now = now_ms();
        let total = entries.len();
        let live: Vec<_> = entries
            .into_iter()
            .filter(|entry| !entry.is_expired_at(now))
            .collect();
        let kept = live.len();
        if kept < total {
            debug!(dropped = total - kept, "dropped expired keys during recovery");
        }

        if let Err(e) = store.restore(live) {
            let reason = format!("restore failed: {e}");
            error!("{reason}; starting empty");
            store.clear();
            return RecoveryOutcome::Corrupted(reason);
        }

        info!(
            keys = kept,
            path = %self.path.display(),
            "snapshot restored"
        );
        RecoveryOutcome::Restored(kept)
    }
}
