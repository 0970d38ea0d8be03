//! Ember database handle
//!
//! Ties the store and the persistence core together with the server's
//! startup sequence: create the data directory (fatal on failure), sweep
//! stale snapshot temp files, recover the previous snapshot, then start the
//! persistence manager and its policy loop.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use ember_core::SnapshotStore;
use ember_persistence::{
    ConfigError, PersistenceConfig, PersistenceManager, PersistenceResult, RecoveryLoader,
    RecoveryOutcome, SaveReport,
};
use ember_store::DataStore;

/// Errors that can occur opening a database
#[derive(Debug, Error)]
pub enum OpenError {
    /// Configuration file could not be read or parsed
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Data directory could not be created or prepared
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An open Ember database: the live store plus its persistence core.
pub struct Ember {
    store: Arc<DataStore>,
    manager: PersistenceManager,
    recovery: RecoveryOutcome,
}

impl Ember {
    /// Open a database in `dir`, loading `ember.toml` from it (and writing
    /// a commented default file on first open).
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, OpenError> {
        let config = PersistenceConfig::load_or_create(dir.as_ref())?;
        Self::open_with_config(config)
    }

    /// Open a database with an explicit configuration.
    ///
    /// Startup order: create the data directory, sweep temp files left by
    /// crashed saves, recover the snapshot (corruption logs and yields an
    /// empty store, never an error), then start the manager.
    pub fn open_with_config(config: PersistenceConfig) -> Result<Self, OpenError> {
        let store = Arc::new(DataStore::new());
        let snapshot_path = config.snapshot_path();
        let rdb_enabled = config.rdb_enabled;

        let store_seam: Arc<dyn SnapshotStore> = Arc::clone(&store) as Arc<dyn SnapshotStore>;
        let manager = PersistenceManager::new(config, store_seam)?;

        let recovery = if rdb_enabled {
            if let Err(e) = manager.snapshotter().cleanup_temp_files() {
                warn!("temp file cleanup failed: {e}");
            }
            RecoveryLoader::new(snapshot_path).recover(store.as_ref())
        } else {
            RecoveryOutcome::NoFile
        };

        store.attach_change_counter(manager.change_counter());
        manager.start();

        Ok(Ember {
            store,
            manager,
            recovery,
        })
    }

    /// The live dataset.
    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// What startup recovery found.
    pub fn recovery_outcome(&self) -> &RecoveryOutcome {
        &self.recovery
    }

    /// `SAVE`: synchronous snapshot. `Ok(None)` when persistence is
    /// disabled.
    pub fn save(&self) -> PersistenceResult<Option<SaveReport>> {
        self.manager.save()
    }

    /// `BGSAVE`: launch a background save.
    pub fn bgsave(&self) -> PersistenceResult<()> {
        self.manager.bgsave()
    }

    /// `LASTSAVE`: Unix second of the last durable save (0 if never).
    pub fn last_save(&self) -> u64 {
        self.manager.last_save()
    }

    /// Mutations since the last successful save.
    pub fn dirty_count(&self) -> u64 {
        self.manager.dirty_count()
    }

    /// Record one mutating command from the command layer.
    ///
    /// Store operations already bump the shared counter; this is for
    /// mutations applied outside the store's typed API.
    pub fn note_write(&self) {
        self.manager.note_write();
    }

    /// Drain in-flight saves and write the final snapshot.
    pub fn shutdown(&self) {
        self.manager.shutdown();
    }
}

impl Drop for Ember {
    fn drop(&mut self) {
        // Idempotent; a no-op if the caller already shut down.
        self.manager.shutdown();
    }
}
