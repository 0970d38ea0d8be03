//! Ember: a Redis-compatible in-memory key-value store with snapshot
//! persistence
//!
//! This crate is the facade over the workspace:
//! - `ember-core`: shared types (`Value`, `SnapshotEntry`, the store seam)
//! - `ember-store`: the live in-memory dataset
//! - `ember-persistence`: snapshot codec, crash-safe writer, recovery, and
//!   the save-policy manager
//!
//! [`Ember::open`] wires them together: load (or create) the config, sweep
//! stale temp files, recover the previous snapshot, then start the
//! persistence manager.
//!
//! ```no_run
//! use ember::Ember;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Ember::open("./data")?;
//! db.store().set(b"greeting".to_vec(), b"hello".to_vec());
//! db.save()?;
//! db.shutdown();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod db;

pub use db::{Ember, OpenError};

pub use ember_core::{now_ms, Key, SnapshotEntry, SnapshotStore, StoreError, StoreResult, Value};
pub use ember_persistence::{
    PersistenceConfig, PersistenceError, RecoveryOutcome, SaveReport, SaveRule,
    BGSAVE_STARTED_REPLY,
};
pub use ember_store::DataStore;
