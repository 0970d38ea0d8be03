//! Persistence core for Ember
//!
//! This crate implements snapshot persistence for the in-memory store:
//! - **format / codec**: the binary snapshot file layout (framing, gzip
//!   compression, trailing CRC32) and the per-variant entry encoding
//! - **snapshot**: the crash-safe Snapshotter (write-fsync-rename-dirfsync),
//!   synchronous and background save modes behind an at-most-one gate
//! - **recovery**: startup restore with corruption fallback and expiry
//!   filtering; corruption never crashes the server
//! - **manager**: mutation accounting, the save-policy loop, and the
//!   `SAVE`/`BGSAVE`/`LASTSAVE` command surface
//! - **config**: the recognized persistence options, loaded from
//!   `ember.toml` in the data directory
//!
//! The crate sees the store only through the `SnapshotStore` seam defined in
//! `ember-core`; it never touches a store's internal representation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod format;
pub mod manager;
pub mod recovery;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testutil;

pub use codec::{decode, encode, Checksum, CodecOptions, Compression, DecodeError, EncodeError};
pub use config::{ConfigError, PersistenceConfig, SaveRule, CONFIG_FILE_NAME};
pub use manager::{
    PersistenceError, PersistenceManager, PersistenceResult, BGSAVE_STARTED_REPLY,
};
pub use recovery::{RecoveryLoader, RecoveryOutcome};
pub use snapshot::{BgSaveHandle, SaveError, SaveReport, SaveState, Snapshotter};
