//! In-memory data store for Ember
//!
//! This crate implements the live dataset the server mutates and the
//! persistence core snapshots:
//! - DataStore: BTreeMap-based storage under a `parking_lot::RwLock`
//! - Typed operations for every value variant (strings, lists, sets,
//!   hashes, sorted sets)
//! - Absolute-millisecond expiry, filtered at read time, with an expiry
//!   index for efficient sweeps
//! - The change-counter hook every mutating operation bumps
//! - The `SnapshotStore` seam: point-in-time capture and atomic restore
//!
//! # Consistency
//!
//! `snapshot()` clones the dataset under the read lock, so writers are
//! briefly excluded and the captured view is a clean cut: everything
//! committed before the capture is included, nothing after.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entry;
pub mod expiry;
pub mod store;

pub use entry::StoredEntry;
pub use expiry::ExpiryIndex;
pub use store::DataStore;
