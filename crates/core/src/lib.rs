//! Core types and traits for Ember
//!
//! This crate defines the foundational vocabulary shared by the store and the
//! persistence layer:
//! - Key: Binary-safe key type
//! - Value: Tagged enum over every storable data type
//! - SnapshotEntry: One (key, value, expiry) triple as captured by a snapshot
//! - SnapshotStore: The seam between the persistence core and the live store
//! - StoreError: Error type for store operations

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{StoreError, StoreResult};
pub use traits::SnapshotStore;
pub use types::{now_ms, now_secs, Key, NO_EXPIRY};
pub use value::{SnapshotEntry, Value};
