//! The seam between the persistence core and the live store
//!
//! The persistence layer never touches a store's internal representation. It
//! sees exactly three things: a point-in-time capture, an atomic restore, and
//! a wipe. Any store implementing this trait can be snapshotted and
//! recovered; the concrete `DataStore` lives in `ember-store`.

use crate::error::StoreResult;
use crate::value::SnapshotEntry;

/// Snapshot/restore interface the persistence core requires from a store.
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (`Send + Sync`). A background save calls `snapshot()`
/// from a worker thread while request threads keep mutating.
pub trait SnapshotStore: Send + Sync + 'static {
    /// Capture a point-in-time, logically consistent view of the store.
    ///
    /// Mutations that complete before the capture point are included;
    /// mutations that start after it are not. The returned entries are a
    /// stable owned view; later store mutations do not affect them.
    /// Expired keys are excluded.
    fn snapshot(&self) -> Vec<SnapshotEntry>;

    /// Atomically replace the store's contents with `entries`.
    ///
    /// Either every entry is applied or none is; a failed restore must not
    /// leave a partial dataset visible.
    ///
    /// # Errors
    ///
    /// Returns an error if the entries cannot be applied. The caller is
    /// expected to `clear()` on error to uphold all-or-nothing recovery.
    fn restore(&self, entries: Vec<SnapshotEntry>) -> StoreResult<()>;

    /// Remove every key.
    fn clear(&self);

    /// Number of live (non-expired) keys.
    fn len(&self) -> usize;

    /// True when the store holds no live keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
