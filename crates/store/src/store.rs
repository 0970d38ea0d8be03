//! DataStore: the live dataset
//!
//! This module implements the store the command layer mutates:
//! - `BTreeMap<Key, StoredEntry>` under a `parking_lot::RwLock`
//! - Typed operations per value variant, with `WRONGTYPE` errors on mismatch
//! - Logical expiry: expired entries are filtered at read time; mutating
//!   paths and `purge_expired` delete them for real
//! - Every effective mutation bumps the attached change counter, which is
//!   how the persistence layer's save policies see write traffic
//!
//! # Design Notes
//!
//! - Ordered map: snapshot capture iterates in key order, so the same
//!   dataset always serializes to the same bytes
//! - Aggregates never persist empty: removing the last member removes the
//!   key, like Redis

use std::collections::btree_map::Entry as MapEntry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::debug;

use ember_core::{now_ms, Key, SnapshotEntry, SnapshotStore, StoreError, StoreResult, Value};

use crate::entry::StoredEntry;
use crate::expiry::ExpiryIndex;

/// Key not found sentinel for `ttl_ms`.
pub const TTL_NO_KEY: i64 = -2;
/// No-expiry sentinel for `ttl_ms`.
pub const TTL_NO_EXPIRY: i64 = -1;

#[derive(Debug, Default)]
struct Inner {
    data: BTreeMap<Key, StoredEntry>,
    expiry: ExpiryIndex,
}

impl Inner {
    /// Drop `key` if its deadline has passed. Keeps the expiry index in step.
    fn evict_if_expired(&mut self, key: &[u8], now: i64) {
        let expired = match self.data.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => return,
        };
        if expired {
            self.remove(key);
        }
    }

    /// Live (non-expired) entry lookup for read paths.
    fn live(&self, key: &[u8], now: i64) -> Option<&StoredEntry> {
        self.data.get(key).filter(|e| !e.is_expired_at(now))
    }

    /// Remove `key` outright, keeping the expiry index in step.
    fn remove(&mut self, key: &[u8]) -> Option<StoredEntry> {
        let entry = self.data.remove(key)?;
        if let Some(at) = entry.expires_at_ms {
            self.expiry.remove(at, key);
        }
        Some(entry)
    }
}

/// Thread-safe in-memory store.
///
/// All operations take `&self`; interior mutability is a single `RwLock`
/// covering the data map and the expiry index together, so the two can never
/// disagree.
#[derive(Debug, Default)]
pub struct DataStore {
    inner: RwLock<Inner>,
    change_counter: OnceCell<Arc<AtomicU64>>,
}

impl DataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the shared mutation counter.
    ///
    /// The persistence manager owns the counter; the store bumps it once per
    /// effective mutation. Attaching twice is a no-op (first wins).
    pub fn attach_change_counter(&self, counter: Arc<AtomicU64>) {
        let _ = self.change_counter.set(counter);
    }

    fn note_changes(&self, n: u64) {
        if n > 0 {
            if let Some(counter) = self.change_counter.get() {
                counter.fetch_add(n, Ordering::Relaxed);
            }
        }
    }

    // ======================================================================
    // Strings
    // ======================================================================

    /// Set `key` to a byte-string value, clearing any expiry.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Vec<u8>>) {
        let key = key.into();
        {
            let mut inner = self.inner.write();
            inner.remove(&key);
            inner
                .data
                .insert(key, StoredEntry::new(Value::Bytes(value.into())));
        }
        self.note_changes(1);
    }

    /// Set `key` with an absolute expiry deadline in Unix milliseconds.
    pub fn set_with_expiry(&self, key: impl Into<Key>, value: impl Into<Vec<u8>>, at_ms: i64) {
        let key = key.into();
        {
            let mut inner = self.inner.write();
            inner.remove(&key);
            inner.expiry.insert(at_ms, key.clone());
            inner.data.insert(
                key,
                StoredEntry {
                    value: Value::Bytes(value.into()),
                    expires_at_ms: Some(at_ms),
                },
            );
        }
        self.note_changes(1);
    }

    /// Get the string value at `key`. Integer values render as their decimal
    /// representation, like Redis strings do.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let inner = self.inner.read();
        match inner.live(key, now_ms()) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::Bytes(bytes) => Ok(Some(bytes.clone())),
                Value::Int(n) => Ok(Some(n.to_string().into_bytes())),
                other => Err(StoreError::WrongType {
                    expected: "string",
                    actual: other.type_name(),
                }),
            },
        }
    }

    /// Delete keys. Returns how many existed.
    pub fn del(&self, keys: &[&[u8]]) -> usize {
        let now = now_ms();
        let mut removed = 0;
        {
            let mut inner = self.inner.write();
            for key in keys {
                inner.evict_if_expired(key, now);
                if inner.remove(key).is_some() {
                    removed += 1;
                }
            }
        }
        self.note_changes(removed as u64);
        removed
    }

    /// True if `key` exists and is not expired.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.inner.read().live(key, now_ms()).is_some()
    }

    /// Add `delta` to the integer at `key`, creating it at `delta` if absent.
    /// String values that parse as a 64-bit decimal integer are converted.
    pub fn incr_by(&self, key: &[u8], delta: i64) -> StoreResult<i64> {
        let now = now_ms();
        let new = {
            let mut inner = self.inner.write();
            inner.evict_if_expired(key, now);

            match inner.data.entry(key.to_vec()) {
                MapEntry::Vacant(slot) => {
                    slot.insert(StoredEntry::new(Value::Int(delta)));
                    delta
                }
                MapEntry::Occupied(mut occupied) => {
                    let entry = occupied.get_mut();
                    let current = match &entry.value {
                        Value::Int(n) => *n,
                        Value::Bytes(bytes) => std::str::from_utf8(bytes)
                            .ok()
                            .and_then(|s| s.parse::<i64>().ok())
                            .ok_or(StoreError::NotAnInteger)?,
                        other => {
                            return Err(StoreError::WrongType {
                                expected: "string",
                                actual: other.type_name(),
                            })
                        }
                    };
                    let next = current
                        .checked_add(delta)
                        .ok_or(StoreError::IntegerOverflow)?;
                    entry.value = Value::Int(next);
                    next
                }
            }
        };
        self.note_changes(1);
        Ok(new)
    }

    // ======================================================================
    // Lists
    // ======================================================================

    /// Append values to the list at `key`, creating it if absent.
    /// Returns the resulting length.
    pub fn rpush(&self, key: &[u8], values: Vec<Vec<u8>>) -> StoreResult<usize> {
        self.push(key, values, false)
    }

    /// Prepend values to the list at `key` (each value lands in front of the
    /// previous one, like `LPUSH`). Returns the resulting length.
    pub fn lpush(&self, key: &[u8], values: Vec<Vec<u8>>) -> StoreResult<usize> {
        self.push(key, values, true)
    }

    fn push(&self, key: &[u8], values: Vec<Vec<u8>>, front: bool) -> StoreResult<usize> {
        let pushed = values.len() as u64;
        let now = now_ms();
        let len = {
            let mut inner = self.inner.write();
            inner.evict_if_expired(key, now);

            let entry = inner
                .data
                .entry(key.to_vec())
                .or_insert_with(|| StoredEntry::new(Value::List(Vec::new())));
            match &mut entry.value {
                Value::List(items) => {
                    for v in values {
                        if front {
                            items.insert(0, v);
                        } else {
                            items.push(v);
                        }
                    }
                    items.len()
                }
                other => {
                    return Err(StoreError::WrongType {
                        expected: "list",
                        actual: other.type_name(),
                    })
                }
            }
        };
        self.note_changes(pushed);
        Ok(len)
    }

    /// Slice of the list at `key`, with Redis index semantics: negative
    /// indices count from the tail, out-of-range bounds clamp.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<Vec<u8>>> {
        let inner = self.inner.read();
        let items = match inner.live(key, now_ms()) {
            None => return Ok(Vec::new()),
            Some(entry) => match &entry.value {
                Value::List(items) => items,
                other => {
                    return Err(StoreError::WrongType {
                        expected: "list",
                        actual: other.type_name(),
                    })
                }
            },
        };

        let len = items.len() as i64;
        let from = if start < 0 {
            (len + start).max(0)
        } else {
            start.min(len)
        };
        let to = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if from > to || to < 0 {
            return Ok(Vec::new());
        }
        Ok(items[from as usize..=(to as usize)].to_vec())
    }

    /// Length of the list at `key` (0 if absent).
    pub fn llen(&self, key: &[u8]) -> StoreResult<usize> {
        self.aggregate_len(key, "list", |v| match v {
            Value::List(items) => Some(items.len()),
            _ => None,
        })
    }

    // ======================================================================
    // Sets
    // ======================================================================

    /// Add members to the set at `key`. Returns how many were new.
    pub fn sadd(&self, key: &[u8], members: Vec<Vec<u8>>) -> StoreResult<usize> {
        let now = now_ms();
        let added = {
            let mut inner = self.inner.write();
            inner.evict_if_expired(key, now);

            let entry = inner
                .data
                .entry(key.to_vec())
                .or_insert_with(|| StoredEntry::new(Value::Set(Default::default())));
            match &mut entry.value {
                Value::Set(set) => members.into_iter().filter(|m| set.insert(m.clone())).count(),
                other => {
                    return Err(StoreError::WrongType {
                        expected: "set",
                        actual: other.type_name(),
                    })
                }
            }
        };
        self.note_changes(added as u64);
        Ok(added)
    }

    /// Remove members from the set at `key`. Returns how many were present.
    /// Removing the last member removes the key.
    pub fn srem(&self, key: &[u8], members: &[&[u8]]) -> StoreResult<usize> {
        let now = now_ms();
        let removed = {
            let mut inner = self.inner.write();
            inner.evict_if_expired(key, now);

            let (removed, now_empty) = match inner.data.get_mut(key) {
                None => (0, false),
                Some(entry) => match &mut entry.value {
                    Value::Set(set) => {
                        let removed = members.iter().filter(|m| set.remove(**m)).count();
                        (removed, set.is_empty())
                    }
                    other => {
                        return Err(StoreError::WrongType {
                            expected: "set",
                            actual: other.type_name(),
                        })
                    }
                },
            };
            if now_empty {
                inner.remove(key);
            }
            removed
        };
        self.note_changes(removed as u64);
        Ok(removed)
    }

    /// All members of the set at `key`, in byte order.
    pub fn smembers(&self, key: &[u8]) -> StoreResult<Vec<Vec<u8>>> {
        let inner = self.inner.read();
        match inner.live(key, now_ms()) {
            None => Ok(Vec::new()),
            Some(entry) => match &entry.value {
                Value::Set(set) => Ok(set.iter().cloned().collect()),
                other => Err(StoreError::WrongType {
                    expected: "set",
                    actual: other.type_name(),
                }),
            },
        }
    }

    /// Cardinality of the set at `key` (0 if absent).
    pub fn scard(&self, key: &[u8]) -> StoreResult<usize> {
        self.aggregate_len(key, "set", |v| match v {
            Value::Set(set) => Some(set.len()),
            _ => None,
        })
    }

    // ======================================================================
    // Hashes
    // ======================================================================

    /// Set a hash field. Returns true if the field was new.
    pub fn hset(&self, key: &[u8], field: Vec<u8>, value: Vec<u8>) -> StoreResult<bool> {
        let now = now_ms();
        let new = {
            let mut inner = self.inner.write();
            inner.evict_if_expired(key, now);

            let entry = inner
                .data
                .entry(key.to_vec())
                .or_insert_with(|| StoredEntry::new(Value::Hash(Default::default())));
            match &mut entry.value {
                Value::Hash(fields) => fields.insert(field, value).is_none(),
                other => {
                    return Err(StoreError::WrongType {
                        expected: "hash",
                        actual: other.type_name(),
                    })
                }
            }
        };
        self.note_changes(1);
        Ok(new)
    }

    /// Get a hash field.
    pub fn hget(&self, key: &[u8], field: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let inner = self.inner.read();
        match inner.live(key, now_ms()) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::Hash(fields) => Ok(fields.get(field).cloned()),
                other => Err(StoreError::WrongType {
                    expected: "hash",
                    actual: other.type_name(),
                }),
            },
        }
    }

    /// Delete hash fields. Returns how many existed. Removing the last field
    /// removes the key.
    pub fn hdel(&self, key: &[u8], fields: &[&[u8]]) -> StoreResult<usize> {
        let now = now_ms();
        let removed = {
            let mut inner = self.inner.write();
            inner.evict_if_expired(key, now);

            let (removed, now_empty) = match inner.data.get_mut(key) {
                None => (0, false),
                Some(entry) => match &mut entry.value {
                    Value::Hash(map) => {
                        let removed = fields.iter().filter(|f| map.remove(**f).is_some()).count();
                        (removed, map.is_empty())
                    }
                    other => {
                        return Err(StoreError::WrongType {
                            expected: "hash",
                            actual: other.type_name(),
                        })
                    }
                },
            };
            if now_empty {
                inner.remove(key);
            }
            removed
        };
        self.note_changes(removed as u64);
        Ok(removed)
    }

    /// Number of fields in the hash at `key` (0 if absent).
    pub fn hlen(&self, key: &[u8]) -> StoreResult<usize> {
        self.aggregate_len(key, "hash", |v| match v {
            Value::Hash(fields) => Some(fields.len()),
            _ => None,
        })
    }

    // ======================================================================
    // Sorted sets
    // ======================================================================

    /// Add or update a sorted-set member. Returns true if the member was new.
    pub fn zadd(&self, key: &[u8], member: Vec<u8>, score: f64) -> StoreResult<bool> {
        let now = now_ms();
        let new = {
            let mut inner = self.inner.write();
            inner.evict_if_expired(key, now);

            let entry = inner
                .data
                .entry(key.to_vec())
                .or_insert_with(|| StoredEntry::new(Value::SortedSet(Default::default())));
            match &mut entry.value {
                Value::SortedSet(members) => members.insert(member, score).is_none(),
                other => {
                    return Err(StoreError::WrongType {
                        expected: "zset",
                        actual: other.type_name(),
                    })
                }
            }
        };
        self.note_changes(1);
        Ok(new)
    }

    /// Score of `member` in the sorted set at `key`.
    pub fn zscore(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<f64>> {
        let inner = self.inner.read();
        match inner.live(key, now_ms()) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::SortedSet(members) => Ok(members.get(member).copied()),
                other => Err(StoreError::WrongType {
                    expected: "zset",
                    actual: other.type_name(),
                }),
            },
        }
    }

    /// Remove a sorted-set member. Returns true if it was present. Removing
    /// the last member removes the key.
    pub fn zrem(&self, key: &[u8], member: &[u8]) -> StoreResult<bool> {
        let now = now_ms();
        let removed = {
            let mut inner = self.inner.write();
            inner.evict_if_expired(key, now);

            let (removed, now_empty) = match inner.data.get_mut(key) {
                None => (false, false),
                Some(entry) => match &mut entry.value {
                    Value::SortedSet(members) => {
                        let removed = members.remove(member).is_some();
                        (removed, members.is_empty())
                    }
                    other => {
                        return Err(StoreError::WrongType {
                            expected: "zset",
                            actual: other.type_name(),
                        })
                    }
                },
            };
            if now_empty {
                inner.remove(key);
            }
            removed
        };
        self.note_changes(removed as u64);
        Ok(removed)
    }

    /// Cardinality of the sorted set at `key` (0 if absent).
    pub fn zcard(&self, key: &[u8]) -> StoreResult<usize> {
        self.aggregate_len(key, "zset", |v| match v {
            Value::SortedSet(members) => Some(members.len()),
            _ => None,
        })
    }

    // ======================================================================
    // Expiry
    // ======================================================================

    /// Set an absolute expiry deadline on an existing key.
    /// Returns false if the key does not exist.
    pub fn expire_at(&self, key: &[u8], at_ms: i64) -> bool {
        let now = now_ms();
        let updated = {
            let mut inner = self.inner.write();
            inner.evict_if_expired(key, now);

            let previous = inner
                .data
                .get_mut(key)
                .map(|entry| entry.expires_at_ms.replace(at_ms));
            match previous {
                None => false,
                Some(old) => {
                    if let Some(old_at) = old {
                        inner.expiry.remove(old_at, key);
                    }
                    inner.expiry.insert(at_ms, key.to_vec());
                    true
                }
            }
        };
        self.note_changes(updated as u64);
        updated
    }

    /// Remaining lifetime of `key` in milliseconds: `TTL_NO_KEY` (-2) if the
    /// key does not exist, `TTL_NO_EXPIRY` (-1) if it has no deadline.
    pub fn ttl_ms(&self, key: &[u8]) -> i64 {
        let now = now_ms();
        let inner = self.inner.read();
        match inner.live(key, now) {
            None => TTL_NO_KEY,
            Some(entry) => match entry.expires_at_ms {
                None => TTL_NO_EXPIRY,
                Some(at) => at - now,
            },
        }
    }

    /// Remove the expiry deadline from `key`. Returns true if one existed.
    pub fn persist(&self, key: &[u8]) -> bool {
        let now = now_ms();
        let updated = {
            let mut inner = self.inner.write();
            inner.evict_if_expired(key, now);

            let taken = inner.data.get_mut(key).and_then(|e| e.expires_at_ms.take());
            match taken {
                None => false,
                Some(at) => {
                    inner.expiry.remove(at, key);
                    true
                }
            }
        };
        self.note_changes(updated as u64);
        updated
    }

    /// Delete every key whose deadline has passed. Returns the count.
    ///
    /// The expiry index is advisory, so each candidate's authoritative
    /// deadline is re-checked before deletion.
    pub fn purge_expired(&self) -> usize {
        let now = now_ms();
        let mut purged = 0;
        {
            let mut inner = self.inner.write();
            for key in inner.expiry.take_expired(now) {
                let due = inner.data.get(&key).is_some_and(|e| e.is_expired_at(now));
                if due {
                    inner.data.remove(&key);
                    purged += 1;
                }
            }
        }
        if purged > 0 {
            debug!(purged, "purged expired keys");
        }
        self.note_changes(purged as u64);
        purged
    }

    fn aggregate_len(
        &self,
        key: &[u8],
        expected: &'static str,
        project: impl Fn(&Value) -> Option<usize>,
    ) -> StoreResult<usize> {
        let inner = self.inner.read();
        match inner.live(key, now_ms()) {
            None => Ok(0),
            Some(entry) => project(&entry.value).ok_or(StoreError::WrongType {
                expected,
                actual: entry.value.type_name(),
            }),
        }
    }
}

impl SnapshotStore for DataStore {
    fn snapshot(&self) -> Vec<SnapshotEntry> {
        let now = now_ms();
        let inner = self.inner.read();
        inner
            .data
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| entry.to_snapshot_entry(key))
            .collect()
    }

    fn restore(&self, entries: Vec<SnapshotEntry>) -> StoreResult<()> {
        let mut fresh = Inner::default();
        for entry in entries {
            if entry.value.is_empty() {
                continue;
            }
            if let Some(at) = entry.expires_at_ms {
                fresh.expiry.insert(at, entry.key.clone());
            }
            fresh.data.insert(entry.key.clone(), StoredEntry::from(entry));
        }
        *self.inner.write() = fresh;
        Ok(())
    }

    fn clear(&self) {
        *self.inner.write() = Inner::default();
    }

    fn len(&self) -> usize {
        let now = now_ms();
        let inner = self.inner.read();
        inner
            .data
            .values()
            .filter(|e| !e.is_expired_at(now))
            .count()
    }
}
