//! Value types for Ember
//!
//! This module defines:
//! - Value: Unified enum over every storable data type
//! - SnapshotEntry: One (key, value, expiry) triple in a snapshot
//!
//! Aggregate variants use ordered containers (`BTreeSet`/`BTreeMap`) so that
//! iterating a value always yields members in the same order. The snapshot
//! codec relies on this: encoding the same dataset twice must produce the
//! same bytes.

use crate::types::Key;
use std::collections::{BTreeMap, BTreeSet};

/// Unified value type for all storable data
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Raw byte string (the `SET`/`GET` family)
    Bytes(Vec<u8>),
    /// 64-bit signed integer (the `INCR` family)
    Int(i64),
    /// Ordered sequence of byte strings (the `LPUSH`/`RPUSH` family)
    List(Vec<Vec<u8>>),
    /// Set of byte strings (the `SADD` family)
    Set(BTreeSet<Vec<u8>>),
    /// Field → value mapping (the `HSET` family)
    Hash(BTreeMap<Vec<u8>, Vec<u8>>),
    /// Member → score mapping (the `ZADD` family)
    SortedSet(BTreeMap<Vec<u8>, f64>),
}

impl Value {
    /// Short type name, as reported in `WRONGTYPE` errors and logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bytes(_) => "string",
            Value::Int(_) => "integer",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Hash(_) => "hash",
            Value::SortedSet(_) => "zset",
        }
    }

    /// Number of elements: 1 for scalars, member count for aggregates.
    pub fn len(&self) -> usize {
        match self {
            Value::Bytes(_) | Value::Int(_) => 1,
            Value::List(items) => items.len(),
            Value::Set(members) => members.len(),
            Value::Hash(fields) => fields.len(),
            Value::SortedSet(members) => members.len(),
        }
    }

    /// True for aggregate values with zero members.
    ///
    /// An empty aggregate never survives in the store (deleting the last
    /// member deletes the key), but decoded snapshots may carry them.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Bytes(_) | Value::Int(_) => false,
            _ => self.len() == 0,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Bytes(s.as_bytes().to_vec())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

/// One entry of a point-in-time snapshot.
///
/// `expires_at_ms` is an absolute wall-clock deadline in milliseconds since
/// the Unix epoch; `None` means the key never expires.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    /// The key, exactly as stored.
    pub key: Key,
    /// The value at capture time.
    pub value: Value,
    /// Absolute expiry deadline, if any.
    pub expires_at_ms: Option<i64>,
}

impl SnapshotEntry {
    /// Create an entry without an expiry.
    pub fn new(key: impl Into<Key>, value: Value) -> Self {
        SnapshotEntry {
            key: key.into(),
            value,
            expires_at_ms: None,
        }
    }

    /// Create an entry with an absolute expiry deadline.
    pub fn with_expiry(key: impl Into<Key>, value: Value, expires_at_ms: i64) -> Self {
        SnapshotEntry {
            key: key.into(),
            value,
            expires_at_ms: Some(expires_at_ms),
        }
    }

    /// True if the entry's deadline has passed at `now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        matches!(self.expires_at_ms, Some(at) if at <= now_ms)
    }
}
