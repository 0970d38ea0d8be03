//! Core types for Ember
//!
//! This module defines the key type and the wall-clock helpers used by both
//! the store (expiry checks) and the persistence layer (save timestamps).

use std::time::{SystemTime, UNIX_EPOCH};

/// Binary-safe key. Keys are arbitrary byte strings, exactly as received from
/// the wire; no encoding is assumed.
pub type Key = Vec<u8>;

/// Sentinel for "no expiry" in the on-disk entry layout, where the expiry
/// slot is a fixed-width `i64`.
pub const NO_EXPIRY: i64 = -1;

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Expiry timestamps are absolute milliseconds, so this is the comparison
/// point for every expiry check.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Current wall-clock time in whole seconds since the Unix epoch.
///
/// `LASTSAVE` reports in seconds; save-policy windows are measured in
/// seconds.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_recent() {
        // Anything after 2020-01-01 and before 2100-01-01.
        let ms = now_ms();
        assert!(ms > 1_577_836_800_000);
        assert!(ms < 4_102_444_800_000);
    }

    #[test]
    fn test_now_secs_matches_now_ms() {
        let secs = now_secs() as i64;
        let ms = now_ms();
        assert!((ms / 1000 - secs).abs() <= 1);
    }
}
