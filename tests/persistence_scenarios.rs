//! End-to-end persistence scenarios
//!
//! Each scenario drives the full stack (store, snapshotter, recovery,
//! manager) through the public `Ember` handle. "Crashes" are simulated by
//! leaking the handle so no shutdown save runs: whatever is on disk at that
//! point is what a killed process would leave behind.

use std::time::{Duration, Instant};

use ember::{Ember, PersistenceConfig, RecoveryOutcome, SaveRule};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().try_init();
}

fn open_db(dir: &std::path::Path, rules: Vec<SaveRule>) -> Ember {
    let config = PersistenceConfig {
        data_dir: dir.to_path_buf(),
        rdb_save_conditions: rules,
        ..Default::default()
    };
    Ember::open_with_config(config).unwrap()
}

/// Drop the handle without running its shutdown save.
fn crash(db: Ember) {
    std::mem::forget(db);
}

fn fill_large(db: &Ember, keys: usize) {
    for i in 0..keys {
        db.store().set(
            format!("key:{i:06}").into_bytes(),
            format!("value-{i}").repeat(8).into_bytes(),
        );
    }
}

#[test]
fn scenario_basic_durability() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let db = open_db(dir.path(), Vec::new());
    db.store().set(b"a".to_vec(), b"1".to_vec());
    db.store().set(b"b".to_vec(), b"2".to_vec());
    db.save().unwrap().unwrap();
    crash(db);

    let db = open_db(dir.path(), Vec::new());
    assert_eq!(db.recovery_outcome(), &RecoveryOutcome::Restored(2));
    assert_eq!(db.store().get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(db.store().get(b"b").unwrap(), Some(b"2".to_vec()));
    db.shutdown();
}

#[test]
fn scenario_corruption_tolerance() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let db = open_db(dir.path(), Vec::new());
    db.store().set(b"a".to_vec(), b"1".to_vec());
    db.save().unwrap().unwrap();
    crash(db);

    // Truncate the last byte; the checksum no longer matches.
    let path = dir.path().join("dump.rdb");
    let mut bytes = std::fs::read(&path).unwrap();
    bytes.pop();
    std::fs::write(&path, bytes).unwrap();

    let db = open_db(dir.path(), Vec::new());
    match db.recovery_outcome() {
        RecoveryOutcome::Corrupted(reason) => {
            assert!(reason.contains("checksum mismatch"), "reason: {reason}")
        }
        other => panic!("expected Corrupted, got {other:?}"),
    }
    assert_eq!(db.store().get(b"a").unwrap(), None);
    db.shutdown();
}

#[test]
fn scenario_expired_keys_dropped_on_recovery() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let db = open_db(dir.path(), Vec::new());
    db.store().set(b"keep".to_vec(), b"v".to_vec());
    db.store()
        .set_with_expiry(b"k".to_vec(), b"v".to_vec(), ember::now_ms() + 50);
    db.save().unwrap().unwrap();
    crash(db);

    std::thread::sleep(Duration::from_millis(100));

    let db = open_db(dir.path(), Vec::new());
    assert_eq!(db.recovery_outcome(), &RecoveryOutcome::Restored(1));
    assert_eq!(db.store().get(b"k").unwrap(), None);
    assert_eq!(db.store().get(b"keep").unwrap(), Some(b"v".to_vec()));
    db.shutdown();
}

#[test]
fn scenario_policy_trigger() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let db = open_db(dir.path(), vec![SaveRule::new(1, 3)]);
    assert_eq!(db.last_save(), 0);

    db.store().set(b"a".to_vec(), b"1".to_vec());
    db.store().set(b"b".to_vec(), b"2".to_vec());
    db.store().set(b"c".to_vec(), b"3".to_vec());

    // No explicit SAVE/BGSAVE: the policy loop must fire on its own.
    let deadline = Instant::now() + Duration::from_secs(5);
    while db.last_save() == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(db.last_save() > 0, "automatic save never fired");
    assert!(dir.path().join("dump.rdb").exists());

    db.shutdown();
}

#[test]
fn scenario_concurrent_bgsave() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let db = open_db(dir.path(), Vec::new());
    fill_large(&db, 50_000);

    // 10 BGSAVEs in tight succession: exactly one is accepted.
    let mut started = 0;
    let mut busy = 0;
    for _ in 0..10 {
        match db.bgsave() {
            Ok(()) => started += 1,
            Err(e) => {
                assert!(
                    e.to_string().contains("in progress"),
                    "unexpected error: {e}"
                );
                busy += 1;
            }
        }
    }
    assert_eq!(started, 1);
    assert_eq!(busy, 9);

    // After settling, a single snapshot exists and no temp files remain.
    let deadline = Instant::now() + Duration::from_secs(10);
    while db.last_save() == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(db.last_save() > 0);

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert!(names.contains(&"dump.rdb".to_string()));
    assert!(
        names.iter().all(|n| !n.contains(".tmp.")),
        "temp files left behind: {names:?}"
    );

    db.shutdown();
}

#[test]
fn scenario_save_during_bgsave_serializes() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let db = open_db(dir.path(), Vec::new());
    fill_large(&db, 50_000);

    db.bgsave().unwrap();

    // A mutation issued between the two saves must reach the final file.
    db.store().set(b"marker".to_vec(), b"late".to_vec());

    // SAVE blocks behind the background save, then writes its own snapshot.
    db.save().unwrap().unwrap();

    crash(db);

    let db = open_db(dir.path(), Vec::new());
    assert_eq!(db.store().get(b"marker").unwrap(), Some(b"late".to_vec()));
    db.shutdown();
}

#[test]
fn scenario_shutdown_saves_dirty_data() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let db = open_db(dir.path(), Vec::new());
    db.store().set(b"a".to_vec(), b"1".to_vec());
    // No explicit save: shutdown writes the final snapshot.
    db.shutdown();

    let db = open_db(dir.path(), Vec::new());
    assert_eq!(db.recovery_outcome(), &RecoveryOutcome::Restored(1));
    assert_eq!(db.store().get(b"a").unwrap(), Some(b"1".to_vec()));
    db.shutdown();
}

#[test]
fn scenario_open_sweeps_stale_temp_files() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    std::fs::write(dir.path().join("dump.rdb.tmp.4242.0"), b"half-written").unwrap();

    let db = open_db(dir.path(), Vec::new());
    assert_eq!(db.recovery_outcome(), &RecoveryOutcome::NoFile);
    assert!(!dir.path().join("dump.rdb.tmp.4242.0").exists());
    db.shutdown();
}

#[test]
fn scenario_disabled_persistence_never_touches_disk() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let config = PersistenceConfig {
        rdb_enabled: false,
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let db = Ember::open_with_config(config).unwrap();
    db.store().set(b"a".to_vec(), b"1".to_vec());

    // SAVE is a successful no-op; BGSAVE replies started without spawning.
    assert!(db.save().unwrap().is_none());
    db.bgsave().unwrap();
    assert_eq!(db.last_save(), 0);

    db.shutdown();
    assert!(!dir.path().join("dump.rdb").exists());
}

#[test]
fn scenario_reopen_after_config_file_round_trip() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    // First open writes ember.toml with defaults.
    let db = Ember::open(dir.path()).unwrap();
    db.store().set(b"a".to_vec(), b"1".to_vec());
    db.shutdown();
    drop(db);

    assert!(dir.path().join("ember.toml").exists());

    // Second open reads the same file and recovers the shutdown snapshot.
    let db = Ember::open(dir.path()).unwrap();
    assert_eq!(db.store().get(b"a").unwrap(), Some(b"1".to_vec()));
    db.shutdown();
}
