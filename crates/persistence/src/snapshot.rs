//! Crash-safe snapshot writer
//!
//! Uses the write-fsync-rename pattern for atomic snapshot installation:
//!
//! 1. Write the encoded snapshot to a temporary file
//!    (`<filename>.tmp.<pid>.<nonce>`)
//! 2. fsync the temporary file
//! 3. Atomic rename over the target path
//! 4. fsync the parent directory
//!
//! Either the complete new snapshot is installed or the previous one is
//! untouched; a reader never observes a partial file.
//!
//! # Concurrency
//!
//! At most one save runs at a time, enforced by [`SaveGate`]. A synchronous
//! save blocks until the gate is free (so `SAVE` issued during a `BGSAVE`
//! serializes behind it); a background save fails fast with
//! [`SaveError::AlreadyInProgress`].

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

use ember_core::{now_secs, SnapshotStore};

use crate::codec::{self, CodecOptions, EncodeError};

/// Result of a completed save.
#[derive(Debug, Clone)]
pub struct SaveReport {
    /// Number of entries written.
    pub entries: usize,
    /// Size of the snapshot file in bytes.
    pub bytes: usize,
    /// Path the snapshot was installed at.
    pub path: PathBuf,
    /// Wall time the save took.
    pub duration: Duration,
}

/// Errors that can occur during a save
#[derive(Debug, Error)]
pub enum SaveError {
    /// A background save is already running
    #[error("Background save already in progress")]
    AlreadyInProgress,
    /// Snapshot could not be encoded
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    /// Filesystem error while writing or installing the snapshot
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The background save worker died without reporting a result
    #[error("background save worker panicked")]
    WorkerPanicked,
}

/// The save-in-progress gate.
///
/// A mutex-guarded flag with a condvar, giving three acquisition modes:
/// fail-fast (`BGSAVE`), blocking (`SAVE` serializes behind a running
/// background save), and wait-until-idle (shutdown drains in-flight work).
#[derive(Debug, Default)]
pub struct SaveGate {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl SaveGate {
    /// Try to acquire the gate without blocking. Returns false if a save is
    /// already in progress.
    pub fn try_acquire(&self) -> bool {
        let mut held = self.flag.lock();
        if *held {
            false
        } else {
            *held = true;
            true
        }
    }

    /// Acquire the gate, waiting for any in-flight save to finish.
    pub fn acquire_blocking(&self) {
        let mut held = self.flag.lock();
        while *held {
            self.cond.wait(&mut held);
        }
        *held = true;
    }

    /// Release the gate and wake all waiters.
    pub fn release(&self) {
        let mut held = self.flag.lock();
        *held = false;
        self.cond.notify_all();
    }

    /// True while a save holds the gate.
    pub fn is_held(&self) -> bool {
        *self.flag.lock()
    }

    /// Block until no save is in flight, without acquiring.
    pub fn wait_idle(&self) {
        let mut held = self.flag.lock();
        while *held {
            self.cond.wait(&mut held);
        }
    }
}

/// Shared save-state triple: dirty counter, last-save stamp, and the gate.
///
/// One instance is shared between the manager (policy decisions, command
/// surface), the snapshotter (save protocol bookkeeping), and the store
/// (the dirty counter is the change-counter hook).
#[derive(Debug)]
pub struct SaveState {
    /// Mutating commands since the last successful save.
    pub dirty: Arc<AtomicU64>,
    /// Unix second of the last durable save; 0 if never.
    pub last_save_secs: AtomicU64,
    /// At-most-one-save gate.
    pub gate: SaveGate,
}

impl SaveState {
    /// Fresh state: no saves yet, nothing dirty.
    pub fn new() -> Self {
        SaveState {
            dirty: Arc::new(AtomicU64::new(0)),
            last_save_secs: AtomicU64::new(0),
            gate: SaveGate::default(),
        }
    }
}

impl Default for SaveState {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the gate when a save run ends, even on error or panic.
struct GateGuard {
    state: Arc<SaveState>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.state.gate.release();
    }
}

/// Crash-safe snapshot writer.
///
/// Owns the target path; only the active save writes a temporary file, and
/// only the final rename installs it.
pub struct Snapshotter {
    data_dir: PathBuf,
    filename: String,
    options: CodecOptions,
    state: Arc<SaveState>,
    nonce: AtomicU64,
}

impl Snapshotter {
    /// Create a snapshotter for `<data_dir>/<filename>`.
    ///
    /// Creates the data directory if absent; failure to do so is fatal to
    /// the caller (nothing can be persisted).
    pub fn new(
        data_dir: impl Into<PathBuf>,
        filename: impl Into<String>,
        options: CodecOptions,
        state: Arc<SaveState>,
    ) -> io::Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Snapshotter {
            data_dir,
            filename: filename.into(),
            options,
            state,
            nonce: AtomicU64::new(0),
        })
    }

    /// Path the snapshot is installed at.
    pub fn target_path(&self) -> PathBuf {
        self.data_dir.join(&self.filename)
    }

    fn next_temp_path(&self) -> PathBuf {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        self.data_dir.join(format!(
            "{}.tmp.{}.{}",
            self.filename,
            std::process::id(),
            nonce
        ))
    }

    /// Save synchronously on the calling thread.
    ///
    /// Blocks until the snapshot is durable. If a background save is
    /// running, waits for it to finish first.
    pub fn save_sync(&self, store: &dyn SnapshotStore) -> Result<SaveReport, SaveError> {
        self.state.gate.acquire_blocking();
        let _guard = GateGuard {
            state: Arc::clone(&self.state),
        };
        self.run_save(store)
    }

    /// Spawn a background save worker.
    ///
    /// Returns immediately. Fails fast with [`SaveError::AlreadyInProgress`]
    /// if a save is running.
    pub fn save_background(
        self: &Arc<Self>,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<BgSaveHandle, SaveError> {
        if !self.state.gate.try_acquire() {
            return Err(SaveError::AlreadyInProgress);
        }
        let guard = GateGuard {
            state: Arc::clone(&self.state),
        };

        let snapshotter = Arc::clone(self);
        let thread = std::thread::Builder::new()
            .name("ember-bgsave".to_string())
            .spawn(move || {
                // Guard moves into the worker: the gate is held for the
                // whole save and released when the worker exits, panics
                // included.
                let _guard = guard;
                let result = snapshotter.run_save(store.as_ref());
                match &result {
                    Ok(report) => info!(
                        entries = report.entries,
                        bytes = report.bytes,
                        "background save complete"
                    ),
                    Err(e) => warn!("background save failed: {e}"),
                }
                result
            })?;
        // Spawn failure drops the closure, and the guard with it, so the
        // gate is not leaked.

        Ok(BgSaveHandle { thread })
    }

    /// The shared save protocol (the gate is already held by the caller).
    ///
    /// On success: `last_save_secs` is stamped only after the rename and
    /// directory fsync, and the dirty counter drops by the value it had when
    /// the view was captured; writes racing the save stay counted.
    fn run_save(&self, store: &dyn SnapshotStore) -> Result<SaveReport, SaveError> {
        let started = Instant::now();

        let entries = store.snapshot();
        let baseline = self.state.dirty.load(Ordering::Acquire);

        let bytes = codec::encode(&entries, self.options)?;

        let target = self.target_path();
        let temp = self.next_temp_path();
        if let Err(e) = self.write_and_install(&bytes, &temp, &target) {
            remove_temp_best_effort(&temp);
            return Err(e.into());
        }

        self.state
            .last_save_secs
            .store(now_secs(), Ordering::Release);
        self.state.dirty.fetch_sub(baseline, Ordering::Release);

        Ok(SaveReport {
            entries: entries.len(),
            bytes: bytes.len(),
            path: target,
            duration: started.elapsed(),
        })
    }

    fn write_and_install(&self, bytes: &[u8], temp: &Path, target: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new().create_new(true).write(true).open(temp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(temp, target)?;

        // Rename does not imply durability of the directory entry.
        let dir = File::open(&self.data_dir)?;
        dir.sync_all()?;
        Ok(())
    }

    /// Remove stale temporary files left behind by crashed saves.
    ///
    /// Called once at startup, before recovery. Matches any
    /// `<filename>.tmp.*` sibling of the target, regardless of which process
    /// wrote it.
    pub fn cleanup_temp_files(&self) -> io::Result<usize> {
        let prefix = format!("{}.tmp.", self.filename);
        let mut count = 0;

        for entry in std::fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&prefix) {
                std::fs::remove_file(entry.path())?;
                count += 1;
            }
        }

        if count > 0 {
            debug!(count, "removed stale snapshot temp files");
        }
        Ok(count)
    }
}

fn remove_temp_best_effort(temp: &Path) {
    if temp.exists() {
        if let Err(e) = std::fs::remove_file(temp) {
            warn!("failed to remove snapshot temp file {}: {e}", temp.display());
        }
    }
}

/// Handle to an in-flight background save.
///
/// The worker's outcome is latched here; joining surfaces it exactly once.
pub struct BgSaveHandle {
    thread: JoinHandle<Result<SaveReport, SaveError>>,
}

impl BgSaveHandle {
    /// True once the worker has exited (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker and return its result.
    pub fn join(self) -> Result<SaveReport, SaveError> {
        self.thread.join().map_err(|_| SaveError::WorkerPanicked)?
    }
}
