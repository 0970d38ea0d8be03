//! Persistence manager: policy engine and command surface
//!
//! Owns the mutable persistence state (dirty counter, last-save stamp, save
//! gate), runs the background policy loop, and exposes the `SAVE` /
//! `BGSAVE` / `LASTSAVE` contract to the command layer.
//!
//! # Lifecycle
//!
//! `Created` → (start) → `Running` → (shutdown) → `Draining` → `Stopped`.
//! Commands are accepted only while `Running`; shutdown drains any in-flight
//! background save and writes one final snapshot if persistence is enabled.
//!
//! # Policy loop
//!
//! One dedicated thread wakes every second, checks whether any configured
//! `(window, changes)` rule is satisfied, and if so launches a background
//! save. Failed saves are logged and the dirty counter is left untouched, so
//! the next tick retries.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

use ember_core::{now_secs, SnapshotStore};

use crate::config::PersistenceConfig;
use crate::snapshot::{BgSaveHandle, SaveError, SaveReport, SaveState, Snapshotter};

/// Reply the command layer sends for an accepted `BGSAVE`.
pub const BGSAVE_STARTED_REPLY: &str = "Background RDB save started";

/// Cadence of the policy loop.
const POLICY_TICK: Duration = Duration::from_secs(1);

/// Result type alias for manager operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors surfaced to the command layer
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Command arrived while draining or stopped
    #[error("persistence manager is not running")]
    NotRunning,
    /// The underlying save failed or was rejected
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// Lifecycle states, stored as an atomic byte.
mod lifecycle {
    pub const CREATED: u8 = 0;
    pub const RUNNING: u8 = 1;
    pub const DRAINING: u8 = 2;
    pub const STOPPED: u8 = 3;
}

struct ManagerShared {
    config: PersistenceConfig,
    store: Arc<dyn SnapshotStore>,
    snapshotter: Arc<Snapshotter>,
    state: Arc<SaveState>,
    lifecycle: AtomicU8,
    /// Policy-loop stop flag; the condvar lets shutdown interrupt a tick
    /// sleep immediately.
    stop: Mutex<bool>,
    stop_cond: Condvar,
    /// Latched handle of the most recent background save.
    bg_handle: Mutex<Option<BgSaveHandle>>,
}

impl ManagerShared {
    /// One policy evaluation: fire a background save if any rule matches.
    fn evaluate_policies(&self) {
        if self.lifecycle.load(Ordering::Acquire) != lifecycle::RUNNING {
            return;
        }
        if self.state.gate.is_held() {
            return;
        }

        let dirty = self.state.dirty.load(Ordering::Acquire);
        let last = self.state.last_save_secs.load(Ordering::Acquire);
        let elapsed = now_secs().saturating_sub(last);

        let matched = self
            .config
            .rdb_save_conditions
            .iter()
            .find(|rule| rule.is_satisfied(dirty, elapsed));
        let Some(rule) = matched else { return };

        info!(
            dirty,
            elapsed,
            window = rule.window_secs,
            changes = rule.min_changes,
            "save policy triggered, starting background save"
        );
        self.reap_finished_save();
        match self.snapshotter.save_background(Arc::clone(&self.store)) {
            Ok(handle) => *self.bg_handle.lock() = Some(handle),
            Err(SaveError::AlreadyInProgress) => {
                debug!("save already in progress, skipping policy save")
            }
            Err(e) => warn!("failed to start policy-triggered save: {e}"),
        }
    }

    /// Join a finished background save and log its latched outcome.
    /// The dirty counter is never touched on failure, so the next policy
    /// tick retries.
    fn reap_finished_save(&self) {
        let mut slot = self.bg_handle.lock();
        if slot.as_ref().is_some_and(BgSaveHandle::is_finished) {
            if let Some(handle) = slot.take() {
                if let Err(e) = handle.join() {
                    warn!("background save failed: {e}");
                }
            }
        }
    }
}

fn policy_loop(shared: Arc<ManagerShared>) {
    loop {
        {
            let mut stop = shared.stop.lock();
            if !*stop {
                shared.stop_cond.wait_for(&mut stop, POLICY_TICK);
            }
            if *stop {
                return;
            }
        }
        shared.evaluate_policies();
    }
}

/// Policy engine and command surface of the persistence core.
///
/// All mutable persistence state lives here; the command layer receives a
/// reference at construction, there is no process-wide singleton.
pub struct PersistenceManager {
    shared: Arc<ManagerShared>,
    policy_thread: Mutex<Option<JoinHandle<()>>>,
}

impl PersistenceManager {
    /// Create a manager over `store` with the given configuration.
    ///
    /// Creates the data directory if absent; that failure is fatal (nothing
    /// can be persisted). The manager starts in `Created`; call
    /// [`start`](Self::start) after recovery has run.
    pub fn new(
        config: PersistenceConfig,
        store: Arc<dyn SnapshotStore>,
    ) -> std::io::Result<Self> {
        let state = Arc::new(SaveState::new());
        let snapshotter = Arc::new(Snapshotter::new(
            config.data_dir.clone(),
            config.rdb_filename.clone(),
            config.codec_options(),
            Arc::clone(&state),
        )?);

        Ok(PersistenceManager {
            shared: Arc::new(ManagerShared {
                config,
                store,
                snapshotter,
                state,
                lifecycle: AtomicU8::new(lifecycle::CREATED),
                stop: Mutex::new(false),
                stop_cond: Condvar::new(),
                bg_handle: Mutex::new(None),
            }),
            policy_thread: Mutex::new(None),
        })
    }

    /// The snapshotter this manager drives. Exposed for startup-time temp
    /// file cleanup.
    pub fn snapshotter(&self) -> &Arc<Snapshotter> {
        &self.shared.snapshotter
    }

    /// Clone of the shared mutation counter, for attaching to the store.
    pub fn change_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.shared.state.dirty)
    }

    /// Transition `Created` → `Running` and spawn the policy loop.
    /// No-op if already started.
    pub fn start(&self) {
        if self
            .shared
            .lifecycle
            .compare_exchange(
                lifecycle::CREATED,
                lifecycle::RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        if !self.shared.config.rdb_enabled {
            debug!("persistence disabled, policy loop not started");
            return;
        }

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("ember-save-policy".to_string())
            .spawn(move || policy_loop(shared));
        match handle {
            Ok(handle) => *self.policy_thread.lock() = Some(handle),
            Err(e) => warn!("failed to spawn save-policy thread: {e}"),
        }
    }

    /// Record one mutating command. O(1), never blocks beyond the atomic
    /// increment.
    pub fn note_write(&self) {
        self.shared.state.dirty.fetch_add(1, Ordering::Relaxed);
    }

    /// Mutations since the last successful save.
    pub fn dirty_count(&self) -> u64 {
        self.shared.state.dirty.load(Ordering::Acquire)
    }

    /// `LASTSAVE`: Unix second of the last durable save (0 if never).
    pub fn last_save(&self) -> u64 {
        self.shared.state.last_save_secs.load(Ordering::Acquire)
    }

    /// `SAVE`: synchronous snapshot on the calling thread.
    ///
    /// Serializes behind any running background save. Returns `Ok(None)`
    /// when persistence is disabled (the command still replies `+OK`).
    pub fn save(&self) -> PersistenceResult<Option<SaveReport>> {
        self.ensure_running()?;
        if !self.shared.config.rdb_enabled {
            return Ok(None);
        }
        let report = self.shared.snapshotter.save_sync(self.shared.store.as_ref())?;
        Ok(Some(report))
    }

    /// `BGSAVE`: launch a background save and return immediately.
    ///
    /// On success the command layer replies [`BGSAVE_STARTED_REPLY`]. Fails
    /// with [`SaveError::AlreadyInProgress`] if a save is running.
    pub fn bgsave(&self) -> PersistenceResult<()> {
        self.ensure_running()?;
        if !self.shared.config.rdb_enabled {
            return Ok(());
        }

        self.shared.reap_finished_save();
        let handle = self
            .shared
            .snapshotter
            .save_background(Arc::clone(&self.shared.store))?;
        *self.shared.bg_handle.lock() = Some(handle);
        Ok(())
    }

    /// Drain in-flight work and write the final snapshot.
    ///
    /// After the first call, `save`/`bgsave` are rejected with `NotRunning`.
    /// Idempotent; concurrent and repeated calls are safe.
    pub fn shutdown(&self) {
        match self.shared.lifecycle.compare_exchange(
            lifecycle::RUNNING,
            lifecycle::DRAINING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {}
            Err(lifecycle::CREATED) => {
                // Never started; nothing to drain, nothing to save.
                self.shared
                    .lifecycle
                    .store(lifecycle::STOPPED, Ordering::Release);
                return;
            }
            Err(_) => return,
        }

        // Stop the policy loop.
        {
            let mut stop = self.shared.stop.lock();
            *stop = true;
            self.shared.stop_cond.notify_all();
        }
        if let Some(handle) = self.policy_thread.lock().take() {
            let _ = handle.join();
        }

        // Drain the in-flight background save, if any.
        if let Some(handle) = self.shared.bg_handle.lock().take() {
            match handle.join() {
                Ok(report) => debug!(entries = report.entries, "drained background save"),
                Err(e) => warn!("background save failed during shutdown: {e}"),
            }
        }
        self.shared.state.gate.wait_idle();

        if self.shared.config.rdb_enabled {
            match self
                .shared
                .snapshotter
                .save_sync(self.shared.store.as_ref())
            {
                Ok(report) => info!(
                    entries = report.entries,
                    bytes = report.bytes,
                    "final snapshot written on shutdown"
                ),
                Err(e) => warn!("final save on shutdown failed: {e}"),
            }
        }

        self.shared
            .lifecycle
            .store(lifecycle::STOPPED, Ordering::Release);
    }

    fn ensure_running(&self) -> PersistenceResult<()> {
        if self.shared.lifecycle.load(Ordering::Acquire) == lifecycle::RUNNING {
            Ok(())
        } else {
            Err(PersistenceError::NotRunning)
        }
    }
}
