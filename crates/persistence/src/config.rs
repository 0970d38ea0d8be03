//! Persistence configuration via `ember.toml`
//!
//! A simple config file in the data directory. On first open, a default
//! `ember.toml` is created. To change settings, edit the file and restart,
//! same model as Redis.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::CodecOptions;

/// Config file name placed in the data directory.
pub const CONFIG_FILE_NAME: &str = "ember.toml";

/// Default snapshot file name.
pub const DEFAULT_RDB_FILENAME: &str = "dump.rdb";

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// One automatic-save trigger: "at least `min_changes` mutations and at
/// least `window_secs` seconds since the last save".
///
/// Serialized as a `[window_secs, min_changes]` pair, so the config file
/// reads like Redis's `save 900 1` lines:
///
/// ```toml
/// rdb_save_conditions = [[900, 1], [300, 10], [60, 10000]]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct SaveRule {
    /// Minimum seconds since the last successful save.
    pub window_secs: u32,
    /// Minimum mutations since the last successful save.
    pub min_changes: u32,
}

impl SaveRule {
    /// Create a rule from its window and change threshold.
    pub fn new(window_secs: u32, min_changes: u32) -> Self {
        SaveRule {
            window_secs,
            min_changes,
        }
    }

    /// True when both thresholds are met.
    pub fn is_satisfied(&self, dirty: u64, elapsed_secs: u64) -> bool {
        dirty >= u64::from(self.min_changes) && elapsed_secs >= u64::from(self.window_secs)
    }
}

impl From<(u32, u32)> for SaveRule {
    fn from((window_secs, min_changes): (u32, u32)) -> Self {
        SaveRule::new(window_secs, min_changes)
    }
}

impl From<SaveRule> for (u32, u32) {
    fn from(rule: SaveRule) -> Self {
        (rule.window_secs, rule.min_changes)
    }
}

/// Persistence configuration loaded from `ember.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistenceConfig {
    /// Master switch. When false, no snapshots are written or loaded;
    /// `SAVE` becomes a successful no-op.
    #[serde(default = "default_true")]
    pub rdb_enabled: bool,
    /// Snapshot file name within `data_dir`.
    #[serde(default = "default_rdb_filename")]
    pub rdb_filename: String,
    /// Directory holding the snapshot file. Created if absent.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Gzip-compress the snapshot payload on write. Reads always obey the
    /// file's own flags.
    #[serde(default = "default_true")]
    pub rdb_compression: bool,
    /// Append a CRC32 to the snapshot on write. Reads always obey the
    /// file's own flags.
    #[serde(default = "default_true")]
    pub rdb_checksum: bool,
    /// Automatic-save rules, evaluated independently; any match triggers a
    /// background save. Empty disables automatic saves (the policy loop
    /// still runs as the shutdown-wake mechanism, but nothing can fire).
    #[serde(default = "default_save_conditions")]
    pub rdb_save_conditions: Vec<SaveRule>,
}

fn default_true() -> bool {
    true
}

fn default_rdb_filename() -> String {
    DEFAULT_RDB_FILENAME.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_save_conditions() -> Vec<SaveRule> {
    vec![
        SaveRule::new(900, 1),
        SaveRule::new(300, 10),
        SaveRule::new(60, 10_000),
    ]
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            rdb_enabled: true,
            rdb_filename: default_rdb_filename(),
            data_dir: default_data_dir(),
            rdb_compression: true,
            rdb_checksum: true,
            rdb_save_conditions: default_save_conditions(),
        }
    }
}

impl PersistenceConfig {
    /// Full path of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.rdb_filename)
    }

    /// Codec options the two format switches select.
    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions::from_flags(self.rdb_compression, self.rdb_checksum)
    }

    /// Load `ember.toml` from `dir`, writing a commented default file on
    /// first open.
    ///
    /// `dir` is authoritative for `data_dir`: the directory the config file
    /// lives in is the data directory, whatever an edited file claims.
    pub fn load_or_create(dir: &Path) -> Result<Self, ConfigError> {
        std::fs::create_dir_all(dir)?;
        let config_path = dir.join(CONFIG_FILE_NAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: config_path.clone(),
                source: e,
            })?
        } else {
            std::fs::write(&config_path, Self::default_toml())?;
            PersistenceConfig::default()
        };

        config.data_dir = dir.to_path_buf();
        Ok(config)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Ember persistence configuration
#
# rdb_enabled      = master switch; false disables snapshots entirely
# rdb_filename     = snapshot file name within the data directory
# rdb_compression  = gzip the snapshot payload
# rdb_checksum     = append a CRC32 for corruption detection
#
# rdb_save_conditions: background-save triggers, each [seconds, changes].
# A save runs when any pair is satisfied since the last save.

rdb_enabled = true
rdb_filename = "dump.rdb"
rdb_compression = true
rdb_checksum = true
rdb_save_conditions = [[900, 1], [300, 10], [60, 10000]]
"#
    }
}

/// Errors that can occur loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem error reading or creating the config file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The config file is not valid TOML for this schema
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path of the offending file
        path: PathBuf,
        /// Underlying TOML error
        source: toml::de::Error,
    },
}
