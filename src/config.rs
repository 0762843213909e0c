//! Configuration loading and management
//!
//! Handles parsing of `.task-tracker.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::lock::{DEFAULT_LOCK_RETRY_INTERVAL_MS, DEFAULT_LOCK_TIMEOUT_MS};
use crate::task::DEFAULT_MAX_DESCRIPTION_LEN;

/// Name of the per-directory configuration file
pub const CONFIG_FILE: &str = ".task-tracker.toml";

/// Environment variable overriding the store path
pub const STORE_PATH_ENV: &str = "TASKS_FILE";

/// Environment variable overriding the lock timeout
pub const LOCK_TIMEOUT_ENV: &str = "TASKS_LOCK_TIMEOUT_MS";

/// Environment variable naming a file that also receives log output
pub const LOG_FILE_ENV: &str = "TASK_TRACKER_LOG";

const MAX_DESCRIPTION_LEN_LIMIT: usize = 100_000;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the store file
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Lock configuration
    #[serde(default)]
    pub lock: LockConfig,

    /// Task validation configuration
    #[serde(default)]
    pub tasks: TasksConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            lock: LockConfig::default(),
            tasks: TasksConfig::default(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("tasks.json")
}

/// Lock-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// How long a mutation waits for the store lock
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,

    /// Sleep between lock attempts
    #[serde(default = "default_lock_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

fn default_lock_retry_interval_ms() -> u64 {
    DEFAULT_LOCK_RETRY_INTERVAL_MS
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_lock_timeout_ms(),
            retry_interval_ms: default_lock_retry_interval_ms(),
        }
    }
}

/// Tasks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Longest accepted description, in characters
    #[serde(default = "default_max_description_len")]
    pub max_description_len: usize,
}

fn default_max_description_len() -> usize {
    DEFAULT_MAX_DESCRIPTION_LEN
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            max_description_len: default_max_description_len(),
        }
    }
}

impl Config {
    /// Defaults with a specific store path
    pub fn for_store(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.task-tracker.toml` from `dir`, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Apply `TASKS_FILE` and `TASKS_LOCK_TIMEOUT_MS` from the environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var_os(STORE_PATH_ENV).map(PathBuf::from),
            std::env::var(LOCK_TIMEOUT_ENV).ok(),
        )
    }

    fn apply_overrides(
        &mut self,
        store_path: Option<PathBuf>,
        lock_timeout: Option<String>,
    ) -> Result<()> {
        if let Some(path) = store_path.filter(|p| !p.as_os_str().is_empty()) {
            self.store_path = path;
        }
        if let Some(raw) = lock_timeout {
            self.lock.timeout_ms = raw.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!("{LOCK_TIMEOUT_ENV}: not a number: '{raw}'"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.store_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("store_path cannot be empty".to_string()));
        }
        if self.lock.retry_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "lock.retry_interval_ms must be >= 1".to_string(),
            ));
        }
        let max_len = self.tasks.max_description_len;
        if max_len == 0 || max_len > MAX_DESCRIPTION_LEN_LIMIT {
            return Err(Error::InvalidConfig(format!(
                "tasks.max_description_len must be in 1..={MAX_DESCRIPTION_LEN_LIMIT}"
            )));
        }
        Ok(())
    }
}
