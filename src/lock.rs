//! Store locking
//!
//! Mutations are serialized across processes with a sibling marker file,
//! `<store>.lock`:
//! - Acquire is a single exclusive create (`O_CREAT | O_EXCL`), so two
//!   racing processes can never both succeed
//! - Contended acquires retry on a fixed interval until the timeout elapses
//! - Release deletes the marker; a marker that is already gone is fine
//!
//! The marker holds the holder's pid, a token and the acquisition time. It
//! is written for humans inspecting a stuck store and is never read back to
//! decide anything.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Default retry interval when waiting for a lock
pub const DEFAULT_LOCK_RETRY_INTERVAL_MS: u64 = 80;

/// Suffix appended to the store path to form the lock path
pub const LOCK_SUFFIX: &str = "lock";

/// Lock path guarding `store_path`
pub fn lock_path_for(store_path: impl AsRef<Path>) -> PathBuf {
    let mut raw = store_path.as_ref().as_os_str().to_os_string();
    raw.push(".");
    raw.push(LOCK_SUFFIX);
    PathBuf::from(raw)
}

fn is_lock_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::AlreadyExists {
        return true;
    }

    // On Windows, creating a file that is pending deletion fails with
    // "access denied". The previous holder is mid-release.
    #[cfg(windows)]
    {
        err.kind() == io::ErrorKind::PermissionDenied
    }
    #[cfg(not(windows))]
    {
        false
    }
}

/// Diagnostic content of a lock file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub token: Uuid,
    pub acquired_at: DateTime<Utc>,
}

/// An exclusive store lock that is released when dropped
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    token: Uuid,
    released: bool,
}

impl StoreLock {
    /// Acquire the lock at `path`, retrying at the default interval.
    ///
    /// Returns [`Error::LockTimeout`] if it is still held after `timeout_ms`.
    pub fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        Self::acquire_with_interval(path, timeout_ms, DEFAULT_LOCK_RETRY_INTERVAL_MS)
    }

    /// Acquire the lock at `path` with an explicit retry interval.
    ///
    /// A `timeout_ms` of 0 makes exactly one attempt.
    pub fn acquire_with_interval(
        path: impl AsRef<Path>,
        timeout_ms: u64,
        retry_interval_ms: u64,
    ) -> Result<Self> {
        let path = path.as_ref();
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let retry_interval = Duration::from_millis(retry_interval_ms.max(1));

        loop {
            if let Some(lock) = Self::try_acquire(path)? {
                return Ok(lock);
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                tracing::debug!(path = %path.display(), waited_ms = elapsed.as_millis() as u64, "store lock timed out");
                return Err(Error::LockTimeout {
                    path: path.to_path_buf(),
                    waited_ms: elapsed.as_millis() as u64,
                });
            }
            std::thread::sleep(retry_interval.min(timeout - elapsed));
        }
    }

    /// Try to acquire the lock without waiting
    ///
    /// Returns `Ok(Some(lock))` if acquired, `Ok(None)` if another holder
    /// has it, or `Err` for other errors.
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if is_lock_contended(&e) => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };

        let holder = LockHolder {
            pid: std::process::id(),
            token: Uuid::new_v4(),
            acquired_at: Utc::now(),
        };
        // The marker's existence is the lock; its content is best-effort.
        if let Err(err) = serde_json::to_vec_pretty(&holder)
            .map_err(io::Error::from)
            .and_then(|bytes| file.write_all(&bytes))
        {
            tracing::debug!(path = %path.display(), error = %err, "could not record lock holder");
        }

        tracing::debug!(path = %path.display(), token = %holder.token, "store lock acquired");
        Ok(Some(StoreLock {
            path: path.to_path_buf(),
            token: holder.token,
            released: false,
        }))
    }

    /// Read who currently holds the lock at `path`, if anyone.
    pub fn holder(path: impl AsRef<Path>) -> Option<LockHolder> {
        let bytes = fs::read(path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    /// Release the lock, reporting failure to remove the marker.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        remove_lock_file(&self.path)?;
        tracing::debug!(path = %self.path.display(), "store lock released");
        Ok(())
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match remove_lock_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "store lock released"),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to remove lock file")
            }
        }
    }
}

fn remove_lock_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
