//! Task store
//!
//! [`TaskStore`] owns the store file and runs every business operation
//! against it. There is no in-memory cache: each call re-reads the file.
//!
//! Mutations follow one protocol:
//!
//! ```text
//! acquire <store>.lock -> load -> mutate in memory -> encode -> atomic write -> release
//! ```
//!
//! The lock is an RAII guard, so it is released on every exit path. Reads
//! skip the lock; atomic replacement means they see either the old or the
//! new file, never a torn one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::atomic;
use crate::codec::{self, Decoded, LoadReport, STORE_VERSION};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock::{self, StoreLock};
use crate::task::{self, Status, Task};

/// Result of a mutation closure: whether the container must be rewritten
enum Mutation<T> {
    Persist(T),
    Unchanged(T),
}

/// File-backed task store
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout_ms: u64,
    lock_retry_interval_ms: u64,
    max_description_len: usize,
}

impl TaskStore {
    /// Open the store at `path` with default settings, creating it if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(&Config::for_store(path))
    }

    /// Open the store described by `config`, creating it if needed.
    pub fn with_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = Self {
            lock_path: lock::lock_path_for(&config.store_path),
            path: config.store_path.clone(),
            lock_timeout_ms: config.lock.timeout_ms,
            lock_retry_interval_ms: config.lock.retry_interval_ms,
            max_description_len: config.tasks.max_description_len,
        };
        store.ensure_exists()?;
        Ok(store)
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    /// Path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path to the lock marker guarding the store
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Create an empty store if none exists.
    ///
    /// Runs without the lock. Two processes bootstrapping at once both write
    /// an empty container and the last one wins.
    fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        tracing::debug!(path = %self.path.display(), "store not found, creating new store");
        atomic::write_atomic(&self.path, &codec::encode_container(STORE_VERSION, &[]))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Load and decode the whole container.
    ///
    /// A store file that vanished after open loads as empty.
    pub fn load(&self) -> Result<Decoded> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "store file missing, treating it as empty");
                return Ok(Decoded::empty());
            }
            Err(err) => return Err(Error::Io(err)),
        };
        Ok(codec::load_tasks(&bytes, Utc::now()))
    }

    /// Tasks ordered by status name then id, optionally limited to `status`.
    pub fn list(&self, status: Option<Status>) -> Result<Vec<Task>> {
        Ok(self.list_with_report(status)?.0)
    }

    /// [`list`](Self::list) plus what had to be recovered while loading.
    pub fn list_with_report(&self, status: Option<Status>) -> Result<(Vec<Task>, LoadReport)> {
        let Decoded {
            mut tasks, report, ..
        } = self.load()?;
        if let Some(status) = status {
            tasks.retain(|t| t.status == status);
        }
        task::sort_tasks(&mut tasks);
        Ok((tasks, report))
    }

    pub fn get(&self, id: u64) -> Result<Task> {
        self.load()?
            .tasks
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(Error::TaskNotFound(id))
    }

    // =========================================================================
    // Mutations (locked)
    // =========================================================================

    /// Add a `todo` task with the next id after the current maximum.
    pub fn add(&self, description: &str) -> Result<Task> {
        let description = task::validate_description(description, self.max_description_len)?;
        let task = self.mutate(|tasks| {
            let id = next_id(tasks)?;
            let task = Task::new(id, description, Utc::now());
            tasks.push(task.clone());
            Ok(Mutation::Persist(task))
        })?;
        tracing::info!(id = task.id, "added task");
        Ok(task)
    }

    /// Replace a task's description. Status and `created_at` are untouched.
    pub fn update(&self, id: u64, description: &str) -> Result<Task> {
        let description = task::validate_description(description, self.max_description_len)?;
        let task = self.mutate(|tasks| {
            let task = find_mut(tasks, id)?;
            task.set_description(description, Utc::now());
            Ok(Mutation::Persist(task.clone()))
        })?;
        tracing::info!(id, "updated task");
        Ok(task)
    }

    /// Remove a task, returning it.
    pub fn delete(&self, id: u64) -> Result<Task> {
        let removed = self.mutate(|tasks| {
            let index = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or(Error::TaskNotFound(id))?;
            Ok(Mutation::Persist(tasks.remove(index)))
        })?;
        tracing::info!(id, "deleted task");
        Ok(removed)
    }

    /// Move a task to `status` if the lifecycle allows it.
    ///
    /// Asking for the status a task already has succeeds without writing.
    pub fn change_status(&self, id: u64, status: Status) -> Result<Task> {
        self.mutate(|tasks| {
            let task = find_mut(tasks, id)?;
            if task.transition_to(status, Utc::now())? {
                tracing::info!(id, %status, "task status changed");
                Ok(Mutation::Persist(task.clone()))
            } else {
                tracing::info!(id, %status, "task already has this status");
                Ok(Mutation::Unchanged(task.clone()))
            }
        })
    }

    fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<Mutation<T>>,
    {
        let lock = StoreLock::acquire_with_interval(
            &self.lock_path,
            self.lock_timeout_ms,
            self.lock_retry_interval_ms,
        )?;

        let mut tasks = self.load()?.tasks;
        match f(&mut tasks)? {
            Mutation::Unchanged(result) => Ok(result),
            Mutation::Persist(result) => {
                let bytes = codec::encode_container(STORE_VERSION, &tasks);
                atomic::write_atomic(&self.path, &bytes)?;
                tracing::debug!(token = %lock.token(), tasks = tasks.len(), "store rewritten");
                Ok(result)
            }
        }
        // Lock released on drop
    }
}

/// One past the highest id in use. Deleting the highest task frees its id.
fn next_id(tasks: &[Task]) -> Result<u64> {
    let max = tasks.iter().map(|t| t.id).max().unwrap_or(0);
    max.checked_add(1).ok_or(Error::IdSpaceExhausted(max))
}

fn find_mut(tasks: &mut [Task], id: u64) -> Result<&mut Task> {
    tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or(Error::TaskNotFound(id))
}
