//! Atomic file replacement
//!
//! Data is staged in a temp file next to the target, synced, then renamed
//! over the target. The temp file lives in the same directory so the rename
//! never crosses a filesystem. If anything fails before the rename the temp
//! file is deleted and the target keeps its previous content.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Points in [`write_atomic_with`] where a hook runs before the rename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// The temp file exists and is empty
    Created,
    /// All data has been written but not synced
    Written,
    /// Data is synced; the rename is next
    Synced,
}

/// Atomically replace `path` with `data`.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    write_atomic_with(path, data, |_, _| Ok(()))
}

/// Atomically replace `path` with `data`, calling `hook` at each stage.
///
/// An error from the hook aborts the write exactly like an I/O failure at
/// that point would.
pub fn write_atomic_with<F>(path: impl AsRef<Path>, data: &[u8], mut hook: F) -> Result<()>
where
    F: FnMut(WriteStage, &Path) -> io::Result<()>,
{
    let path = path.as_ref();
    let file_name = path.file_name().ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", path.display()),
        ))
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Ensure parent directory exists
    fs::create_dir_all(dir)?;

    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name.to_string_lossy()))
        .suffix(".tmp")
        .tempfile_in(dir)?;
    hook(WriteStage::Created, temp.path())?;

    temp.write_all(data)?;
    temp.flush()?;
    hook(WriteStage::Written, temp.path())?;

    // Keep the mode of the file being replaced
    if let Ok(meta) = fs::metadata(path) {
        temp.as_file().set_permissions(meta.permissions())?;
    }
    temp.as_file().sync_all()?;
    hook(WriteStage::Synced, temp.path())?;

    temp.persist(path).map_err(|err| Error::Io(err.error))?;
    sync_dir(dir);

    tracing::debug!(path = %path.display(), bytes = data.len(), "atomic write complete");
    Ok(())
}

/// Make the rename itself durable. Not every platform allows opening a
/// directory, so failure here is only logged.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        if let Err(err) = fs::File::open(dir).and_then(|d| d.sync_all()) {
            tracing::debug!(dir = %dir.display(), error = %err, "directory sync failed");
        }
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
}
