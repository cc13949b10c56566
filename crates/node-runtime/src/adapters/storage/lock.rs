//! Exclusive data directory ownership.
//!
//! `fs2` lock on a `.lock` file (flock on Unix, LockFile on Windows). The
//! owner's PID is written into the file for diagnostics.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use tracing::warn;

use super::StorageError;

const LOCK_FILE: &str = ".lock";

/// Advisory exclusive lock on a data directory, released on drop.
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
}

impl DataDirLock {
    /// Create `dir` if needed and lock it, failing fast if another process holds it.
    pub fn acquire(dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(dir).map_err(|e| StorageError::Io {
            message: format!("failed to create {}: {}", dir.display(), e),
        })?;

        let path = dir.join(LOCK_FILE);
        // Not truncated before locking: the holder's PID must survive a failed attempt.
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StorageError::Io {
                message: format!("failed to open {}: {}", path.display(), e),
            })?;

        if FileExt::try_lock_exclusive(&file).is_err() {
            warn!(
                path = %dir.display(),
                holder = ?read_holder_pid(&path),
                "Data directory is locked"
            );
            return Err(StorageError::Locked {
                path: dir.to_path_buf(),
            });
        }

        let pid = std::process::id();
        file.set_len(0)
            .and_then(|()| {
                writeln!(file, "{}", pid)?;
                file.sync_all()
            })
            .map_err(|e| StorageError::Io {
                message: format!("failed to write {}: {}", path.display(), e),
            })?;

        Ok(Self { file })
    }
}

fn read_holder_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
