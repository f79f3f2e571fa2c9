//! Advisory file lock around the history read-modify-write cycle.
//!
//! Lock strategy:
//! - `<history file>.lock` sits next to the history file.
//! - The lock is an exclusive OS file lock (flock), held only while one
//!   append re-reads, updates and rewrites the history.
//! - Other relscope processes block until the lock is released.

use crate::Result;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Held for the duration of one history update. Unlocks on drop.
pub(crate) struct HistoryLock {
    file: File,
    path: PathBuf,
}

impl HistoryLock {
    /// Block until the lock for `history_path` is ours.
    pub(crate) fn acquire(history_path: &Path) -> Result<Self> {
        let path = lock_path(history_path);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        lock_file(&file)?;
        tracing::trace!(lock = %path.display(), "History lock acquired");
        Ok(Self { file, path })
    }
}

impl Drop for HistoryLock {
    fn drop(&mut self) {
        let _ = unlock_file(&self.file);
        tracing::trace!(lock = %self.path.display(), "History lock released");
    }
}

fn lock_path(history_path: &Path) -> PathBuf {
    let mut name = history_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "history".into());
    name.push(".lock");
    history_path.with_file_name(name)
}

#[cfg(unix)]
fn lock_file(file: &File) -> io::Result<()> {
    use std::os::fd::AsRawFd;
    const LOCK_EX: i32 = 2;
    let fd = file.as_raw_fd();
    loop {
        // SAFETY: flock is called with a valid file descriptor and constant flags.
        let rc = unsafe { flock(fd, LOCK_EX) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(unix)]
fn unlock_file(file: &File) -> io::Result<()> {
    use std::os::fd::AsRawFd;
    const LOCK_UN: i32 = 8;
    let fd = file.as_raw_fd();
    // SAFETY: flock is called with a valid file descriptor and constant flags.
    let rc = unsafe { flock(fd, LOCK_UN) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
unsafe extern "C" {
    fn flock(fd: i32, operation: i32) -> i32;
}

// Single-process platforms: the lock file still exists, but updates are not
// serialized across processes.
#[cfg(not(unix))]
fn lock_file(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn unlock_file(_file: &File) -> io::Result<()> {
    Ok(())
}
