//! Exclusive working-copy lock.

use crate::error::{Result, TangleError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the lock file inside the `.tangle` directory.
pub const LOCK_FILE: &str = "LOCK";

const MAX_RETRIES: u32 = 2;

/// RAII guard for the working-copy lock.
///
/// The lock file holds the PID of the owning process and is removed when the
/// guard is dropped.
#[derive(Debug)]
pub struct LockGuard {
    /// Wrapped in Option so Drop can close it before removing the file.
    file: Option<File>,
    path: PathBuf,
}

impl LockGuard {
    /// Acquires the lock in `tangle_dir`.
    ///
    /// A lock left behind by a dead process is removed and acquisition is
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns `LockHeld` if a live process owns the lock, or
    /// `WorkingCopyLocked` if the owner cannot be determined.
    pub fn acquire(tangle_dir: &Path) -> Result<Self> {
        let path = tangle_dir.join(LOCK_FILE);
        Self::acquire_with_retry(path, 0)
    }

    /// Returns the lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn acquire_with_retry(path: PathBuf, retry_count: u32) -> Result<Self> {
        if retry_count > MAX_RETRIES {
            return Err(TangleError::WorkingCopyLocked);
        }

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                file.flush()?;
                file.try_lock_exclusive()
                    .map_err(|_| TangleError::WorkingCopyLocked)?;

                debug!(path = %path.display(), "acquired working copy lock");
                Ok(Self {
                    file: Some(file),
                    path,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Self::handle_existing(path, retry_count)
            }
            Err(e) => Err(TangleError::Io(e)),
        }
    }

    fn handle_existing(path: PathBuf, retry_count: u32) -> Result<Self> {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Self::acquire_with_retry(path, retry_count + 1);
            }
            Err(_) => return Err(TangleError::WorkingCopyLocked),
        };

        match content.trim().parse::<u32>() {
            Ok(pid) if is_process_alive(pid) => Err(TangleError::LockHeld { pid }),
            Ok(pid) => {
                warn!(pid, "removing stale working copy lock from dead process");
                remove_if_present(&path)?;
                Self::acquire_with_retry(path, retry_count + 1)
            }
            Err(_) => {
                warn!(path = %path.display(), "lock file has invalid content, removing it");
                remove_if_present(&path)?;
                Self::acquire_with_retry(path, retry_count + 1)
            }
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
        }
        let _ = fs::remove_file(&self.path);
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TangleError::Io(e)),
    }
}

/// Zombie processes keep a /proc entry, so /proc/{pid}/stat is checked.
#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}/stat", pid)).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(true)
}

/// Stale locks are never cleaned automatically here.
#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}
