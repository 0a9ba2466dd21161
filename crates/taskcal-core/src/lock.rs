//! Process-wide run lock.
//!
//! Reconcile runs against one sheet must never interleave. Each run takes an
//! exclusive advisory lock (fs2/flock) on a lock file next to the sheet,
//! waiting a bounded amount of time. The lock is released when the guard is
//! dropped, on every exit path.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::LockError;

/// Default wait for a concurrent run to finish.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry interval while waiting for the lock.
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

fn is_lock_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }

    // fs2 surfaces Windows sharing/lock violations as raw OS errors.
    #[cfg(windows)]
    {
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

/// Lock file location plus how long to wait for it.
#[derive(Debug, Clone)]
pub struct RunLock {
    path: PathBuf,
    timeout: Duration,
}

impl RunLock {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Acquire the lock, waiting up to the configured timeout.
    pub fn acquire(&self) -> Result<RunLockGuard, LockError> {
        let io_err = |source: io::Error| LockError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(io_err)?;

        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    tracing::debug!(path = %self.path.display(), "acquired run lock");
                    return Ok(RunLockGuard {
                        file,
                        path: self.path.clone(),
                    });
                }
                Err(e) if is_lock_contended(&e) => {
                    let waited = start.elapsed();
                    if waited >= self.timeout {
                        return Err(LockError::Timeout {
                            path: self.path.clone(),
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    std::thread::sleep(LOCK_RETRY_INTERVAL.min(self.timeout - waited));
                }
                Err(e) => return Err(io_err(e)),
            }
        }
    }
}

/// Held run lock; unlocks on drop.
#[derive(Debug)]
pub struct RunLockGuard {
    file: File,
    path: PathBuf,
}

impl RunLockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release run lock");
        } else {
            tracing::debug!(path = %self.path.display(), "released run lock");
        }
    }
}
