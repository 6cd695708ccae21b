//! Advisory per-`(job, proc)` file locking, used by the Orchestrator to
//! serialise concurrent `bpm` invocations against the same container.
//!
//! Uses `flock(2)`: non-blocking acquisition, released automatically (by
//! the kernel, and explicitly for clarity) when the guard is dropped.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::constants::timeouts;
use crate::error::BpmError;

/// Exclusivity requested when acquiring a [`ProcessLock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockMode {
    /// `start`/`stop`: mutating operations that must not race each other.
    Exclusive,
    /// `list`/`pid`/`trace`/`shell`: read-only observation.
    Shared,
}

impl LockMode {
    fn flock_flag(self) -> libc::c_int {
        match self {
            LockMode::Exclusive => libc::LOCK_EX,
            LockMode::Shared => libc::LOCK_SH,
        }
    }
}

/// A held advisory lock. Dropping it releases the lock.
pub struct ProcessLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl ProcessLock {
    /// Attempt to acquire `mode` on `lock_path`, retrying at
    /// [`timeouts::LOCK_RETRY_INTERVAL`] until [`timeouts::LOCK_RETRY_WINDOW`]
    /// elapses. Surfaces [`BpmError::Busy`] on timeout.
    pub fn acquire(lock_path: &Path, mode: LockMode) -> Result<Self, BpmError> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BpmError::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| BpmError::io(lock_path, e))?;

        let deadline = Instant::now() + timeouts::LOCK_RETRY_WINDOW;
        loop {
            let fd = file.as_raw_fd();
            let result = unsafe { libc::flock(fd, mode.flock_flag() | libc::LOCK_NB) };
            if result == 0 {
                tracing::debug!(lock_path = %lock_path.display(), ?mode, "acquired advisory lock");
                return Ok(ProcessLock {
                    file,
                    path: lock_path.to_path_buf(),
                });
            }

            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::WouldBlock {
                return Err(BpmError::io(lock_path, err));
            }
            if Instant::now() >= deadline {
                return Err(BpmError::Busy(lock_path.display().to_string()));
            }
            std::thread::sleep(timeouts::LOCK_RETRY_INTERVAL);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        let fd = self.file.as_raw_fd();
        unsafe {
            libc::flock(fd, libc::LOCK_UN);
        }
        tracing::debug!(lock_path = %self.path.display(), "released advisory lock");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn exclusive_lock_excludes_second_exclusive() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nginx-web.lock");
        let _first = ProcessLock::acquire(&path, LockMode::Exclusive).unwrap();

        let path2 = path.clone();
        let handle = thread::spawn(move || ProcessLock::acquire(&path2, LockMode::Exclusive));
        // Give the background thread a chance to hit the non-blocking flock call.
        thread::sleep(std::time::Duration::from_millis(10));
        // It should still be blocked (busy) once its retry window elapses.
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(BpmError::Busy(_))));
    }

    #[test]
    fn lock_released_on_drop_allows_reacquire() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nginx-web.lock");
        {
            let _lock = ProcessLock::acquire(&path, LockMode::Exclusive).unwrap();
        }
        let _lock2 = ProcessLock::acquire(&path, LockMode::Exclusive).unwrap();
    }

    #[test]
    fn shared_locks_do_not_exclude_each_other() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Arc::new(tmp.path().join("nginx-web.lock"));
        let _first = ProcessLock::acquire(&path, LockMode::Shared).unwrap();
        let _second = ProcessLock::acquire(&path, LockMode::Shared).unwrap();
    }
}
