// Pid file with an exclusive advisory lock - single instance enforcement
// flock is cooperative: only other macrokeyd instances check it, which is
// all the singleton guarantee needs.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Why the instance lock could not be taken. Both variants are fatal to
/// startup: the daemon must not run twice against the same pid file.
#[derive(Debug, Error)]
pub enum LockError {
    /// The pid file could not be created or opened, or the lock call
    /// itself failed for a reason other than contention.
    #[error("pid file {path} unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another process already holds the lock.
    #[error("pid file {path} is locked, another instance is already running")]
    AlreadyRunning { path: PathBuf },
}

/// An open pid file holding `flock(LOCK_EX)` for the daemon's lifetime.
///
/// Dropping the handle unlocks, closes, and removes the file. If the
/// process dies without dropping it, the kernel releases the lock but
/// the stale file stays behind; the next `acquire` locks straight over
/// it, so no recovery step is needed.
#[derive(Debug)]
pub struct PidFile {
    file: File,
    path: PathBuf,
}

impl PidFile {
    /// Create or open the pid file at `path` (mode 0644) and take a
    /// non-blocking exclusive lock on it.
    pub fn acquire(path: &Path) -> Result<PidFile, LockError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o644)
            .open(path)
            .map_err(|source| LockError::Unavailable {
                path: path.to_path_buf(),
                source,
            })?;

        // SAFETY: flock is a plain POSIX call on a descriptor that `file`
        // keeps open for the duration of the call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
                return Err(LockError::AlreadyRunning {
                    path: path.to_path_buf(),
                });
            }
            return Err(LockError::Unavailable {
                path: path.to_path_buf(),
                source: err,
            });
        }

        let lock = PidFile {
            file,
            path: path.to_path_buf(),
        };

        // The file content is informational only; the lock is what counts.
        if let Err(err) = lock.write_pid() {
            warn!(path = %lock.path.display(), error = %err, "could not record pid in pid file");
        }

        debug!(path = %lock.path.display(), "instance lock acquired");
        Ok(lock)
    }

    /// Unlock, close, and remove the pid file. Equivalent to dropping
    /// the handle; provided so the terminal path can release explicitly.
    pub fn release(self) {
        drop(self);
    }

    /// Path the lock was taken on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_pid(&self) -> io::Result<()> {
        self.file.set_len(0)?;
        let mut file = &self.file;
        writeln!(file, "{}", std::process::id())?;
        file.flush()
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        // SAFETY: the descriptor is still open; close happens after this.
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "could not remove pid file");
        } else {
            debug!(path = %self.path.display(), "instance lock released");
        }
    }
}
