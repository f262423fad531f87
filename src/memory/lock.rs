//! Advisory file locking via `flock(2)`.
//!
//! Readers take a shared lock and writers an exclusive one for the duration of
//! a single read or write. This serializes access from several processes that
//! share one memory file; it does not make load→mutate→save atomic, so the last
//! writer still wins.
//!
//! On non-Unix targets the helpers do plain reads and writes.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

use crate::error::PersistenceError;

/// Holds an open file whose descriptor carries an advisory lock.
/// The lock is released on drop.
struct LockedFile {
    file: File,
}

impl LockedFile {
    #[cfg(unix)]
    fn acquire(file: File, exclusive: bool) -> std::io::Result<Self> {
        let operation = if exclusive { libc::LOCK_EX } else { libc::LOCK_SH };
        // SAFETY: the fd belongs to `file`, which outlives this call.
        let ret = unsafe { libc::flock(file.as_raw_fd(), operation) };
        if ret != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(Self { file })
    }

    #[cfg(not(unix))]
    fn acquire(file: File, _exclusive: bool) -> std::io::Result<Self> {
        Ok(Self { file })
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        unlock(&self.file);
    }
}

#[cfg(unix)]
fn unlock(file: &File) {
    // SAFETY: the fd is still owned by `file`. A failed unlock is harmless,
    // closing the fd right after releases the lock anyway.
    unsafe {
        libc::flock(file.as_raw_fd(), libc::LOCK_UN);
    }
}

#[cfg(not(unix))]
fn unlock(_file: &File) {}

/// Read the whole file under a shared lock.
pub fn read_shared(path: &Path) -> Result<String, PersistenceError> {
    let file = File::open(path).map_err(|e| PersistenceError::io(path, e))?;
    let mut locked = LockedFile::acquire(file, false).map_err(|e| PersistenceError::io(path, e))?;

    let mut contents = String::new();
    locked
        .file
        .read_to_string(&mut contents)
        .map_err(|e| PersistenceError::io(path, e))?;
    Ok(contents)
}

/// Replace the file's contents under an exclusive lock, creating it if needed.
///
/// The file is truncated only after the lock is held so a concurrent reader
/// never sees a half-written file from this process.
pub fn write_exclusive(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| PersistenceError::io(path, e))?;
    let mut locked = LockedFile::acquire(file, true).map_err(|e| PersistenceError::io(path, e))?;

    locked
        .file
        .set_len(0)
        .and_then(|_| locked.file.write_all(contents))
        .and_then(|_| locked.file.flush())
        .and_then(|_| locked.file.sync_all())
        .map_err(|e| PersistenceError::io(path, e))
}
