// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic `O_CREAT|O_EXCL` lock files, PID-stamped.
//!
//! Locks are advisory and crash-resilient only via external reaping: if
//! the holding process dies without releasing, the lock file is left
//! behind and must be cleared manually.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A held exclusive lock on a path. Dropping does not release it —
/// callers must call [`Lock::release`] explicitly, matching the rest of
/// this crate's explicit-lifecycle style.
#[derive(Debug)]
pub struct Lock {
    path: PathBuf,
}

impl Lock {
    /// Atomically create `path` and stamp it with the current PID. Fails
    /// with `AlreadyLocked` if the file already exists.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();
        let mut opts = fs::OpenOptions::new();
        opts.write(true).create_new(true);

        match opts.open(&path) {
            Ok(mut file) => {
                use std::io::Write;
                let pid = std::process::id();
                // Best-effort: a failure to write the PID stamp doesn't
                // undo the lock — the exclusive create is what matters.
                let _ = writeln!(file, "{pid}");
                Ok(Self { path })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::Io(e)),
        }
    }

    /// Release the lock: remove the lock file.
    pub fn release(self) -> io::Result<()> {
        fs::remove_file(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Stat-only check; absence is not an error.
pub fn is_locked(path: &Path) -> bool {
    path.exists()
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("lock already held")]
    AlreadyLocked,
    #[error("lock i/o error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
#[path = "file_lock_tests.rs"]
mod tests;
