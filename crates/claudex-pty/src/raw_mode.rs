// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::os::fd::{AsRawFd, BorrowedFd};

use nix::sys::termios;

/// RAII guard that puts a terminal fd into raw mode and restores the
/// original attributes on drop — including on panic unwind, since this is
/// the only path that runs regardless of how the interceptor shuts down.
pub struct RawModeGuard {
    fd: i32,
    original: termios::Termios,
}

impl RawModeGuard {
    /// Enter raw mode on `fd` (typically the user's stdin).
    pub fn enter(fd: impl AsRawFd) -> anyhow::Result<Self> {
        let fd = fd.as_raw_fd();
        let borrowed = borrow_fd(fd);
        let original = termios::tcgetattr(borrowed)?;
        let mut raw = original.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(borrowed, termios::SetArg::TCSAFLUSH, &raw)?;
        Ok(Self { fd, original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let borrowed = borrow_fd(self.fd);
        let _ = termios::tcsetattr(borrowed, termios::SetArg::TCSAFLUSH, &self.original);
    }
}

fn borrow_fd(fd: i32) -> BorrowedFd<'static> {
    // SAFETY: the caller guarantees `fd` stays valid for the guard's lifetime
    // (stdin never closes for the life of the process).
    #[allow(unsafe_code)]
    unsafe {
        BorrowedFd::borrow_raw(fd)
    }
}

#[cfg(test)]
#[path = "raw_mode_tests.rs"]
mod tests;
