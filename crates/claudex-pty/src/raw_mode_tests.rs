// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nix::pty::openpty;

#[test]
fn enter_puts_terminal_in_raw_mode_and_drop_restores_it() {
    let pty = openpty(None, None).unwrap();
    let fd = pty.slave.as_raw_fd();
    let borrowed = borrow_fd(fd);

    let cooked = termios::tcgetattr(borrowed).unwrap();
    assert!(cooked.local_flags.contains(termios::LocalFlags::ECHO));

    {
        let _guard = RawModeGuard::enter(borrowed).unwrap();
        let raw = termios::tcgetattr(borrowed).unwrap();
        assert!(!raw.local_flags.contains(termios::LocalFlags::ECHO));
        assert!(!raw.local_flags.contains(termios::LocalFlags::ICANON));
    }

    let restored = termios::tcgetattr(borrowed).unwrap();
    assert!(restored.local_flags.contains(termios::LocalFlags::ECHO));
}
