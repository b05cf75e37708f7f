// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional Linux cgroups-v2 "pids" controller, layered on top of
//! [`crate::commander::Commander`] to cap descendant PIDs per spawn.
//!
//! Any probing or setup failure disables the limiter silently — the
//! normal case for unprivileged users and non-Linux hosts.

use std::path::PathBuf;
use std::sync::Mutex;

const CGROUP_ROOT: &str = "/sys/fs/cgroup";
const PARENT: &str = "claudex";

/// Per-spawn cgroup handle, or disabled.
pub struct CgroupLimiter {
    state: Mutex<State>,
}

struct State {
    enabled: bool,
    parent: PathBuf,
}

impl CgroupLimiter {
    /// Probe for cgroups-v2 `pids` controller support and attempt to set
    /// up the parent cgroup. Never fails: on any error, the limiter is
    /// simply disabled.
    pub fn probe() -> Self {
        let parent = PathBuf::from(CGROUP_ROOT).join(PARENT);
        let enabled = Self::try_enable(&parent);
        Self { state: Mutex::new(State { enabled, parent }) }
    }

    #[cfg(target_os = "linux")]
    fn try_enable(parent: &std::path::Path) -> bool {
        let controllers = std::fs::read_to_string(format!("{CGROUP_ROOT}/cgroup.controllers"))
            .unwrap_or_default();
        if !controllers.split_whitespace().any(|c| c == "pids") {
            return false;
        }
        if std::fs::create_dir_all(parent).is_err() {
            return false;
        }
        std::fs::write(format!("{CGROUP_ROOT}/cgroup.subtree_control"), "+pids").is_ok()
    }

    #[cfg(not(target_os = "linux"))]
    fn try_enable(_parent: &std::path::Path) -> bool {
        false
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).enabled
    }

    /// Create a per-process cgroup with a `pids.max` cap and move `pid`
    /// into it. Returns the cgroup path if created, `None` if the limiter
    /// is disabled.
    pub fn create_for_process(&self, pid: u32, max_pids: u32) -> Option<PathBuf> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.enabled {
            return None;
        }
        let path = state.parent.join(format!("cmd_{pid}"));
        if std::fs::create_dir_all(&path).is_err() {
            return None;
        }
        if std::fs::write(path.join("pids.max"), max_pids.to_string()).is_err() {
            return None;
        }
        if std::fs::write(path.join("cgroup.procs"), pid.to_string()).is_err() {
            return None;
        }
        Some(path)
    }

    /// Best-effort removal of a per-process cgroup. `EBUSY` (the kernel
    /// still reaping exited processes) is swallowed; the kernel cleans it
    /// up on its own.
    pub fn cleanup(&self, path: &std::path::Path) {
        match std::fs::remove_dir(path) {
            Ok(()) => {}
            Err(e) if e.raw_os_error() == Some(nix::errno::Errno::EBUSY as i32) => {}
            Err(_) => {}
        }
    }

    /// Remove every descendant cgroup and the parent. Runs at process
    /// shutdown.
    pub fn cleanup_all(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.enabled {
            return;
        }
        if let Ok(entries) = std::fs::read_dir(&state.parent) {
            for entry in entries.flatten() {
                let _ = std::fs::remove_dir(entry.path());
            }
        }
        let _ = std::fs::remove_dir(&state.parent);
    }
}

#[cfg(test)]
#[path = "cgroup_tests.rs"]
mod tests;
