// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-safe set of live child PIDs.

use std::collections::HashSet;
use std::sync::RwLock;

/// Process-wide registry of PIDs spawned by [`crate::commander::Commander`].
///
/// Reads do not block each other; writes serialize behind the same lock.
#[derive(Default)]
pub struct ProcessRegistry {
    pids: RwLock<HashSet<u32>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a PID. Idempotent.
    pub fn register(&self, pid: u32) {
        let mut pids = self.pids.write().unwrap_or_else(|e| e.into_inner());
        pids.insert(pid);
    }

    /// Unregister a PID. A no-op if the PID is not present.
    pub fn unregister(&self, pid: u32) {
        let mut pids = self.pids.write().unwrap_or_else(|e| e.into_inner());
        pids.remove(&pid);
    }

    /// Exact current size.
    pub fn count(&self) -> usize {
        self.pids.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Snapshot as an ordered sequence of PIDs. Mutating the result does
    /// not affect the registry.
    pub fn snapshot(&self) -> Vec<u32> {
        let pids = self.pids.read().unwrap_or_else(|e| e.into_inner());
        let mut v: Vec<u32> = pids.iter().copied().collect();
        v.sort_unstable();
        v
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
