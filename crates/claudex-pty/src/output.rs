// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PTY → user TTY pipeline: bytes pass through unchanged; a bounded
//! rolling window is scanned continuously against the output rules so
//! multi-line patterns can still be caught after the window has rotated.

use crate::rules::{HandlerRegistry, InterceptorRule};

/// Default rolling window size: large enough to catch multi-line patterns.
pub const DEFAULT_WINDOW_CAPACITY: usize = 8192;

/// Tracks the rolling output window and, per rule, the highest byte offset
/// (in the window's *global* coordinate space, i.e. counting every byte
/// ever appended) matched so far, so a rule fires once per match
/// occurrence rather than re-firing on bytes it has already seen.
pub struct OutputWindow {
    window: Vec<u8>,
    capacity: usize,
    total_appended: u64,
    fired_offsets: Vec<u64>,
}

impl OutputWindow {
    pub fn new(capacity: usize, rule_count: usize) -> Self {
        Self {
            window: Vec::with_capacity(capacity),
            capacity,
            total_appended: 0,
            fired_offsets: vec![0; rule_count],
        }
    }

    /// Append a chunk of output, evaluate every rule against the window,
    /// and return the synthetic input bytes the firing handlers produced
    /// (in rule order). Output bytes themselves are never altered.
    pub fn feed(&mut self, chunk: &[u8], rules: &[InterceptorRule], registry: &HandlerRegistry) -> Vec<u8> {
        self.window.extend_from_slice(chunk);
        self.total_appended += chunk.len() as u64;
        if self.window.len() > self.capacity {
            let excess = self.window.len() - self.capacity;
            self.window.drain(0..excess);
        }
        let window_start = self.global_start();

        let mut injected = Vec::new();
        for (rule, fired) in rules.iter().zip(self.fired_offsets.iter_mut()) {
            // Map the rule's last-fired global offset into this window's
            // local coordinates; a rule that hasn't fired inside the
            // current window starts from 0.
            let local_from = fired.saturating_sub(window_start) as usize;
            let local_from = local_from.min(self.window.len());
            for (local_end, written) in rule.evaluate_all_from(&self.window, local_from, registry) {
                let global_end = window_start + local_end as u64;
                if global_end > *fired {
                    *fired = global_end;
                }
                injected.extend(written);
            }
        }
        injected
    }

    fn global_start(&self) -> u64 {
        self.total_appended - self.window.len() as u64
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
