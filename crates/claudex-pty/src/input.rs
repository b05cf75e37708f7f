// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User TTY → PTY pipeline: accumulate a line buffer, evaluate input rules
//! in registration order on each ENTER.

use crate::rules::{HandlerRegistry, InterceptorRule};

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Drives the line-buffering + rule-evaluation state machine for the input
/// pipeline. Free of any I/O so it's unit testable chunk-by-chunk.
#[derive(Default)]
pub struct InputLineBuffer {
    buf: Vec<u8>,
}

impl InputLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte through the buffer. Returns the bytes that should be
    /// forwarded to the PTY in place of this byte, or `None` if the byte
    /// should simply be forwarded as-is (the common non-ENTER case).
    pub fn push(
        &mut self,
        byte: u8,
        rules: &[InterceptorRule],
        registry: &HandlerRegistry,
    ) -> Option<Vec<u8>> {
        if byte != CR && byte != LF {
            self.buf.push(byte);
            return None;
        }

        let line = std::mem::take(&mut self.buf);
        let mut suppressed = false;
        let mut prelude = Vec::new();

        for rule in rules {
            if let Some((suppress, written)) = rule.evaluate(&line, registry) {
                prelude.extend(written);
                suppressed |= suppress;
            }
        }

        let mut out = prelude;
        if !suppressed {
            out.push(byte);
        }
        Some(out)
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
