// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the PTY lifecycle, raw-mode terminal, and the input/output rule
//! pipelines together. Commander, DocUpdater background spawns, and these
//! two pipelines all run concurrently on the async runtime; the only
//! dedicated OS threads are the ones `tokio::task::spawn_blocking` hands
//! out for the genuinely blocking syscalls (stdin read, waitpid).

use std::io::{Read, Write};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::input::InputLineBuffer;
use crate::output::{OutputWindow, DEFAULT_WINDOW_CAPACITY};
use crate::raw_mode::RawModeGuard;
use crate::rules::{HandlerRegistry, InterceptorRule};
use crate::spawn::{ExitStatus, PtySession};

/// Rule set and callback registry the interceptor evaluates; built once at
/// startup and immutable for the session's lifetime.
pub struct InterceptorConfig {
    pub input_rules: Vec<InterceptorRule>,
    pub output_rules: Vec<InterceptorRule>,
    pub registry: HandlerRegistry,
    pub window_capacity: usize,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            input_rules: Vec::new(),
            output_rules: Vec::new(),
            registry: HandlerRegistry::new(),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

/// Owns the PTY session and the raw-mode guard for the user's controlling
/// terminal, and drives the two byte pipelines until the child exits.
pub struct PTYInterceptor {
    pty: Arc<PtySession>,
    _raw_mode: RawModeGuard,
    config: InterceptorConfig,
}

impl PTYInterceptor {
    /// Spawn `command` on a new PTY sized `cols` x `rows`, putting the
    /// process's own stdin into raw mode for the duration.
    pub fn spawn(command: &[String], cols: u16, rows: u16, config: InterceptorConfig) -> anyhow::Result<Self> {
        let raw_mode = RawModeGuard::enter(std::io::stdin())?;
        let pty = PtySession::spawn(command, cols, rows)?;
        Ok(Self { pty: Arc::new(pty), _raw_mode: raw_mode, config })
    }

    pub fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()> {
        self.pty.resize(cols, rows)
    }

    pub fn child_pid(&self) -> u32 {
        self.pty.child_pid()
    }

    /// Run both pipelines until the child exits, then return its status.
    /// Cooked mode is restored on every exit path via `RawModeGuard`'s
    /// `Drop`, including on panic unwind.
    pub async fn run(self) -> anyhow::Result<ExitStatus> {
        let input_task = tokio::spawn(run_input_pipeline(
            Arc::clone(&self.pty),
            self.config.input_rules,
            self.config.registry.clone(),
        ));
        let output_task = tokio::spawn(run_output_pipeline(
            Arc::clone(&self.pty),
            self.config.output_rules,
            self.config.registry,
            self.config.window_capacity,
        ));

        let status = self.pty.wait().await?;
        input_task.abort();
        output_task.abort();
        Ok(status)
    }
}

async fn run_input_pipeline(pty: Arc<PtySession>, rules: Vec<InterceptorRule>, registry: HandlerRegistry) {
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
    tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; 4096];
        let mut stdin = std::io::stdin();
        loop {
            match stdin.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.blocking_send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let mut line_buf = InputLineBuffer::new();
    while let Some(chunk) = rx.recv().await {
        for byte in chunk {
            match line_buf.push(byte, &rules, &registry) {
                Some(out) => {
                    if !out.is_empty() {
                        if let Err(e) = pty.write(&out).await {
                            warn!(error = %e, "pty: input pipeline write failed");
                        }
                    }
                }
                None => {
                    if let Err(e) = pty.write(&[byte]).await {
                        warn!(error = %e, "pty: input pipeline write failed");
                    }
                }
            }
        }
    }
}

async fn run_output_pipeline(
    pty: Arc<PtySession>,
    rules: Vec<InterceptorRule>,
    registry: HandlerRegistry,
    window_capacity: usize,
) {
    let mut window = OutputWindow::new(window_capacity, rules.len());
    let mut buf = vec![0u8; 8192];
    let mut stdout = std::io::stdout();

    loop {
        match pty.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if stdout.write_all(&buf[..n]).is_err() {
                    break;
                }
                let _ = stdout.flush();
                let injected = window.feed(&buf[..n], &rules, &registry);
                if !injected.is_empty() {
                    if let Err(e) = pty.write(&injected).await {
                        warn!(error = %e, "pty: output pipeline synthetic-input write failed");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "pty: output pipeline read failed");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "interceptor_tests.rs"]
mod tests;
