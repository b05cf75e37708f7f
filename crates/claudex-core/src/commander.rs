// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Central process-spawning facade. Wraps [`crate::registry::ProcessRegistry`],
//! [`crate::rate_limit::RateLimiter`], [`crate::proc_count`], and
//! [`crate::cgroup::CgroupLimiter`] behind one entry point so every spawn
//! in the process — long-lived child or short-lived hook — goes through
//! the same cap, shape, timeout, and process-group isolation.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::process::Command as TokioCommand;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cgroup::CgroupLimiter;
use crate::error::CommanderError;
use crate::proc_count;
use crate::rate_limit::RateLimiter;
use crate::registry::ProcessRegistry;

const KILL_GRACE: Duration = Duration::from_millis(500);

/// Global policy enforced on every spawn. All-zero disables every
/// protection but PID bookkeeping still happens for observability.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub max_processes: usize,
    pub rate_limit_per_second: usize,
    pub timeout_seconds: u64,
    pub max_pids_per_process: u32,
}

impl Default for Policy {
    fn default() -> Self {
        Self { max_processes: 0, rate_limit_per_second: 0, timeout_seconds: 0, max_pids_per_process: 64 }
    }
}

/// How to wire up a spawned child's standard stream. `Stdio` itself isn't
/// `Clone`, so `Spec` holds this instead and materializes a fresh `Stdio`
/// per field when the command is built.
#[derive(Debug, Default)]
pub enum StdioKind {
    Null,
    #[default]
    Piped,
    Inherit,
    /// A concrete, already-opened destination (e.g. a file for DocUpdater's
    /// detached subprocess output).
    Raw(Stdio),
}

impl StdioKind {
    fn into_stdio(self) -> Stdio {
        match self {
            Self::Null => Stdio::null(),
            Self::Piped => Stdio::piped(),
            Self::Inherit => Stdio::inherit(),
            Self::Raw(s) => s,
        }
    }
}

/// What to spawn.
pub struct Spec<'a> {
    pub program: &'a str,
    pub args: &'a [String],
    pub env: HashMap<String, String>,
    pub stdin: StdioKind,
    pub stdout: StdioKind,
    pub stderr: StdioKind,
}

impl<'a> Spec<'a> {
    pub fn new(program: &'a str, args: &'a [String]) -> Self {
        Self {
            program,
            args,
            env: HashMap::new(),
            stdin: StdioKind::Null,
            stdout: StdioKind::Piped,
            stderr: StdioKind::Piped,
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_stdio(mut self, stdin: StdioKind, stdout: StdioKind, stderr: StdioKind) -> Self {
        self.stdin = stdin;
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }
}

/// Output of a one-shot [`Commander::run`] invocation.
#[derive(Debug)]
pub struct Output {
    pub status: std::process::ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// A streaming child started via [`Commander::start`]. Lives until
/// [`Commander::wait`] reaps it (or the spawn is cancelled).
pub struct Handle {
    child: tokio::process::Child,
    pid: u32,
    cgroup_path: Option<std::path::PathBuf>,
}

impl Handle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn stdin(&mut self) -> Option<tokio::process::ChildStdin> {
        self.child.stdin.take()
    }

    pub fn stdout(&mut self) -> Option<tokio::process::ChildStdout> {
        self.child.stdout.take()
    }

    pub fn stderr(&mut self) -> Option<tokio::process::ChildStderr> {
        self.child.stderr.take()
    }
}

/// Process-spawning facade. Construct one per application and share it
/// via `Arc` across Commander, DocUpdater, and hook dispatch call sites.
pub struct Commander {
    registry: Arc<ProcessRegistry>,
    limiter: RateLimiter,
    cgroup: Arc<CgroupLimiter>,
    policy: Policy,
}

impl Commander {
    pub fn new(policy: Policy) -> Self {
        Self {
            registry: Arc::new(ProcessRegistry::new()),
            limiter: RateLimiter::new(policy.rate_limit_per_second),
            cgroup: Arc::new(CgroupLimiter::probe()),
            policy,
        }
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    /// Steps 1-2 of the spawn algorithm: cap check, then rate shaping.
    async fn admit(&self) -> Result<(), CommanderError> {
        if self.policy.max_processes > 0 {
            let self_pid = std::process::id();
            let live = self.registry.count() + proc_count::count_descendants(self_pid);
            if live >= self.policy.max_processes {
                return Err(CommanderError::ProcessLimitReached);
            }
        }
        self.limiter.allow().await;
        Ok(())
    }

    fn build_command(spec: Spec<'_>) -> TokioCommand {
        let mut cmd = TokioCommand::new(spec.program);
        cmd.args(spec.args);
        cmd.envs(&spec.env);
        cmd.stdin(spec.stdin.into_stdio());
        cmd.stdout(spec.stdout.into_stdio());
        cmd.stderr(spec.stderr.into_stdio());

        // SAFETY: setsid() is async-signal-safe and only affects the
        // child's own process group membership post-fork/pre-exec.
        #[allow(unsafe_code)]
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(std::io::Error::from)?;
                Ok(())
            });
        }
        cmd
    }

    /// One-shot invocation: spawn, wait for exit, collect combined output.
    /// Honors cancellation and the configured timeout.
    pub async fn run(
        &self,
        spec: Spec<'_>,
        cancel: CancellationToken,
    ) -> Result<Output, CommanderError> {
        self.admit().await?;

        let mut cmd = Self::build_command(spec);
        let mut child = cmd.spawn()?;
        let pid = child.id().unwrap_or(0);
        self.registry.register(pid);
        let cgroup_path = self.cgroup.create_for_process(pid, self.policy.max_pids_per_process);

        // Drain stdout/stderr concurrently with wait(): a child that fills
        // a pipe's buffer (~64KiB) before exiting would otherwise block on
        // write forever, since nothing would be reading the other end
        // until after wait() returned.
        use tokio::io::AsyncReadExt;
        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(s) = stdout.as_mut() {
                let _ = s.read_to_end(&mut buf).await;
            }
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(s) = stderr.as_mut() {
                let _ = s.read_to_end(&mut buf).await;
            }
            buf
        });

        let result = self.wait_with_timeout(&mut child, pid, cancel).await;

        self.registry.unregister(pid);
        if let Some(path) = &cgroup_path {
            self.cgroup.cleanup(path);
        }

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                stdout_task.abort();
                stderr_task.abort();
                return Err(e);
            }
        };
        let stdout_buf = stdout_task.await.unwrap_or_default();
        let stderr_buf = stderr_task.await.unwrap_or_default();

        Ok(Output { status, stdout: stdout_buf, stderr: stderr_buf })
    }

    /// Streaming invocation for interactive I/O. Caller owns stdin/stdout
    /// via the returned [`Handle`] and must eventually call [`Commander::wait`].
    pub async fn start(&self, spec: Spec<'_>) -> Result<Handle, CommanderError> {
        self.admit().await?;

        let mut cmd = Self::build_command(spec);
        let child = cmd.spawn()?;
        let pid = child.id().unwrap_or(0);
        self.registry.register(pid);
        let cgroup_path = self.cgroup.create_for_process(pid, self.policy.max_pids_per_process);

        debug!(pid, "commander: started streaming process");
        Ok(Handle { child, pid, cgroup_path })
    }

    /// Wait for a [`Handle`] started via [`Commander::start`], honoring
    /// cancellation. Unconditionally unregisters and cleans up cgroup
    /// state before returning.
    pub async fn wait(
        &self,
        mut handle: Handle,
        cancel: CancellationToken,
    ) -> Result<std::process::ExitStatus, CommanderError> {
        let result = self.wait_with_timeout(&mut handle.child, handle.pid, cancel).await;
        self.registry.unregister(handle.pid);
        if let Some(path) = &handle.cgroup_path {
            self.cgroup.cleanup(path);
        }
        result
    }

    async fn wait_with_timeout(
        &self,
        child: &mut tokio::process::Child,
        pid: u32,
        cancel: CancellationToken,
    ) -> Result<std::process::ExitStatus, CommanderError> {
        let timeout = if self.policy.timeout_seconds > 0 {
            Some(Duration::from_secs(self.policy.timeout_seconds))
        } else {
            None
        };

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = cancel.cancelled() => Outcome::Cancelled,
            _ = maybe_sleep(timeout) => Outcome::TimedOut,
        };

        match outcome {
            Outcome::Exited(status) => Ok(status?),
            Outcome::Cancelled => {
                self.terminate_group(pid).await;
                let _ = child.wait().await;
                Err(CommanderError::Cancelled)
            }
            Outcome::TimedOut => {
                self.terminate_group(pid).await;
                let _ = child.wait().await;
                Err(CommanderError::Timeout)
            }
        }
    }

    /// SIGTERM the process group, grace period, then SIGKILL.
    async fn terminate_group(&self, pid: u32) {
        let Ok(pgid) = i32::try_from(pid) else { return };
        let pgid = Pid::from_raw(pgid);
        if let Err(e) = killpg(pgid, Signal::SIGTERM) {
            warn!(pid, error = %e, "commander: SIGTERM to process group failed");
        }
        tokio::time::sleep(KILL_GRACE).await;
        let _ = killpg(pgid, Signal::SIGKILL);
    }
}

enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
    TimedOut,
}

async fn maybe_sleep(duration: Option<Duration>) {
    match duration {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
#[path = "commander_tests.rs"]
mod tests;
