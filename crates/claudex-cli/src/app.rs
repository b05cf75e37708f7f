// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires `Commander`, `SessionStore`, and `PTYInterceptor` together behind
//! the `claudex` binary's subcommands: the default spawn+attach, the
//! `--update-docs` range-update pass, and git hook installation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use claudex_core::{Commander, Policy};
use claudex_pty::{ExitStatus, InterceptorConfig, PTYInterceptor};
use claudex_session::range_updater::{self, RangeUpdaterConfig};
use claudex_session::vcs::GitCli;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::{info, warn};

use claudex_core::Config;

const KILL_GRACE: Duration = Duration::from_millis(500);
const HOOK_GUARD_MARKER: &str = "# claudex-docs-hook";

/// Top-level application state built from a loaded [`Config`].
pub struct App {
    pub commander: Commander,
}

impl App {
    pub fn new(config: Config) -> Self {
        let pp = &config.features.process_protection;
        let policy = Policy {
            max_processes: pp.max_processes,
            rate_limit_per_second: pp.rate_limit_per_second,
            timeout_seconds: pp.timeout_seconds,
            ..Policy::default()
        };
        Self { commander: Commander::new(policy) }
    }

    /// Default subcommand: spawn `command` on a fresh PTY, attach the
    /// user's terminal, and forward SIGTERM/SIGINT to the child with the
    /// same grace-then-kill timing `Commander` uses for its own spawns.
    pub async fn spawn_and_attach(
        &self,
        command: &[String],
        cols: u16,
        rows: u16,
    ) -> anyhow::Result<ExitStatus> {
        let interceptor = PTYInterceptor::spawn(command, cols, rows, InterceptorConfig::default())?;
        let child_pid = interceptor.child_pid();

        let run_task = tokio::spawn(interceptor.run());

        let signal_task = tokio::spawn(async move {
            let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
            let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();
            tokio::select! {
                _ = async { match sigterm.as_mut() { Some(s) => s.recv().await, None => std::future::pending().await } } => {}
                _ = async { match sigint.as_mut() { Some(s) => s.recv().await, None => std::future::pending().await } } => {}
            }
            info!("claudex: forwarding shutdown signal to child pid {child_pid}");
            terminate(child_pid).await;
        });

        let status = run_task.await??;
        signal_task.abort();
        Ok(status)
    }

    /// `--update-docs`: drive one `RangeUpdater` pass directly against the
    /// current working directory's repo, for the `post-commit` hook.
    pub async fn update_docs(&self, session_path: &Path, default_branch: &str) -> anyhow::Result<()> {
        let repo_root = std::env::current_dir()?;
        let vcs = GitCli::new(&repo_root);
        let config = RangeUpdaterConfig {
            session_path,
            repo_root: &repo_root,
            default_branch,
            lock_timeout: Duration::from_secs(5),
        };
        let result = range_updater::run(&vcs, &self.commander, config, "claudex").await;
        info!(status = ?result.status, reason = ?result.reason, "claudex: update-docs finished");
        Ok(())
    }

    /// `install-hooks`: create or append the `post-commit` hook that fires
    /// `--update-docs` in the background, guarded by a marker line so
    /// re-running is idempotent.
    pub fn install_hooks(&self, repo_root: &Path) -> anyhow::Result<PathBuf> {
        let hooks_dir = repo_root.join(".git").join("hooks");
        std::fs::create_dir_all(&hooks_dir)?;
        let hook_path = hooks_dir.join("post-commit");

        let existing = std::fs::read_to_string(&hook_path).unwrap_or_default();
        if existing.contains(HOOK_GUARD_MARKER) {
            info!("claudex: post-commit hook already installed at {}", hook_path.display());
            return Ok(hook_path);
        }

        let mut contents = existing;
        if contents.is_empty() {
            contents.push_str("#!/bin/sh\n");
        }
        contents.push('\n');
        contents.push_str(HOOK_GUARD_MARKER);
        contents.push('\n');
        contents.push_str("claudex --update-docs &\n");

        std::fs::write(&hook_path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&hook_path)?.permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&hook_path, perms)?;
        }

        info!("claudex: installed post-commit hook at {}", hook_path.display());
        Ok(hook_path)
    }
}

/// SIGTERM, 500ms grace, then SIGKILL — matches `Commander::terminate_group`
/// but against a single pid rather than a process group, since the PTY
/// child isn't necessarily its own group leader.
async fn terminate(pid: u32) {
    let Ok(raw) = i32::try_from(pid) else { return };
    let nix_pid = Pid::from_raw(raw);
    if let Err(e) = kill(nix_pid, Signal::SIGTERM) {
        warn!(pid, error = %e, "claudex: SIGTERM to child failed");
    }
    tokio::time::sleep(KILL_GRACE).await;
    let _ = kill(nix_pid, Signal::SIGKILL);
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
