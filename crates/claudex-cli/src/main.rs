// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `claudex`: terminal wrapper and process-protection supervisor. Spawns
//! the wrapped assistant CLI on a fresh pseudo-terminal by default;
//! `--update-docs` and `install-hooks` drive the documentation pipeline
//! directly without attaching a terminal.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod app;
mod prefs;

use std::path::PathBuf;

use clap::Parser;
use claudex_core::Config;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use app::App;
use prefs::Prefs;

/// Terminal wrapper and process-protection supervisor for AI coding assistant CLIs.
#[derive(Parser)]
#[command(name = "claudex", version, about)]
struct Cli {
    /// Don't overwrite existing documentation files.
    #[arg(long)]
    no_overwrite: bool,

    /// Doc path to process (repeatable).
    #[arg(long = "doc")]
    doc: Vec<PathBuf>,

    /// Log format: text or json.
    #[arg(long, env = "CLAUDEX_LOG_FORMAT", default_value = "text")]
    log_format: String,

    /// Run one commit-range documentation update pass and exit, instead of
    /// spawning the wrapped CLI. Intended for the `post-commit` git hook.
    #[arg(long)]
    update_docs: bool,

    /// Install the `post-commit` git hook that triggers `--update-docs`.
    #[arg(long)]
    install_hooks: bool,

    /// The assistant CLI and its arguments, after `--`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let result = match log_format {
        "json" => tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
    };
    drop(result);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_format);

    let mut config = match Config::load_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    config.apply_env_overrides();
    config.features.no_overwrite |= cli.no_overwrite;
    config.features.doc.extend(cli.doc.iter().map(|p| p.display().to_string()));
    debug!(
        max_processes = config.features.process_protection.max_processes,
        rate_limit_per_second = config.features.process_protection.rate_limit_per_second,
        timeout_seconds = config.features.process_protection.timeout_seconds,
        "claudex: resolved process-protection policy"
    );

    let prefs = Prefs::load_or_init();
    if prefs.mcp_setup_declined == Some(true) {
        debug!("claudex: MCP setup was previously declined, skipping related prompts");
    }

    let app = App::new(config);

    let outcome = if cli.install_hooks {
        run_install_hooks(&app).await
    } else if cli.update_docs {
        run_update_docs(&app).await
    } else {
        run_spawn_and_attach(&app, &cli.command).await
    };

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run_spawn_and_attach(app: &App, command: &[String]) -> anyhow::Result<i32> {
    if command.is_empty() {
        anyhow::bail!("no command specified (usage: claudex -- <command> [args...])");
    }
    let (cols, rows) = terminal_size();
    let status = app.spawn_and_attach(command, cols, rows).await?;
    Ok(status.code.unwrap_or(1))
}

async fn run_update_docs(app: &App) -> anyhow::Result<i32> {
    let session_path = std::env::current_dir()?;
    if let Err(e) = app.update_docs(&session_path, "main").await {
        error!(error = %e, "claudex: update-docs failed");
    }
    Ok(0)
}

async fn run_install_hooks(app: &App) -> anyhow::Result<i32> {
    let repo_root = std::env::current_dir()?;
    app.install_hooks(&repo_root)?;
    Ok(0)
}

/// Best-effort controlling-terminal size, falling back to a sane default
/// when stdout isn't a tty (e.g. under a test harness).
fn terminal_size() -> (u16, u16) {
    // SAFETY: TIOCGWINSZ is a well-defined ioctl; a zeroed Winsize is a
    // valid argument and the ioctl only ever populates it or fails.
    #[allow(unsafe_code)]
    unsafe {
        let mut ws: nix::libc::winsize = std::mem::zeroed();
        let ret = nix::libc::ioctl(1, nix::libc::TIOCGWINSZ, &mut ws);
        if ret == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
            (ws.ws_col, ws.ws_row)
        } else {
            (80, 24)
        }
    }
}
