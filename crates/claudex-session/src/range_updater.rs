// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commit-range documentation resolution: given a session's persisted
//! "last processed commit" and the repo's current HEAD, determine which
//! `index.md` files are affected, apply skip rules, and dispatch a
//! background regeneration subprocess per affected index.

use std::path::{Path, PathBuf};
use std::time::Duration;

use claudex_core::{Commander, Lock, LockError, Spec, StdioKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::doc_updater::RECURSION_GUARD_VAR;
use crate::error::{Result, SessionError};
use crate::vcs::{nearest_index, VcsService};

const LOCK_FILE: &str = "doc_update.lock";
const TRACKING_FILE: &str = "doc_update_tracking.json";
const STRATEGY_VERSION: &str = "v1";
const SKIP_DOCS_ENV: &str = "CLAUDEX_SKIP_DOCS";
const SKIP_DOCS_TAG: &str = "[skip-docs]";
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingState {
    pub last_processed_commit: String,
    pub updated_at: String,
    pub strategy_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStatus {
    Success,
    Skipped,
    Locked,
    Error,
}

#[derive(Debug, Clone)]
pub struct RangeUpdateResult {
    pub status: RangeStatus,
    pub reason: Option<String>,
    pub affected_indexes: Vec<PathBuf>,
}

pub struct RangeUpdaterConfig<'a> {
    pub session_path: &'a Path,
    pub repo_root: &'a Path,
    pub default_branch: &'a str,
    pub lock_timeout: Duration,
}

/// Run one commit-range resolution pass.
pub async fn run(
    vcs: &dyn VcsService,
    commander: &Commander,
    config: RangeUpdaterConfig<'_>,
    dispatch_program: &str,
) -> RangeUpdateResult {
    match run_inner(vcs, commander, config, dispatch_program).await {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "range-updater: failed");
            RangeUpdateResult { status: RangeStatus::Error, reason: Some(e.to_string()), affected_indexes: Vec::new() }
        }
    }
}

async fn run_inner(
    vcs: &dyn VcsService,
    commander: &Commander,
    config: RangeUpdaterConfig<'_>,
    dispatch_program: &str,
) -> Result<RangeUpdateResult> {
    let lock_path = config.session_path.join(LOCK_FILE);
    let Some(lock) = acquire_with_timeout(&lock_path, config.lock_timeout).await else {
        return Ok(RangeUpdateResult { status: RangeStatus::Locked, reason: None, affected_indexes: Vec::new() });
    };

    let result = resolve(vcs, commander, &config, dispatch_program).await;

    let _ = lock.release();
    result
}

async fn resolve(
    vcs: &dyn VcsService,
    commander: &Commander,
    config: &RangeUpdaterConfig<'_>,
    dispatch_program: &str,
) -> Result<RangeUpdateResult> {
    let tracking_path = config.session_path.join(TRACKING_FILE);
    let head = vcs.head()?;

    let tracking = match read_tracking(&tracking_path) {
        Some(t) => t,
        None => {
            write_tracking(&tracking_path, &head)?;
            return Ok(RangeUpdateResult {
                status: RangeStatus::Success,
                reason: None,
                affected_indexes: Vec::new(),
            });
        }
    };

    let base = tracking.last_processed_commit;
    if base == head {
        return Ok(RangeUpdateResult {
            status: RangeStatus::Skipped,
            reason: Some("no new commits".into()),
            affected_indexes: Vec::new(),
        });
    }

    let base = resolve_base(vcs, &base, &head, config.default_branch)?;

    let changed_files = vcs.diff_files(&base, &head)?;

    if let Some(reason) = skip_reason(vcs, &base, &head, &changed_files)? {
        write_tracking(&tracking_path, &head)?;
        return Ok(RangeUpdateResult { status: RangeStatus::Skipped, reason: Some(reason), affected_indexes: Vec::new() });
    }

    let mut affected: Vec<PathBuf> = changed_files
        .iter()
        .filter_map(|f| nearest_index(config.repo_root, f))
        .collect();
    affected.sort();
    affected.dedup();

    for index in &affected {
        dispatch_index_update(commander, dispatch_program, index, &changed_files).await;
    }

    write_tracking(&tracking_path, &head)?;

    Ok(RangeUpdateResult { status: RangeStatus::Success, reason: None, affected_indexes: affected })
}

fn resolve_base(vcs: &dyn VcsService, base: &str, head: &str, default_branch: &str) -> Result<String> {
    if vcs.is_reachable(base)? {
        return Ok(base.to_owned());
    }
    for candidate in [default_branch, "main", "master"] {
        if let Some(mb) = vcs.merge_base(candidate, head)? {
            return Ok(mb);
        }
    }
    Err(SessionError::UnreachableBase)
}

/// Skip-rule precedence: env var > `[skip-docs]` commit tag > docs-only.
fn skip_reason(
    vcs: &dyn VcsService,
    base: &str,
    head: &str,
    changed_files: &[PathBuf],
) -> Result<Option<String>> {
    if std::env::var(SKIP_DOCS_ENV).as_deref() == Ok("1") {
        return Ok(Some("CLAUDEX_SKIP_DOCS=1".to_owned()));
    }

    let messages = vcs.log_messages(base, head)?;
    if messages.iter().any(|m| m.contains(SKIP_DOCS_TAG)) {
        return Ok(Some(format!("commit message contains {SKIP_DOCS_TAG}")));
    }

    if !changed_files.is_empty()
        && changed_files.iter().all(|f| {
            f.extension().map(|e| e.to_string_lossy().eq_ignore_ascii_case("md")).unwrap_or(false)
        })
    {
        return Ok(Some("documentation-only change".to_owned()));
    }

    Ok(None)
}

async fn dispatch_index_update(commander: &Commander, program: &str, index: &Path, changed_files: &[PathBuf]) {
    if std::env::var(RECURSION_GUARD_VAR).as_deref() == Ok("1") {
        return;
    }

    let touching: Vec<String> = changed_files.iter().map(|p| p.display().to_string()).collect();
    let spec = Spec::new(program, &[])
        .with_env(RECURSION_GUARD_VAR, "1")
        .with_env("CLAUDEX_INDEX_PATH", index.display().to_string())
        .with_env("CLAUDEX_TOUCHED_FILES", touching.join(","))
        .with_stdio(StdioKind::Null, StdioKind::Null, StdioKind::Null);

    if let Err(e) = commander.start(spec).await {
        warn!(error = %e, index = %index.display(), "range-updater: index dispatch spawn failed");
    }
}

fn read_tracking(path: &Path) -> Option<TrackingState> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn write_tracking(path: &Path, head: &str) -> Result<()> {
    let state = TrackingState {
        last_processed_commit: head.to_owned(),
        updated_at: chrono::Utc::now().to_rfc3339(),
        strategy_version: STRATEGY_VERSION.to_owned(),
    };
    let json = serde_json::to_string_pretty(&state)?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

async fn acquire_with_timeout(path: &Path, timeout: Duration) -> Option<Lock> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match Lock::acquire(path) {
            Ok(lock) => return Some(lock),
            Err(LockError::AlreadyLocked) => {
                if tokio::time::Instant::now() >= deadline {
                    return None;
                }
                tokio::time::sleep(LOCK_POLL_INTERVAL).await;
            }
            Err(_) => return None,
        }
    }
}

#[cfg(test)]
#[path = "range_updater_tests.rs"]
mod tests;
