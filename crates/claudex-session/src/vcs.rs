// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Injectable version-control operations for [`crate::range_updater`]. The
//! default implementation shells out to `git`, matching the rest of this
//! crate's preference for invoking external tools over linking a VCS
//! library.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Result, SessionError};

/// VCS operations needed by the range updater. Implementations are
/// expected to operate against a single fixed repository root.
pub trait VcsService: Send + Sync {
    fn head(&self) -> Result<String>;
    fn is_reachable(&self, commit: &str) -> Result<bool>;
    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>>;
    fn diff_files(&self, base: &str, head: &str) -> Result<Vec<PathBuf>>;
    fn log_messages(&self, base: &str, head: &str) -> Result<Vec<String>>;
}

/// `git` CLI-backed [`VcsService`].
pub struct GitCli {
    repo_root: PathBuf,
}

impl GitCli {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self { repo_root: repo_root.into() }
    }

    fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        Command::new("git")
            .arg("-C")
            .arg(&self.repo_root)
            .args(args)
            .output()
            .map_err(SessionError::Io)
    }
}

impl VcsService for GitCli {
    fn head(&self) -> Result<String> {
        let output = self.run(&["rev-parse", "HEAD"])?;
        if !output.status.success() {
            return Err(SessionError::Validation("git rev-parse HEAD failed".into()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }

    fn is_reachable(&self, commit: &str) -> Result<bool> {
        let output = self.run(&["cat-file", "-e", &format!("{commit}^{{commit}}")])?;
        Ok(output.status.success())
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        let output = self.run(&["merge-base", a, b])?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_owned()))
    }

    fn diff_files(&self, base: &str, head: &str) -> Result<Vec<PathBuf>> {
        let output = self.run(&["diff", "--name-only", &format!("{base}..{head}")])?;
        if !output.status.success() {
            return Err(SessionError::Validation("git diff failed".into()));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    fn log_messages(&self, base: &str, head: &str) -> Result<Vec<String>> {
        let output = self.run(&["log", "--format=%B%x00", &format!("{base}..{head}")])?;
        if !output.status.success() {
            return Err(SessionError::Validation("git log failed".into()));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .split('\0')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect())
    }
}

/// Resolve the nearest ancestor `index.md` for `file`, walking from its
/// directory upward until a sibling `index.md` exists or the repo root
/// is reached.
pub fn nearest_index(repo_root: &Path, file: &Path) -> Option<PathBuf> {
    let file_abs = repo_root.join(file);
    let mut dir = file_abs.parent()?.to_path_buf();
    loop {
        let candidate = dir.join("index.md");
        if candidate.exists() {
            return Some(candidate);
        }
        if dir == repo_root {
            return None;
        }
        dir = dir.parent()?.to_path_buf();
    }
}
