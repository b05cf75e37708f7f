// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session directory layout: creation, forking, fresh-memory reset, resume,
//! and listing. A session is a directory named `<slug>-<uuid>` under the
//! store's root, holding metadata files and whatever doc artifacts later
//! processing produces.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

use crate::error::{Result, SessionError};

const MAX_SLUG_LEN: usize = 50;
const MIN_SLUG_LEN: usize = 3;

fn uuid_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"-[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
    })
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(
            r"^(?P<base>.+)-(?P<uuid>[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})(?:-(?P<counter>\d+))?$",
        )
        .unwrap()
    })
}

/// Does `name` end with a canonical UUID-v4 suffix?
pub fn is_session_name(name: &str) -> bool {
    uuid_suffix_re().is_match(name)
}

/// Extract the UUID suffix from a session directory name, if present.
pub fn extract_uuid(name: &str) -> Option<&str> {
    name_re().captures(name).and_then(|c| c.name("uuid")).map(|m| m.as_str())
}

/// Strip the trailing UUID (and optional `-<N>` collision counter) from a
/// session directory name, yielding the base slug.
pub fn strip_uuid(name: &str) -> &str {
    match name_re().captures(name) {
        Some(c) => {
            #[allow(clippy::unwrap_used)]
            let base = c.name("base").unwrap().as_str();
            base
        }
        None => name,
    }
}

/// Deterministically derive a slug from free text: lowercase, replace
/// non-alphanumerics with `-`, collapse runs of `-`, trim, truncate.
pub fn derive_slug(description: &str) -> String {
    let lower = description.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut last_was_dash = false;
    for ch in lower.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    let trimmed = out.trim_matches('-');
    let truncated = if trimmed.len() > MAX_SLUG_LEN { &trimmed[..MAX_SLUG_LEN] } else { trimmed };
    let mut slug = truncated.trim_matches('-').to_owned();
    if slug.is_empty() {
        slug = "session".to_owned();
    }
    while slug.len() < MIN_SLUG_LEN {
        slug.push('x');
    }
    slug
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Result of [`SessionStore::create`] / [`SessionStore::fork`] /
/// [`SessionStore::fresh_memory`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub name: String,
    pub path: PathBuf,
    pub uuid: Uuid,
}

/// Metadata surfaced by [`SessionStore::list`].
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub name: String,
    pub path: PathBuf,
    pub last_used: Option<chrono::DateTime<chrono::Utc>>,
    pub created: Option<chrono::DateTime<chrono::Utc>>,
}

/// On-disk session directory layout under a single root.
pub struct SessionStore {
    sessions_dir: PathBuf,
}

impl SessionStore {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self { sessions_dir: sessions_dir.into() }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Create a new session directory. `proposed_slug`, when given and a
    /// valid slug shape, is used verbatim (the caller — e.g. the CLI
    /// wrapper's assistant-proposed-slug path — is responsible for asking
    /// the wrapped assistant CLI for a slug and validating/falling back
    /// before calling this). Absent a proposal, the slug is derived
    /// deterministically from `description`.
    pub fn create(
        &self,
        description: &str,
        proposed_slug: Option<&str>,
    ) -> Result<SessionHandle> {
        let description = description.trim();
        if description.is_empty() {
            return Err(SessionError::Validation("description must be non-empty".into()));
        }

        let slug = proposed_slug
            .filter(|s| s.len() >= MIN_SLUG_LEN && s.len() <= MAX_SLUG_LEN)
            .map(str::to_owned)
            .unwrap_or_else(|| derive_slug(description));

        let uuid = Uuid::new_v4();
        let (name, path) = self.unique_name(&slug, uuid)?;

        fs::create_dir_all(&path)?;
        fs::write(path.join(".description"), description)?;
        fs::write(path.join(".created"), now_rfc3339())?;

        Ok(SessionHandle { name, path, uuid })
    }

    /// Fork an existing session: new UUID, new slug from `description`,
    /// same base slug family lineage severed (a fresh slug is derived, per
    /// spec), recursive copy of the original directory's contents, then
    /// overwrite `.description`.
    pub fn fork(&self, original_name: &str, description: &str) -> Result<SessionHandle> {
        let original_path = self.sessions_dir.join(original_name);
        if !original_path.is_dir() {
            return Err(SessionError::NotFound(original_name.to_owned()));
        }

        let new_slug = derive_slug(description);
        let uuid = Uuid::new_v4();
        let (name, path) = self.unique_name(&new_slug, uuid)?;

        copy_dir_recursive(&original_path, &path)?;
        fs::write(path.join(".description"), description.trim())?;

        Ok(SessionHandle { name, path, uuid })
    }

    /// Reset a session to "fresh memory": new UUID, same base slug,
    /// recursive copy, transcript markers and doc-update counter cleared,
    /// then the original directory is removed.
    pub fn fresh_memory(&self, original_name: &str) -> Result<SessionHandle> {
        let original_path = self.sessions_dir.join(original_name);
        if !original_path.is_dir() {
            return Err(SessionError::NotFound(original_name.to_owned()));
        }

        let base_slug = strip_uuid(original_name);
        let uuid = Uuid::new_v4();
        let (name, path) = self.unique_name(base_slug, uuid)?;

        copy_dir_recursive(&original_path, &path)?;

        for marker in [".last-processed-line-overview", ".last-processed-line"] {
            let _ = fs::remove_file(path.join(marker));
        }
        fs::write(path.join(".doc-update-counter"), "0")?;

        fs::remove_dir_all(&original_path)?;

        Ok(SessionHandle { name, path, uuid })
    }

    /// Touch `.last_used` to the current time. Fails if the session
    /// directory does not exist.
    pub fn resume(&self, name: &str) -> Result<()> {
        let path = self.sessions_dir.join(name);
        if !path.is_dir() {
            return Err(SessionError::NotFound(name.to_owned()));
        }
        fs::write(path.join(".last_used"), now_rfc3339())?;
        Ok(())
    }

    /// List sessions ordered by `.last_used` (falling back to `.created`)
    /// descending, most recent first.
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries = Vec::new();
        let entries = match fs::read_dir(&self.sessions_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(summaries),
            Err(e) => return Err(e.into()),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let last_used = read_timestamp(&path.join(".last_used"));
            let created = read_timestamp(&path.join(".created"));
            summaries.push(SessionSummary { name, path, last_used, created });
        }

        summaries.sort_by(|a, b| {
            let key = |s: &SessionSummary| s.last_used.or(s.created);
            key(b).cmp(&key(a))
        });
        Ok(summaries)
    }

    /// Compose `<slug>-<uuid>`, suffixing `-1`, `-2`, ... on collision.
    fn unique_name(&self, slug: &str, uuid: Uuid) -> Result<(String, PathBuf)> {
        let base = format!("{slug}-{uuid}");
        let mut candidate = base.clone();
        let mut n = 1u32;
        loop {
            let path = self.sessions_dir.join(&candidate);
            if !path.exists() {
                return Ok((candidate, path));
            }
            candidate = format!("{base}-{n}");
            n += 1;
        }
    }
}

fn read_timestamp(path: &Path) -> Option<chrono::DateTime<chrono::Utc>> {
    let contents = fs::read_to_string(path).ok()?;
    chrono::DateTime::parse_from_rfc3339(contents.trim()).ok().map(|dt| dt.with_timezone(&chrono::Utc))
}

/// Recursively copy a directory, preserving only the shell-script-vs-other
/// executable-bit distinction (`0755` for `.sh`/shebang-prefixed files,
/// `0644` otherwise) rather than the source file's exact mode bits.
fn copy_dir_recursive(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let from_path = entry.path();
        let to_path = to.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_dir_recursive(&from_path, &to_path)?;
        } else if file_type.is_file() {
            fs::copy(&from_path, &to_path)?;
            set_copied_mode(&to_path)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn set_copied_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let is_script = path.extension().is_some_and(|e| e == "sh")
        || fs::read(path).map(|b| b.starts_with(b"#!")).unwrap_or(false);
    let mode = if is_script { 0o755 } else { 0o644 };
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_copied_mode(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
