// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt templating and background dispatch of the doc-update subprocess.
//!
//! Guarded against recursion via `CLAUDE_HOOK_INTERNAL`: a doc-update
//! subprocess spawned by this module sets that variable in its own
//! environment, so if it in turn drives another hook event through
//! [`crate::doc_updater`], that nested call observes the guard and bails
//! before spawning a grandchild.

use std::fs::File;
use std::path::Path;

use claudex_core::{Commander, Spec, StdioKind};
use tracing::warn;

use crate::error::{Result, SessionError};
use crate::transcript::{format_markdown, parse_from};

pub const RECURSION_GUARD_VAR: &str = "CLAUDE_HOOK_INTERNAL";
const LAST_PROCESSED_LINE_OVERVIEW: &str = ".last-processed-line-overview";

/// Inputs to a single doc-update invocation.
pub struct DocUpdateInput<'a> {
    pub session_path: &'a Path,
    pub transcript_path: &'a Path,
    pub prompt_template_path: &'a Path,
    pub session_context: &'a str,
    pub model: &'a str,
    pub start_line: u64,
    pub output_file: Option<&'a Path>,
}

impl DocUpdateInput<'_> {
    fn validate(&self) -> Result<()> {
        if self.session_context.trim().is_empty() || self.model.trim().is_empty() {
            return Err(SessionError::Validation("session_context and model must be non-empty".into()));
        }
        if self.start_line < 1 {
            return Err(SessionError::Validation("start_line must be >= 1".into()));
        }
        Ok(())
    }
}

/// Whether [`run_background`] issued a spawn, and why not if it didn't.
#[derive(Debug, PartialEq, Eq)]
pub enum DocUpdateOutcome {
    Spawned,
    NoNewContent,
}

/// Run a doc-update cycle: parse the transcript increment, template the
/// prompt, and spawn a detached subprocess via `commander` to do the
/// actual (model-driven) doc regeneration. Errors from the detached child
/// itself are never observed here — the spawn call either succeeds or it
/// doesn't.
pub async fn run_background(
    commander: &Commander,
    program: &str,
    args: &[String],
    input: DocUpdateInput<'_>,
) -> Result<DocUpdateOutcome> {
    input.validate()?;

    if std::env::var(RECURSION_GUARD_VAR).as_deref() == Ok("1") {
        return Err(SessionError::RecursionBlocked);
    }

    let template = std::fs::read_to_string(input.prompt_template_path)?;
    if template.trim().is_empty() {
        return Err(SessionError::Validation("prompt template is empty".into()));
    }

    let parsed = parse_from(input.transcript_path, input.start_line)?;
    if parsed.entries.is_empty() {
        return Ok(DocUpdateOutcome::NoNewContent);
    }

    let relevant_content = format_markdown(&parsed.entries);
    let prompt = substitute(&template, input.session_context, &relevant_content, input.session_path);

    let stdout = match input.output_file {
        Some(path) => StdioKind::Raw(File::create(path)?.into()),
        None => StdioKind::Null,
    };

    let spec = Spec::new(program, args)
        .with_env(RECURSION_GUARD_VAR, "1")
        .with_env("CLAUDEX_PROMPT", prompt)
        .with_stdio(StdioKind::Null, stdout, StdioKind::Null);

    // Detached: fire-and-forget, must survive the parent exiting.
    match commander.start(spec).await {
        Ok(handle) => {
            std::mem::drop(handle);
        }
        Err(e) => {
            warn!(error = %e, "doc-updater: spawn failed");
        }
    }

    std::fs::write(
        input.session_path.join(LAST_PROCESSED_LINE_OVERVIEW),
        parsed.last_line_read.to_string(),
    )?;

    Ok(DocUpdateOutcome::Spawned)
}

fn substitute(template: &str, session_context: &str, relevant_content: &str, session_path: &Path) -> String {
    template
        .replace("$RELEVANT_CONTENT", relevant_content)
        .replace("$DOC_CONTEXT", session_context)
        .replace("$SESSION_FOLDER", &session_path.display().to_string())
}

/// Read the session's `.last-processed-line-overview` marker. Absent = 0.
/// The next call's `start_line` is this value + 1.
pub fn read_last_processed_line(session_path: &Path) -> u64 {
    std::fs::read_to_string(session_path.join(LAST_PROCESSED_LINE_OVERVIEW))
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "doc_updater_tests.rs"]
mod tests;
