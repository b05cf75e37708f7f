// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch logic for the hook binary: routes a [`HookEvent`] to a
//! [`HookResponse`], driving the auto-doc counter and background doc
//! update along the way. All side effects (logging, notification,
//! doc-updater spawn, counter I/O) are caught and logged — none of them
//! are allowed to flip the permission decision.

use std::path::{Path, PathBuf};

use claudex_core::Commander;
use claudex_session::{DocUpdateInput, DocUpdateOutcome};
use tracing::warn;

use crate::events::{HookEvent, HookResponse};

const DOC_UPDATE_COUNTER_FILE: &str = ".doc-update-counter";

/// OS-level notification emission (osascript/say and friends) is an
/// external collaborator per this crate's scope; the binary wires a
/// concrete implementation at the application root. Tests use a no-op.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _title: &str, _message: &str) {}
}

/// Everything the dispatch logic needs beyond what's in the event itself.
pub struct HookContext<'a> {
    pub commander: &'a Commander,
    pub notifier: &'a dyn Notifier,
    /// `features.process_protection.autodoc_session_progress`: gates the
    /// PostToolUse counter drive. When `false`, PostToolUse never advances
    /// or checks the counter.
    pub autodoc_session_progress: bool,
    /// `features.process_protection.autodoc_session_end`: gates the
    /// SessionEnd/SubagentStop doc-update trigger.
    pub autodoc_session_end: bool,
    pub doc_update_frequency: u32,
    pub doc_update_program: &'a str,
    pub doc_update_args: &'a [String],
    pub prompt_template_path: &'a Path,
    pub session_context: &'a str,
    pub model: &'a str,
}

/// Route one hook event to its response, driving side effects along the
/// way. The returned response's decision is always computed before any
/// side effect runs, and side-effect failures never change it.
pub async fn dispatch(event: HookEvent, ctx: &HookContext<'_>) -> HookResponse {
    let name = event.name();

    match &event {
        HookEvent::PreToolUse { .. } => HookResponse::allow(name),
        HookEvent::PostToolUse { .. } => {
            if ctx.autodoc_session_progress {
                let transcript_path = event.envelope().transcript_path.clone();
                let session_path = session_dir(&transcript_path);
                drive_counter_threshold(&session_path, &transcript_path, ctx).await;
            }
            HookResponse::allow(name)
        }
        HookEvent::Notification { message, .. } => {
            ctx.notifier.notify("claudex", message);
            HookResponse::empty()
        }
        HookEvent::SessionEnd { .. } => {
            if ctx.autodoc_session_end {
                let session_path = session_dir(event.envelope().transcript_path.as_ref());
                trigger_doc_update(&session_path, event.envelope().transcript_path.as_ref(), ctx).await;
            }
            HookResponse::allow(name)
        }
        HookEvent::SubagentStop { .. } => {
            if ctx.autodoc_session_end {
                let session_path = session_dir(event.envelope().transcript_path.as_ref());
                trigger_doc_update(&session_path, event.envelope().transcript_path.as_ref(), ctx).await;
            }
            ctx.notifier.notify("claudex", "subagent stopped");
            HookResponse::allow(name)
        }
    }
}

fn session_dir(transcript_path: &str) -> PathBuf {
    Path::new(transcript_path).parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
}

/// Increment `.doc-update-counter`; at `frequency` reset to 0 and trigger
/// a doc update. Counter I/O and spawn failures are logged, not
/// propagated.
async fn drive_counter_threshold(session_path: &Path, transcript_path: &str, ctx: &HookContext<'_>) {
    let counter_path = session_path.join(DOC_UPDATE_COUNTER_FILE);
    let current = read_counter(&counter_path);
    let next = current + 1;

    if next >= ctx.doc_update_frequency {
        if let Err(e) = std::fs::write(&counter_path, "0") {
            warn!(error = %e, "hooks: failed to reset doc-update counter");
        }
        trigger_doc_update(session_path, transcript_path, ctx).await;
    } else if let Err(e) = std::fs::write(&counter_path, next.to_string()) {
        warn!(error = %e, "hooks: failed to write doc-update counter");
    }
}

fn read_counter(path: &Path) -> u32 {
    std::fs::read_to_string(path).ok().and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

async fn trigger_doc_update(session_path: &Path, transcript_path: &str, ctx: &HookContext<'_>) {
    let start_line =
        claudex_session::doc_updater::read_last_processed_line(session_path) + 1;

    let input = DocUpdateInput {
        session_path,
        transcript_path: Path::new(transcript_path),
        prompt_template_path: ctx.prompt_template_path,
        session_context: ctx.session_context,
        model: ctx.model,
        start_line,
        output_file: None,
    };

    match claudex_session::run_doc_update(ctx.commander, ctx.doc_update_program, ctx.doc_update_args, input)
        .await
    {
        Ok(DocUpdateOutcome::Spawned | DocUpdateOutcome::NoNewContent) => {}
        Err(e) => warn!(error = %e, "hooks: doc-updater invocation failed"),
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
