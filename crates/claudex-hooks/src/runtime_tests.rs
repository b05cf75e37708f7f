// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Mutex;

use super::*;
use crate::events::{Envelope, PermissionDecision};
use claudex_core::Policy;
use tempfile::tempdir;

struct RecordingNotifier {
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self { calls: Mutex::new(Vec::new()) }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.calls.lock().unwrap().push((title.to_owned(), message.to_owned()));
    }
}

fn envelope(session_path: &std::path::Path) -> Envelope {
    Envelope {
        session_id: "s1".into(),
        transcript_path: session_path.join("t.ndjson").display().to_string(),
        cwd: session_path.display().to_string(),
        permission_mode: None,
    }
}

fn transcript_with_one_entry(session_path: &std::path::Path) {
    std::fs::write(
        session_path.join("t.ndjson"),
        r#"{"type":"assistant","timestamp":"t1","message":{"content":[{"type":"text","text":"hi"}]}}"#,
    )
    .unwrap();
}

fn context_with<'a>(
    commander: &'a Commander,
    notifier: &'a dyn Notifier,
    template_path: &'a Path,
    frequency: u32,
) -> HookContext<'a> {
    HookContext {
        commander,
        notifier,
        autodoc_session_progress: true,
        autodoc_session_end: true,
        doc_update_frequency: frequency,
        doc_update_program: "sh",
        doc_update_args: &[],
        prompt_template_path: template_path,
        session_context: "ctx",
        model: "test-model",
    }
}

#[tokio::test]
async fn pre_tool_use_always_allows() {
    let dir = tempdir().unwrap();
    let commander = Commander::new(Policy::default());
    let notifier = RecordingNotifier::new();
    let template_path = dir.path().join("template.md");
    std::fs::write(&template_path, "go").unwrap();
    let ctx = context_with(&commander, &notifier, &template_path, 5);

    let event = HookEvent::PreToolUse {
        envelope: envelope(dir.path()),
        tool_name: "Bash".into(),
        tool_input: serde_json::json!({"command": "ls"}),
    };

    let response = dispatch(event, &ctx).await;
    let out = response.hook_specific_output.unwrap();
    assert_eq!(out.hook_event_name, "PreToolUse");
    assert_eq!(out.permission_decision, PermissionDecision::Allow);
}

#[tokio::test]
async fn post_tool_use_drives_counter_and_triggers_at_threshold() {
    let dir = tempdir().unwrap();
    transcript_with_one_entry(dir.path());
    let template_path = dir.path().join("template.md");
    std::fs::write(&template_path, "go: $RELEVANT_CONTENT").unwrap();
    let commander = Commander::new(Policy::default());
    let notifier = RecordingNotifier::new();
    let ctx = context_with(&commander, &notifier, &template_path, 5);
    let counter_path = dir.path().join(".doc-update-counter");

    for expected in 1..=4u32 {
        let event = HookEvent::PostToolUse {
            envelope: envelope(dir.path()),
            tool_name: "Bash".into(),
            tool_input: serde_json::Value::Null,
            tool_response: serde_json::Value::Null,
        };
        let response = dispatch(event, &ctx).await;
        assert_eq!(response.hook_specific_output.unwrap().permission_decision, PermissionDecision::Allow);
        assert_eq!(std::fs::read_to_string(&counter_path).unwrap(), expected.to_string());
        assert!(!dir.path().join(".last-processed-line-overview").exists());
    }

    let event = HookEvent::PostToolUse {
        envelope: envelope(dir.path()),
        tool_name: "Bash".into(),
        tool_input: serde_json::Value::Null,
        tool_response: serde_json::Value::Null,
    };
    dispatch(event, &ctx).await;

    assert_eq!(std::fs::read_to_string(&counter_path).unwrap(), "0");
    assert!(dir.path().join(".last-processed-line-overview").exists());
}

#[tokio::test]
async fn notification_returns_empty_envelope_and_notifies() {
    let dir = tempdir().unwrap();
    let commander = Commander::new(Policy::default());
    let notifier = RecordingNotifier::new();
    let template_path = dir.path().join("template.md");
    std::fs::write(&template_path, "go").unwrap();
    let ctx = context_with(&commander, &notifier, &template_path, 5);

    let event = HookEvent::Notification {
        envelope: envelope(dir.path()),
        message: "hello there".into(),
        notification_type: None,
    };

    let response = dispatch(event, &ctx).await;
    assert!(response.hook_specific_output.is_none());
    assert_eq!(notifier.calls.lock().unwrap().as_slice(), &[("claudex".to_owned(), "hello there".to_owned())]);
}

#[tokio::test]
async fn session_end_triggers_doc_update_when_enabled() {
    let dir = tempdir().unwrap();
    transcript_with_one_entry(dir.path());
    let template_path = dir.path().join("template.md");
    std::fs::write(&template_path, "go: $RELEVANT_CONTENT").unwrap();
    let commander = Commander::new(Policy::default());
    let notifier = RecordingNotifier::new();
    let ctx = context_with(&commander, &notifier, &template_path, 1000);

    let event = HookEvent::SessionEnd { envelope: envelope(dir.path()), reason: Some("done".into()) };
    let response = dispatch(event, &ctx).await;

    assert_eq!(response.hook_specific_output.unwrap().permission_decision, PermissionDecision::Allow);
    assert!(dir.path().join(".last-processed-line-overview").exists());
}

#[tokio::test]
async fn session_end_skips_doc_update_when_autodoc_session_end_is_disabled() {
    let dir = tempdir().unwrap();
    transcript_with_one_entry(dir.path());
    let template_path = dir.path().join("template.md");
    std::fs::write(&template_path, "go: $RELEVANT_CONTENT").unwrap();
    let commander = Commander::new(Policy::default());
    let notifier = RecordingNotifier::new();
    let mut ctx = context_with(&commander, &notifier, &template_path, 1000);
    ctx.autodoc_session_end = false;

    let event = HookEvent::SessionEnd { envelope: envelope(dir.path()), reason: Some("done".into()) };
    let response = dispatch(event, &ctx).await;

    assert_eq!(response.hook_specific_output.unwrap().permission_decision, PermissionDecision::Allow);
    assert!(!dir.path().join(".last-processed-line-overview").exists());
}

#[tokio::test]
async fn post_tool_use_skips_counter_when_autodoc_session_progress_is_disabled() {
    let dir = tempdir().unwrap();
    let template_path = dir.path().join("template.md");
    std::fs::write(&template_path, "go").unwrap();
    let commander = Commander::new(Policy::default());
    let notifier = RecordingNotifier::new();
    let mut ctx = context_with(&commander, &notifier, &template_path, 1);
    ctx.autodoc_session_progress = false;
    let counter_path = dir.path().join(".doc-update-counter");

    let event = HookEvent::PostToolUse {
        envelope: envelope(dir.path()),
        tool_name: "Bash".into(),
        tool_input: serde_json::Value::Null,
        tool_response: serde_json::Value::Null,
    };
    let response = dispatch(event, &ctx).await;

    assert_eq!(response.hook_specific_output.unwrap().permission_decision, PermissionDecision::Allow);
    assert!(!counter_path.exists());
}

#[tokio::test]
async fn subagent_stop_triggers_doc_update_and_notifies() {
    let dir = tempdir().unwrap();
    transcript_with_one_entry(dir.path());
    let template_path = dir.path().join("template.md");
    std::fs::write(&template_path, "go: $RELEVANT_CONTENT").unwrap();
    let commander = Commander::new(Policy::default());
    let notifier = RecordingNotifier::new();
    let ctx = context_with(&commander, &notifier, &template_path, 1000);

    let event = HookEvent::SubagentStop { envelope: envelope(dir.path()), agent_id: Some("agent-1".into()) };
    let response = dispatch(event, &ctx).await;

    assert_eq!(response.hook_specific_output.unwrap().permission_decision, PermissionDecision::Allow);
    assert!(dir.path().join(".last-processed-line-overview").exists());
    assert_eq!(notifier.calls.lock().unwrap().as_slice(), &[("claudex".to_owned(), "subagent stopped".to_owned())]);
}

#[tokio::test]
async fn doc_updater_failure_never_changes_the_decision() {
    let dir = tempdir().unwrap();
    // No template file written: doc update will fail to read it and only log a warning.
    let template_path = dir.path().join("missing-template.md");
    let commander = Commander::new(Policy::default());
    let notifier = RecordingNotifier::new();
    let ctx = context_with(&commander, &notifier, &template_path, 1000);

    let event = HookEvent::SessionEnd { envelope: envelope(dir.path()), reason: None };
    let response = dispatch(event, &ctx).await;

    assert_eq!(response.hook_specific_output.unwrap().permission_decision, PermissionDecision::Allow);
}
