// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON wire types for the hook stdin/stdout contract.

use serde::{Deserialize, Serialize};

/// Fields common to every hook event.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub session_id: String,
    pub transcript_path: String,
    pub cwd: String,
    #[serde(default)]
    pub permission_mode: Option<String>,
}

/// One JSON object read from stdin, dispatched on `hook_event_name`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "hook_event_name")]
pub enum HookEvent {
    PreToolUse {
        #[serde(flatten)]
        envelope: Envelope,
        tool_name: String,
        #[serde(default)]
        tool_input: serde_json::Value,
    },
    PostToolUse {
        #[serde(flatten)]
        envelope: Envelope,
        tool_name: String,
        #[serde(default)]
        tool_input: serde_json::Value,
        /// Any JSON shape (object, array, string, number, boolean, null)
        /// and must round-trip without loss.
        tool_response: serde_json::Value,
    },
    Notification {
        #[serde(flatten)]
        envelope: Envelope,
        message: String,
        #[serde(default)]
        notification_type: Option<String>,
    },
    SessionEnd {
        #[serde(flatten)]
        envelope: Envelope,
        #[serde(default)]
        reason: Option<String>,
    },
    SubagentStop {
        #[serde(flatten)]
        envelope: Envelope,
        #[serde(default)]
        agent_id: Option<String>,
    },
}

impl HookEvent {
    pub fn envelope(&self) -> &Envelope {
        match self {
            Self::PreToolUse { envelope, .. }
            | Self::PostToolUse { envelope, .. }
            | Self::Notification { envelope, .. }
            | Self::SessionEnd { envelope, .. }
            | Self::SubagentStop { envelope, .. } => envelope,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PreToolUse { .. } => "PreToolUse",
            Self::PostToolUse { .. } => "PostToolUse",
            Self::Notification { .. } => "Notification",
            Self::SessionEnd { .. } => "SessionEnd",
            Self::SubagentStop { .. } => "SubagentStop",
        }
    }
}

/// Permission verdict carried in [`HookSpecificOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: String,
    pub permission_decision: PermissionDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<serde_json::Value>,
}

/// Response envelope written to stdout. Notification events produce an
/// empty envelope (no decision field).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

impl HookResponse {
    pub fn allow(hook_event_name: &str) -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput {
                hook_event_name: hook_event_name.to_owned(),
                permission_decision: PermissionDecision::Allow,
                permission_decision_reason: None,
                updated_input: None,
            }),
        }
    }

    pub fn empty() -> Self {
        Self { hook_specific_output: None }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
