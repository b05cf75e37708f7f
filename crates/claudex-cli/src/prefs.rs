// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global preferences JSON (`$XDG_CONFIG_HOME/claudex/prefs.json`).
//!
//! Tracks one-time setup prompts that have been declined and the state
//! of the (externally implemented) update checker. Claudex itself never
//! performs the HTTP update check; it only persists the shape the
//! checker reads and writes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use claudex_core::config_dir;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub never_ask_again: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declined_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_succeeded: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prefs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_setup_declined: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declined_at: Option<String>,
    pub update_check: UpdateCheck,
}

impl Prefs {
    /// Resolve the default `prefs.json` path.
    pub fn default_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("prefs.json"))
    }

    /// Load `prefs.json` from `path`, defaulting if absent or malformed.
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path).ok().and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default()
    }

    /// Write `prefs.json` to `path` with two-space indent, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, writer)?;
        Ok(())
    }

    /// Load from the default path, writing a fresh defaulted file on first
    /// run so later runs (and the external update checker) find it in
    /// place. No-op if the default path can't be resolved.
    pub fn load_or_init() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            let prefs = Self::default();
            let _ = prefs.save(&path);
            return prefs;
        }
        Self::load(&path)
    }
}

#[cfg(test)]
#[path = "prefs_tests.rs"]
mod tests;
