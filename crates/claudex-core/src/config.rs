// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML configuration loading, merged with environment and CLI overrides.
//!
//! Precedence, highest first: CLI flags, `CLAUDEX_*` env vars, the loaded
//! `config.toml`, built-in defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// `[features]` section of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Features {
    pub process_protection: ProcessProtection,
    pub doc: Vec<String>,
    pub no_overwrite: bool,
}

/// `[features.process_protection]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessProtection {
    pub autodoc_session_progress: bool,
    pub autodoc_session_end: bool,
    pub autodoc_frequency: u32,
    pub max_processes: usize,
    pub rate_limit_per_second: usize,
    pub timeout_seconds: u64,
}

impl Default for ProcessProtection {
    fn default() -> Self {
        Self {
            autodoc_session_progress: true,
            autodoc_session_end: true,
            autodoc_frequency: 5,
            max_processes: default_max_processes(),
            rate_limit_per_second: 5,
            timeout_seconds: 300,
        }
    }
}

fn default_max_processes() -> usize {
    2 * std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Top-level `config.toml` shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub features: Features,
}

/// Read a `usize` from an env var, falling back to a default.
fn env_usize(var: &str, default: usize) -> usize {
    std::env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Read a `u64` from an env var, falling back to a default.
fn env_u64(var: &str, default: u64) -> u64 {
    std::env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    /// Locate `config.toml` under `$XDG_CONFIG_HOME/claudex` or
    /// `$HOME/.config/claudex`. Returns `None` if neither is set.
    pub fn default_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load `config.toml` from `path`, falling back to defaults if the
    /// file is absent. A malformed file is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from [`Self::default_path`], or defaults if unresolvable.
    pub fn load_default() -> anyhow::Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Apply `CLAUDEX_MAX_PROCESSES`/`CLAUDEX_RATE_LIMIT`/`CLAUDEX_TIMEOUT`
    /// overrides on top of the loaded values.
    pub fn apply_env_overrides(&mut self) {
        let pp = &mut self.features.process_protection;
        pp.max_processes = env_usize("CLAUDEX_MAX_PROCESSES", pp.max_processes);
        pp.rate_limit_per_second = env_usize("CLAUDEX_RATE_LIMIT", pp.rate_limit_per_second);
        pp.timeout_seconds = env_u64("CLAUDEX_TIMEOUT", pp.timeout_seconds);
    }
}

/// Resolve `$XDG_CONFIG_HOME/claudex` or `$HOME/.config/claudex`.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Some(PathBuf::from(xdg).join("claudex"));
        }
    }
    std::env::var("HOME").ok().map(|home| PathBuf::from(home).join(".config").join("claudex"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
