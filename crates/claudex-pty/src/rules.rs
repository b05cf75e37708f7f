// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interception rules: a `{pattern, action}` pair evaluated against input
//! lines (at ENTER) or the output window (continuously). Actions are a
//! closed set of literal rewrites plus an extension point for
//! host-provided callbacks, so rules can be built either from static
//! configuration or from code.

use std::collections::HashMap;
use std::sync::Arc;

use regex::bytes::Regex;
use tracing::warn;

/// Byte sink a rule handler writes into. What happens to the bytes
/// afterwards depends on the pipeline: the input pipeline forwards them to
/// the PTY in place of (or ahead of) the original line; the output
/// pipeline injects them into the PTY as synthetic input.
#[derive(Debug, Default)]
pub struct RuleWriter(Vec<u8>);

impl RuleWriter {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn write_str(&mut self, s: &str) {
        self.0.extend_from_slice(s.as_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Single-byte ENTER-emulating submission sequences. Neither is guaranteed
/// to submit in every terminal mode; a handler that needs both should call
/// [`RuleWriter::write_bytes`] with each in turn rather than relying on one.
pub const SUBMIT_CR: u8 = b'\r';
pub const SUBMIT_LF: u8 = b'\n';

/// A host-provided callback, looked up by name via [`RuleAction::InvokeNamed`]
/// or carried directly via [`RuleAction::Invoke`]. Takes the matched text and
/// a writer to accumulate its output into; returns whether the match should
/// be treated as "swallowed" (meaningful only for input rules).
pub type HandlerFn = dyn Fn(&str, &mut RuleWriter) -> bool + Send + Sync;

/// What a matching rule does.
pub enum RuleAction {
    /// Write a literal and signal "don't swallow" (append, for input rules).
    AppendLiteral(String),
    /// Write a literal and signal "swallow" (replace, for input rules).
    ReplaceWithLiteral(String),
    /// Look up a callback by name in the interceptor's [`HandlerRegistry`].
    InvokeNamed(String),
    /// Carry a callback directly, bypassing the registry.
    Invoke(Arc<HandlerFn>),
}

impl RuleAction {
    fn apply(&self, matched: &str, writer: &mut RuleWriter, registry: &HandlerRegistry) -> bool {
        match self {
            RuleAction::AppendLiteral(s) => {
                writer.write_str(s);
                false
            }
            RuleAction::ReplaceWithLiteral(s) => {
                writer.write_str(s);
                true
            }
            RuleAction::InvokeNamed(name) => match registry.get(name) {
                Some(handler) => handler(matched, writer),
                None => {
                    warn!(name, "pty: no handler registered for rule");
                    false
                }
            },
            RuleAction::Invoke(handler) => handler(matched, writer),
        }
    }
}

/// A `{pattern, action}` pair. Input rules fire at most once per ENTER;
/// output rules fire once per match occurrence in the rolling window.
pub struct InterceptorRule {
    pub pattern: Regex,
    pub action: RuleAction,
}

impl InterceptorRule {
    pub fn new(pattern: Regex, action: RuleAction) -> Self {
        Self { pattern, action }
    }

    /// Evaluate this rule against `text`, applying its action if it matches.
    /// Returns `None` if the pattern didn't match, else `(suppress, written)`.
    /// Used by the input pipeline, which only ever evaluates the rule once
    /// per ENTER.
    pub fn evaluate(&self, text: &[u8], registry: &HandlerRegistry) -> Option<(bool, Vec<u8>)> {
        let m = self.pattern.find(text)?;
        let matched = String::from_utf8_lossy(m.as_bytes());
        let mut writer = RuleWriter::new();
        let suppress = self.action.apply(&matched, &mut writer, registry);
        Some((suppress, writer.into_bytes()))
    }

    /// Evaluate every match in `text` starting at byte offset `from`,
    /// applying the action for each. Returns `(match_end_offset, written)`
    /// pairs so the output pipeline can track a monotonic fired-offset.
    pub fn evaluate_all_from(
        &self,
        text: &[u8],
        from: usize,
        registry: &HandlerRegistry,
    ) -> Vec<(usize, Vec<u8>)> {
        let start = from.min(text.len());
        self.pattern
            .find_iter(&text[start..])
            .map(|m| {
                let matched = String::from_utf8_lossy(m.as_bytes());
                let mut writer = RuleWriter::new();
                self.action.apply(&matched, &mut writer, registry);
                (start + m.end(), writer.into_bytes())
            })
            .collect()
    }
}

/// Registry of named callbacks for [`RuleAction::InvokeNamed`]. Registration
/// happens at startup; the registry is immutable once rules start firing.
#[derive(Clone, Default)]
pub struct HandlerRegistry(HashMap<String, Arc<HandlerFn>>);

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<HandlerFn>) {
        self.0.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<HandlerFn>> {
        self.0.get(name)
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
