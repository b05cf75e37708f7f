// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental NDJSON transcript parsing and markdown formatting for
//! prompt embedding.

use std::io::BufRead;
use std::path::Path;

use serde_json::Value;

use crate::error::Result;

/// A semantic record extracted from a raw transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    AssistantMessage { timestamp: String, texts: Vec<String> },
    AgentResult { agent_id: String, texts: Vec<String> },
}

/// Result of [`parse_from`].
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub entries: Vec<TranscriptEntry>,
    /// 1-indexed; equal to the total line count observed.
    pub last_line_read: u64,
}

/// Parse `path` starting at `start_line` (1-indexed, inclusive). Empty or
/// malformed JSON lines are silently skipped but still counted.
pub fn parse_from(path: &Path, start_line: u64) -> Result<ParseOutcome> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);

    let mut entries = Vec::new();
    let mut line_no = 0u64;

    for line in reader.lines() {
        let line = line?;
        line_no += 1;
        if line_no < start_line {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        if let Some(entry) = extract_entry(&value) {
            entries.push(entry);
        }
    }

    Ok(ParseOutcome { entries, last_line_read: line_no })
}

fn extract_entry(value: &Value) -> Option<TranscriptEntry> {
    let kind = value.get("type").and_then(Value::as_str)?;

    if kind == "assistant" {
        let content = value.get("message").and_then(|m| m.get("content")).and_then(Value::as_array)?;
        let texts = extract_texts(content);
        if texts.is_empty() {
            return None;
        }
        let timestamp = value.get("timestamp").and_then(Value::as_str).unwrap_or_default().to_owned();
        return Some(TranscriptEntry::AssistantMessage { timestamp, texts });
    }

    if kind == "user" {
        let result = value.get("toolUseResult")?;
        let status = result.get("status").and_then(Value::as_str)?;
        if status != "completed" {
            return None;
        }
        let agent_id = result.get("agentId").and_then(Value::as_str)?;
        if agent_id.is_empty() {
            return None;
        }
        let content = result.get("content").and_then(Value::as_array)?;
        let texts = extract_texts(content);
        if texts.is_empty() {
            return None;
        }
        return Some(TranscriptEntry::AgentResult { agent_id: agent_id.to_owned(), texts });
    }

    None
}

fn extract_texts(content: &[Value]) -> Vec<String> {
    content
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Format entries as a markdown document for prompt embedding.
pub fn format_markdown(entries: &[TranscriptEntry]) -> String {
    if entries.is_empty() {
        return "No new transcript content.".to_owned();
    }

    let mut out = String::from("# Transcript Increment\n\n");
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str("\n---\n\n");
        }
        match entry {
            TranscriptEntry::AssistantMessage { timestamp, texts } => {
                out.push_str("## Assistant Message\n\n");
                out.push_str(&format!("**Timestamp**: {timestamp}\n\n"));
                out.push_str(&texts.join("\n\n"));
            }
            TranscriptEntry::AgentResult { agent_id, texts } => {
                out.push_str("## Agent Result\n\n");
                out.push_str(&format!("**Agent ID**: {agent_id}\n\n"));
                out.push_str(&texts.join("\n\n"));
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
