// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// The only fatal condition a hook binary can hit: input it cannot make
/// sense of.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("malformed hook input: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown hook event: {0}")]
    UnknownEvent(String),
}
