// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors surfaced by [`crate::store`], [`crate::doc_updater`], and
/// [`crate::range_updater`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("recursive hook/doc-update invocation blocked")]
    RecursionBlocked,
    #[error("lock already held")]
    AlreadyLocked,
    #[error("base commit unreachable and no fallback branch resolved")]
    UnreachableBase,
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("malformed data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
