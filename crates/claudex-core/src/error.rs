// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors surfaced by [`crate::commander::Commander`].
#[derive(Debug, Error)]
pub enum CommanderError {
    #[error("process limit reached")]
    ProcessLimitReached,
    #[error("process timed out")]
    Timeout,
    #[error("process spawn cancelled")]
    Cancelled,
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] std::io::Error),
}
