// Copyright (c) 2026 Joseph Verdicchio and certreq Contributors
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use thiserror::Error;

pub type ProcessResult<T> = Result<T, ProcessError>;

/// Errors surfaced to callers of [`crate::RequestProcessor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request not found: {0}")]
    NotFound(String),
}

/// Failure of the downstream certification call.
///
/// Absorbed by the processor into `NEEDS_REVIEW`; never returned from `submit`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownstreamError {
    #[error("certification rejected: {0}")]
    Rejected(String),

    #[error("certification service unavailable: {0}")]
    Unavailable(String),

    #[error("certification timed out after {0:?}")]
    Timeout(Duration),
}
