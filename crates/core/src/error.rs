// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Compile error taxonomy.
//!
//! Every way a submit can fail, as a sum type the caller must branch on
//! before it can touch a success value. The variants deliberately
//! distinguish "the compiler rejected this input" from "the environment is
//! broken" from "try again in a moment" so a calling UI or agent can decide
//! whether to retry immediately, retry later, or change the input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal failure of one compile request.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// The compiler was busy for longer than the configured wait bound.
    /// Retryable; surfaces to callers as "server busy".
    #[error("compiler busy: gave up after waiting {waited_ms}ms for the compile lock")]
    LockTimeout { waited_ms: u64 },

    /// The compiler ran and rejected the input. Not retryable without
    /// changing the sketch; `stdout` carries the full diagnostic transcript.
    #[error("compilation failed with exit code {exit_code}")]
    CompileFailure { exit_code: i32, stdout: String },

    /// The compiler exceeded its wall-clock deadline and was killed.
    #[error("compilation exceeded the {deadline_ms}ms deadline")]
    Timeout { deadline_ms: u64, stdout: String },

    /// The compiler could not be run at all (missing binary, permissions,
    /// missing artifact on a zero exit). Retryable after operator
    /// intervention.
    #[error("compiler infrastructure failure: {reason}")]
    Infrastructure { reason: String },

    /// The upstream library source check failed; requests are refused
    /// rather than served from a possibly-stale cache.
    #[error("library source sync failed: {reason}")]
    UpstreamSync { reason: String },

    /// Refused by service policy before reaching the compiler.
    #[error("request rejected: {reason}")]
    Rejected { reason: String },

    /// The caller abandoned the request.
    #[error("request cancelled")]
    Cancelled,
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::LockTimeout { .. } => ErrorKind::LockTimeout,
            CompileError::CompileFailure { .. } => ErrorKind::CompileFailure,
            CompileError::Timeout { .. } => ErrorKind::Timeout,
            CompileError::Infrastructure { .. } => ErrorKind::Infrastructure,
            CompileError::UpstreamSync { .. } => ErrorKind::UpstreamSync,
            CompileError::Rejected { .. } => ErrorKind::Rejected,
            CompileError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Captured compiler output, when this failure produced any.
    pub fn stdout(&self) -> Option<&str> {
        match self {
            CompileError::CompileFailure { stdout, .. }
            | CompileError::Timeout { stdout, .. } => Some(stdout),
            _ => None,
        }
    }
}

/// Tag-only variant of [`CompileError`] for wire DTOs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LockTimeout,
    CompileFailure,
    Timeout,
    Infrastructure,
    UpstreamSync,
    Rejected,
    Cancelled,
}

crate::simple_display! {
    ErrorKind {
        LockTimeout => "lock_timeout",
        CompileFailure => "compile_failure",
        Timeout => "timeout",
        Infrastructure => "infrastructure",
        UpstreamSync => "upstream_sync",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
