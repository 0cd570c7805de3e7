// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Session record for tracking one compile request's lifecycle.
//!
//! A session is created when a job is submitted and moves through a small
//! monotonic state machine: once a terminal state is reached there is no
//! transition out of it. Sessions are independent of the result cache: a
//! cached reply still gets a session.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a compile session.
    pub struct SessionId("ses-");
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Submitted, not yet holding the compiler.
    Queued,
    /// Holding the compiler lock, subprocess running.
    Compiling,
    /// Artifact produced (compiled or served from cache).
    Succeeded,
    /// Compile, lock wait, or policy check failed.
    Failed,
    /// Caller abandoned the request before completion.
    Cancelled,
}

crate::simple_display! {
    SessionState {
        Queued => "queued",
        Compiling => "compiling",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl SessionState {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Succeeded | SessionState::Failed | SessionState::Cancelled
        )
    }
}

/// One tracked compile session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub state: SessionState,
    pub created_at_ms: u64,
    /// Refreshed on every touch; drives reuse-lease and sweep decisions.
    pub last_used_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    /// Human-readable reason for a `Failed` or `Cancelled` session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Session {
    /// A fresh queued session created at `now_ms`.
    pub fn queued(id: SessionId, now_ms: u64) -> Self {
        Self {
            id,
            state: SessionState::Queued,
            created_at_ms: now_ms,
            last_used_ms: now_ms,
            finished_at_ms: None,
            error: None,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
