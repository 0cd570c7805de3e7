// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Session registry.
//!
//! Tracks the lifecycle of every submitted job, in-flight and recently
//! finished, for status polling. Transitions are monotonic: once a session
//! reaches a terminal state, [`SessionRegistry::transition`] refuses to
//! move it again. A background sweeper bounds memory with a retention
//! window and a hard size cap, independent of compile traffic.
//!
//! Session identities may be reused across requests: a caller presenting a
//! recent, finished session id gets a fresh `Queued` lifecycle under the
//! same id (the reuse lease mirrors the original server's worker lease;
//! the sweep retention is the longer GC grace period, so reuse and
//! sweeping cannot collide).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use sw_core::{Clock, Session, SessionConfig, SessionId, SessionState, SystemClock};

/// Rejected registry operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("unknown session {0}")]
    Unknown(SessionId),

    #[error("session {id} already finished as {state}")]
    AlreadyTerminal { id: SessionId, state: SessionState },
}

/// Concurrency-safe table of compile sessions.
pub struct SessionRegistry<C: Clock = SystemClock> {
    inner: Mutex<HashMap<SessionId, Session>>,
    clock: C,
    retention_ms: u64,
    max_sessions: usize,
    reuse_lease_ms: u64,
}

impl SessionRegistry<SystemClock> {
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> SessionRegistry<C> {
    pub fn with_clock(config: &SessionConfig, clock: C) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            clock,
            retention_ms: config.retention_ms,
            max_sessions: config.max_sessions,
            reuse_lease_ms: config.reuse_lease_ms,
        }
    }

    /// Register a fresh queued session.
    pub fn create(&self) -> SessionId {
        let now = self.clock.epoch_ms();
        let id = SessionId::new();
        self.inner
            .lock()
            .insert(id.clone(), Session::queued(id.clone(), now));
        id
    }

    /// Reuse a caller-supplied session id when possible, else create.
    ///
    /// Reuse requires the session to exist, be finished (a live session is
    /// never shared between two jobs), and be within the reuse lease.
    /// Returns the id to use and whether it was reused.
    pub fn get_or_create(&self, requested: Option<&SessionId>) -> (SessionId, bool) {
        let now = self.clock.epoch_ms();
        if let Some(id) = requested {
            let mut inner = self.inner.lock();
            if let Some(session) = inner.get_mut(id) {
                let age = now.saturating_sub(session.last_used_ms);
                if session.state.is_terminal() && age <= self.reuse_lease_ms {
                    let created_at_ms = session.created_at_ms;
                    *session = Session::queued(id.clone(), now);
                    session.created_at_ms = created_at_ms;
                    return (id.clone(), true);
                }
                tracing::debug!(
                    session = %id,
                    state = %session.state,
                    age_ms = age,
                    "requested session not reusable, creating a new one"
                );
            }
        }
        (self.create(), false)
    }

    /// Move a session to `state`, recording `error` for failed outcomes.
    ///
    /// Terminal states are final: a second transition is rejected and the
    /// stored record is left untouched.
    pub fn transition(
        &self,
        id: &SessionId,
        state: SessionState,
        error: Option<String>,
    ) -> Result<(), SessionError> {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        let session = inner
            .get_mut(id)
            .ok_or_else(|| SessionError::Unknown(id.clone()))?;
        if session.state.is_terminal() {
            return Err(SessionError::AlreadyTerminal {
                id: id.clone(),
                state: session.state,
            });
        }
        session.state = state;
        session.last_used_ms = now;
        if state.is_terminal() {
            session.finished_at_ms = Some(now);
            session.error = error;
        }
        Ok(())
    }

    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.inner.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove finished sessions past the retention window, then enforce the
    /// size cap by evicting the oldest finished sessions. In-flight
    /// sessions are never swept. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        let before = inner.len();

        inner.retain(|_, session| {
            !session.state.is_terminal()
                || now.saturating_sub(session.last_used_ms) <= self.retention_ms
        });

        if inner.len() > self.max_sessions {
            let mut finished: Vec<(SessionId, u64)> = inner
                .values()
                .filter(|s| s.state.is_terminal())
                .map(|s| (s.id.clone(), s.last_used_ms))
                .collect();
            finished.sort_by_key(|(_, last_used)| *last_used);
            let excess = inner.len() - self.max_sessions;
            for (id, _) in finished.into_iter().take(excess) {
                inner.remove(&id);
            }
        }

        before - inner.len()
    }

    /// Run [`SessionRegistry::sweep`] on a fixed interval in the
    /// background.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()>
    where
        C: 'static,
    {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let swept = registry.sweep();
                if swept > 0 {
                    tracing::debug!(swept, "swept expired sessions");
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
