// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Top-level compile coordination.
//!
//! One [`Coordinator`] serves every concurrent caller. Per job:
//!
//! ```text
//! submit → sync gate → policy → cache check ──hit──→ done
//!                                   │miss
//!                                   ▼
//!                         lock wait (bounded, FIFO)
//!                                   ▼
//!                         compile under deadline
//!                                   ▼
//!                  cache put (success only) → done
//! ```
//!
//! Cache hits never touch the compile lock or the attempt counters. Every
//! failure is a typed [`CompileError`] the caller must branch on; nothing
//! is downgraded to a log line. The compile token and the in-use flag are
//! guards, so both release on every exit path including cancellation.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sw_adapters::{CompilerInvoker, InvokeError, SourceSync, SyncError, SyncOutcome};
use sw_core::{
    BuildMode, Clock, CompileError, CoordinatorConfig, ErrorKind, JobDescriptor, Session,
    SessionId, SessionState, StatsSnapshot, SystemClock,
};

use crate::cache::ResultCache;
use crate::lock::{CompileLock, LockError};
use crate::sessions::SessionRegistry;
use crate::stats::StatsAggregator;

/// One compile request as the transport hands it over.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub source: Vec<u8>,
    pub filename: String,
    pub build_mode: BuildMode,
    /// Optional session id from a previous reply, for correlation.
    pub session_id: Option<SessionId>,
}

/// Per-submit knobs.
pub struct SubmitOptions {
    /// Fires when the caller abandons the request (e.g. client disconnect).
    pub cancel: CancellationToken,
    /// Receives compiler output lines while the compile runs.
    pub progress: Option<mpsc::Sender<String>>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
            progress: None,
        }
    }
}

/// Successful compile (fresh or cached).
#[derive(Debug, Clone)]
pub struct CompileSuccess {
    pub artifact: Arc<Vec<u8>>,
    pub stdout: String,
    /// Served from the result cache without invoking the compiler.
    pub cached: bool,
}

/// What the caller gets back from one submit.
#[derive(Debug)]
pub struct CompileReply {
    pub session_id: SessionId,
    pub result: Result<CompileSuccess, CompileError>,
    pub stats: StatsSnapshot,
}

impl CompileReply {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.result.as_ref().err().map(CompileError::kind)
    }

    /// Compiler transcript, from either outcome, when one was captured.
    pub fn stdout(&self) -> &str {
        match &self.result {
            Ok(success) => &success.stdout,
            Err(error) => error.stdout().unwrap_or(""),
        }
    }
}

/// Composes the cache, lock, sessions, stats, and invoker into the submit
/// state machine. Cheap to share: every component is behind an `Arc`.
pub struct Coordinator<C: Clock = SystemClock> {
    cache: Arc<ResultCache>,
    lock: Arc<CompileLock>,
    sessions: Arc<SessionRegistry<C>>,
    stats: Arc<StatsAggregator>,
    invoker: Arc<dyn CompilerInvoker>,
    config: CoordinatorConfig,
    /// Reason the last sync cycle failed; while set, submissions are refused.
    sync_fault: Mutex<Option<String>>,
}

impl Coordinator<SystemClock> {
    pub fn new(config: CoordinatorConfig, invoker: Arc<dyn CompilerInvoker>) -> Self {
        Self::with_clock(config, invoker, SystemClock)
    }
}

impl<C: Clock> Coordinator<C> {
    pub fn with_clock(
        config: CoordinatorConfig,
        invoker: Arc<dyn CompilerInvoker>,
        clock: C,
    ) -> Self {
        Self {
            cache: Arc::new(ResultCache::new(&config.cache)),
            lock: Arc::new(CompileLock::new()),
            sessions: Arc::new(SessionRegistry::with_clock(&config.sessions, clock)),
            stats: Arc::new(StatsAggregator::new()),
            invoker,
            config,
            sync_fault: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry<C>> {
        &self.sessions
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Status view of one session.
    pub fn session(&self, id: &SessionId) -> Option<Session> {
        self.sessions.get(id)
    }

    /// Whether a compile is holding the toolchain right now.
    pub fn compiler_in_use(&self) -> bool {
        self.lock.is_locked()
    }

    pub async fn submit(&self, request: CompileRequest) -> CompileReply {
        self.submit_with(request, SubmitOptions::default()).await
    }

    pub async fn submit_with(
        &self,
        request: CompileRequest,
        opts: SubmitOptions,
    ) -> CompileReply {
        let (session_id, reused) = self.sessions.get_or_create(request.session_id.as_ref());
        tracing::info!(
            session = %session_id,
            reused,
            mode = %request.build_mode,
            filename = %request.filename,
            size = request.source.len(),
            "compile submitted"
        );

        let result = self.process(&session_id, request, opts).await;

        let (state, error) = match &result {
            Ok(_) => (SessionState::Succeeded, None),
            Err(CompileError::Cancelled) => {
                (SessionState::Cancelled, Some(CompileError::Cancelled.to_string()))
            }
            Err(e) => (SessionState::Failed, Some(e.to_string())),
        };
        if let Err(e) = self.sessions.transition(&session_id, state, error) {
            tracing::warn!(session = %session_id, error = %e, "failed to finalize session");
        }

        match &result {
            Ok(success) => {
                tracing::info!(session = %session_id, cached = success.cached, "compile succeeded")
            }
            Err(e) => {
                tracing::warn!(session = %session_id, kind = %e.kind(), error = %e, "compile failed")
            }
        }

        CompileReply {
            session_id,
            result,
            stats: self.stats.snapshot(),
        }
    }

    async fn process(
        &self,
        session_id: &SessionId,
        request: CompileRequest,
        opts: SubmitOptions,
    ) -> Result<CompileSuccess, CompileError> {
        // A failed sync cycle means the cache (and the library tree itself)
        // is in an unknown state; refuse rather than risk a stale artifact.
        if let Some(reason) = self.sync_fault.lock().clone() {
            return Err(CompileError::UpstreamSync { reason });
        }

        if self.config.only_quick_builds && request.build_mode != BuildMode::Quick {
            return Err(CompileError::Rejected {
                reason: format!(
                    "only quick builds are allowed, got {}",
                    request.build_mode
                ),
            });
        }

        let job = JobDescriptor::new(
            request.build_mode,
            request.source,
            request.filename,
            session_id.clone(),
        );

        // Fast path: no lock, no counters.
        if let Some(artifact) = self.cache.get(&job.fingerprint) {
            tracing::info!(session = %session_id, fingerprint = ?job.fingerprint, "cache hit");
            return Ok(CompileSuccess {
                artifact,
                stdout: String::new(),
                cached: true,
            });
        }

        self.stats.record_attempt();

        let token = match self.lock.acquire(self.config.lock_wait(), &opts.cancel).await {
            Ok(token) => token,
            Err(LockError::Timeout { waited_ms }) => {
                self.stats.record_result(false);
                return Err(CompileError::LockTimeout { waited_ms });
            }
            Err(LockError::Cancelled) => {
                self.stats.record_result(false);
                return Err(CompileError::Cancelled);
            }
        };

        if let Err(e) = self
            .sessions
            .transition(session_id, SessionState::Compiling, None)
        {
            tracing::warn!(session = %session_id, error = %e, "failed to mark session compiling");
        }

        let outcome = {
            let _in_use = self.stats.in_use_guard();
            self.invoker
                .run(&job, self.config.compile_deadline(), &opts.cancel, opts.progress)
                .await
        };
        // Release the lock before touching the cache: eviction must never
        // delay the next job's acquisition.
        drop(token);

        match outcome {
            Ok(output) => {
                let artifact = self.cache.put(job.fingerprint, output.artifact);
                self.stats.record_result(true);
                Ok(CompileSuccess {
                    artifact,
                    stdout: output.stdout,
                    cached: false,
                })
            }
            Err(e) => {
                // Failed compiles are never cached.
                self.stats.record_result(false);
                Err(match e {
                    InvokeError::CompileFailed { exit_code, stdout } => {
                        CompileError::CompileFailure { exit_code, stdout }
                    }
                    InvokeError::Timeout { deadline_ms, stdout } => {
                        CompileError::Timeout { deadline_ms, stdout }
                    }
                    InvokeError::Cancelled => CompileError::Cancelled,
                    InvokeError::Infrastructure { reason } => {
                        CompileError::Infrastructure { reason }
                    }
                })
            }
        }
    }

    /// Feed the outcome of an upstream source sync cycle.
    ///
    /// A change invalidates every cached artifact before the next cache
    /// check; an error poisons submissions until a later cycle succeeds.
    pub fn apply_sync_report(&self, report: Result<SyncOutcome, SyncError>) {
        match report {
            Ok(SyncOutcome::Unchanged) => {
                *self.sync_fault.lock() = None;
            }
            Ok(SyncOutcome::Changed { files }) => {
                tracing::info!(files, "library sources changed, clearing result cache");
                self.cache.clear();
                *self.sync_fault.lock() = None;
            }
            Err(e) => {
                tracing::error!(error = %e, "library sync failed, refusing submissions until it recovers");
                *self.sync_fault.lock() = Some(e.to_string());
            }
        }
    }

    /// Run one sync cycle under the compile lock.
    ///
    /// The syncer mutates the compiler's library tree, so it must not race
    /// an in-flight compile. A busy compiler skips the cycle (the next one
    /// will catch up) rather than stalling compile traffic.
    pub async fn run_sync_cycle(&self, sync: &dyn SourceSync) {
        let token = match self
            .lock
            .acquire(self.config.lock_wait(), &CancellationToken::new())
            .await
        {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "skipping sync cycle, compiler busy");
                return;
            }
        };
        let report = sync.check().await;
        drop(token);
        self.apply_sync_report(report);
    }

    /// Run sync cycles on a fixed interval in the background.
    pub fn spawn_sync_loop(
        self: &Arc<Self>,
        sync: Arc<dyn SourceSync>,
        interval: std::time::Duration,
    ) -> tokio::task::JoinHandle<()>
    where
        C: 'static,
    {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                coordinator.run_sync_cycle(sync.as_ref()).await;
            }
        })
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
