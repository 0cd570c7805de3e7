// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Fake adapters for engine and integration tests.
//!
//! [`FakeCompiler`] is instrumented: it records call counts, the order of
//! invocations, and the maximum number of concurrently active runs, which
//! is how tests prove the compile lock admits at most one invocation at a
//! time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sw_core::{Fingerprint, JobDescriptor};

use crate::compiler::{CompileOutput, CompilerInvoker, InvokeError};
use crate::sync::{SourceSync, SyncError, SyncOutcome};

/// Scripted behavior for one [`FakeCompiler`] call.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    /// Succeed with an artifact derived from the job fingerprint.
    Success,
    /// Fail like a compiler rejecting the input.
    Failure { exit_code: i32, stdout: String },
    /// Fail like a broken environment.
    Broken { reason: String },
    /// Run until the deadline or cancellation fires.
    Hang,
}

/// Instrumented in-memory stand-in for the external compiler.
///
/// Calls consume scripted outcomes front-to-back; when the script is empty
/// every call succeeds.
pub struct FakeCompiler {
    script: Mutex<VecDeque<FakeOutcome>>,
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    order: Mutex<Vec<Fingerprint>>,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Each successful call takes `delay` of (tokio) time, so tests can
    /// overlap submissions.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            delay,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            order: Mutex::new(Vec::new()),
        }
    }

    /// Queue the outcome for the next unscripted call.
    pub fn queue(&self, outcome: FakeOutcome) {
        self.script.lock().push_back(outcome);
    }

    /// Total number of `run` calls observed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrently active `run` calls observed.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Fingerprints in the order the compiler saw them.
    pub fn invocation_order(&self) -> Vec<Fingerprint> {
        self.order.lock().clone()
    }

    /// The artifact a successful fake compile produces for `fingerprint`.
    pub fn artifact_for(fingerprint: &Fingerprint) -> Vec<u8> {
        format!("wasm:{fingerprint}").into_bytes()
    }
}

impl Default for FakeCompiler {
    fn default() -> Self {
        Self::new()
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompilerInvoker for FakeCompiler {
    async fn run(
        &self,
        job: &JobDescriptor,
        deadline: Duration,
        cancel: &CancellationToken,
        progress: Option<mpsc::Sender<String>>,
    ) -> Result<CompileOutput, InvokeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);
        self.order.lock().push(job.fingerprint);

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(FakeOutcome::Success);
        let busy_for = match &outcome {
            FakeOutcome::Hang => Duration::from_secs(86_400),
            _ => self.delay,
        };

        tokio::select! {
            () = tokio::time::sleep(busy_for) => {}
            () = cancel.cancelled() => return Err(InvokeError::Cancelled),
            () = tokio::time::sleep(deadline) => {
                return Err(InvokeError::Timeout {
                    deadline_ms: deadline.as_millis() as u64,
                    stdout: String::new(),
                })
            }
        }

        match outcome {
            FakeOutcome::Success => {
                if let Some(progress) = &progress {
                    let _ = progress.try_send(format!("compiling {}", job.filename));
                }
                Ok(CompileOutput {
                    artifact: Self::artifact_for(&job.fingerprint),
                    stdout: format!("compiled {}", job.filename),
                    exit_code: 0,
                })
            }
            FakeOutcome::Failure { exit_code, stdout } => {
                Err(InvokeError::CompileFailed { exit_code, stdout })
            }
            FakeOutcome::Broken { reason } => Err(InvokeError::Infrastructure { reason }),
            FakeOutcome::Hang => Err(InvokeError::Timeout {
                deadline_ms: deadline.as_millis() as u64,
                stdout: String::new(),
            }),
        }
    }
}

/// Scripted stand-in for the library source syncer.
pub struct FakeSync {
    script: Mutex<VecDeque<Result<SyncOutcome, SyncError>>>,
}

impl FakeSync {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue the result of the next check; unscripted checks report
    /// `Unchanged`.
    pub fn queue(&self, result: Result<SyncOutcome, SyncError>) {
        self.script.lock().push_back(result);
    }
}

impl Default for FakeSync {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceSync for FakeSync {
    async fn check(&self) -> Result<SyncOutcome, SyncError> {
        self.script
            .lock()
            .pop_front()
            .unwrap_or(Ok(SyncOutcome::Unchanged))
    }
}
