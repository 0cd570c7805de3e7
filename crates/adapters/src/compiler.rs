// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! External compiler invocation.
//!
//! The toolchain contract: the compiler binary is invoked as
//! `<compiler> --sketch <dir> --mode <quick|debug|release> --out <dir>`,
//! exits 0 on success, and leaves the artifact at `<out>/sketch.wasm`.
//! All diagnostics arrive on the merged output stream.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sw_core::JobDescriptor;

use crate::scratch::{sanitize_filename, ScratchDir};
use crate::subprocess::{run_streaming, SubprocessError};

/// File the toolchain must produce in its output directory.
pub const ARTIFACT_FILE: &str = "sketch.wasm";

/// Successful compiler run.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub artifact: Vec<u8>,
    pub stdout: String,
    pub exit_code: i32,
}

/// Failed compiler run.
///
/// `CompileFailed` means the compiler ran and rejected the input;
/// `Infrastructure` means it could not run (or violated the artifact
/// contract). Callers use the distinction to decide whether retrying can
/// help.
#[derive(Debug, Clone, Error)]
pub enum InvokeError {
    #[error("compiler exited with code {exit_code}")]
    CompileFailed { exit_code: i32, stdout: String },

    #[error("compiler exceeded its {deadline_ms}ms deadline")]
    Timeout { deadline_ms: u64, stdout: String },

    #[error("compiler invocation cancelled")]
    Cancelled,

    #[error("{reason}")]
    Infrastructure { reason: String },
}

/// Runs the external compiler for one job.
#[async_trait]
pub trait CompilerInvoker: Send + Sync {
    /// Compile `job` under a wall-clock `deadline`.
    ///
    /// Each produced output line is forwarded to `progress` while the
    /// compiler runs; the full transcript is still returned at the end.
    /// Cancellation terminates the subprocess promptly.
    async fn run(
        &self,
        job: &JobDescriptor,
        deadline: Duration,
        cancel: &CancellationToken,
        progress: Option<mpsc::Sender<String>>,
    ) -> Result<CompileOutput, InvokeError>;
}

/// Production invoker: spawns the toolchain binary in a scratch directory.
pub struct SubprocessInvoker {
    command: PathBuf,
    scratch_root: PathBuf,
}

impl SubprocessInvoker {
    pub fn new(command: impl Into<PathBuf>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            scratch_root: scratch_root.into(),
        }
    }
}

#[async_trait]
impl CompilerInvoker for SubprocessInvoker {
    async fn run(
        &self,
        job: &JobDescriptor,
        deadline: Duration,
        cancel: &CancellationToken,
        progress: Option<mpsc::Sender<String>>,
    ) -> Result<CompileOutput, InvokeError> {
        let scratch = ScratchDir::create(&self.scratch_root, "build")
            .await
            .map_err(|e| InvokeError::Infrastructure {
                reason: format!("failed to create scratch dir: {e}"),
            })?;

        let sketch_dir = scratch
            .subdir("sketch")
            .await
            .map_err(|e| InvokeError::Infrastructure {
                reason: format!("failed to create sketch dir: {e}"),
            })?;
        let filename = sanitize_filename(&job.filename);
        tokio::fs::write(sketch_dir.join(&filename), &job.source)
            .await
            .map_err(|e| InvokeError::Infrastructure {
                reason: format!("failed to materialize sketch source: {e}"),
            })?;
        let out_dir = scratch
            .subdir("out")
            .await
            .map_err(|e| InvokeError::Infrastructure {
                reason: format!("failed to create output dir: {e}"),
            })?;

        let mut cmd = Command::new(&self.command);
        cmd.arg("--sketch")
            .arg(&sketch_dir)
            .arg("--mode")
            .arg(job.build_mode.as_str())
            .arg("--out")
            .arg(&out_dir)
            .current_dir(scratch.path());

        tracing::info!(
            session = %job.session_id,
            mode = %job.build_mode,
            fingerprint = ?job.fingerprint,
            "invoking compiler"
        );

        let run = run_streaming(cmd, "compiler", deadline, cancel, progress).await;
        // scratch drops (and is removed) on every path below
        match run {
            Ok(out) => {
                let exit_code = out.exit.code().unwrap_or(-1);
                if !out.exit.success() {
                    return Err(InvokeError::CompileFailed {
                        exit_code,
                        stdout: out.transcript,
                    });
                }
                let artifact_path = out_dir.join(ARTIFACT_FILE);
                let artifact = tokio::fs::read(&artifact_path).await.map_err(|e| {
                    InvokeError::Infrastructure {
                        reason: format!(
                            "compiler exited 0 but artifact missing at {}: {e}",
                            artifact_path.display()
                        ),
                    }
                })?;
                Ok(CompileOutput {
                    artifact,
                    stdout: out.transcript,
                    exit_code,
                })
            }
            Err(SubprocessError::Spawn { source, .. }) => Err(InvokeError::Infrastructure {
                reason: format!(
                    "failed to launch compiler {}: {source}",
                    self.command.display()
                ),
            }),
            Err(SubprocessError::DeadlineExceeded { transcript, .. }) => Err(InvokeError::Timeout {
                deadline_ms: deadline.as_millis() as u64,
                stdout: transcript,
            }),
            Err(SubprocessError::Cancelled { .. }) => Err(InvokeError::Cancelled),
            Err(SubprocessError::Io { source, .. }) => Err(InvokeError::Infrastructure {
                reason: format!("i/o error reading compiler output: {source}"),
            }),
        }
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
