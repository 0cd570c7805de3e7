// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Upstream library source synchronization.
//!
//! Deployments can volume-map a live copy of the shared library sources
//! into the container. Job fingerprints do not cover library state, so the
//! coordinator must know when that tree changes: a sync cycle mirrors the
//! upstream tree into the compiler's working copy and reports whether any
//! source-relevant file moved. A missing upstream volume means "nothing
//! mapped in" and is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::subprocess::run_streaming;

/// Suffixes that count as library source changes.
const SOURCE_SUFFIXES: &[&str] = &["cpp", "h", "hpp", "ino", "py", "js", "html", "css"];

const SYNC_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Unchanged,
    Changed { files: usize },
}

/// The sync cycle itself failed, as opposed to "files changed".
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct SyncError {
    pub reason: String,
}

/// Checks the upstream library tree and mirrors it into the compiler's
/// working copy.
#[async_trait]
pub trait SourceSync: Send + Sync {
    async fn check(&self) -> Result<SyncOutcome, SyncError>;
}

/// rsync-backed syncer mirroring `upstream/` into `dest/`.
pub struct RsyncSourceSync {
    upstream: PathBuf,
    dest: PathBuf,
}

impl RsyncSourceSync {
    pub fn new(upstream: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            upstream: upstream.into(),
            dest: dest.into(),
        }
    }
}

#[async_trait]
impl SourceSync for RsyncSourceSync {
    async fn check(&self) -> Result<SyncOutcome, SyncError> {
        if !self.upstream.exists() {
            tracing::debug!(
                upstream = %self.upstream.display(),
                "upstream volume not mapped, skipping sync"
            );
            return Ok(SyncOutcome::Unchanged);
        }

        let mut cmd = Command::new("rsync");
        cmd.arg("-a")
            .arg("--delete")
            .arg("--out-format=%n")
            .arg("--exclude=.*/")
            .arg(format!("{}/", self.upstream.display()))
            .arg(format!("{}/", self.dest.display()));

        let out = run_streaming(cmd, "rsync", SYNC_TIMEOUT, &CancellationToken::new(), None)
            .await
            .map_err(|e| SyncError {
                reason: e.to_string(),
            })?;

        if !out.exit.success() {
            return Err(SyncError {
                reason: format!(
                    "rsync exited with {}: {}",
                    out.exit.code().unwrap_or(-1),
                    out.transcript.trim()
                ),
            });
        }

        let files = count_source_changes(&out.transcript);
        if files > 0 {
            tracing::info!(files, "upstream library sources changed");
            Ok(SyncOutcome::Changed { files })
        } else {
            Ok(SyncOutcome::Unchanged)
        }
    }
}

/// Count transferred paths with a source-relevant suffix.
pub fn count_source_changes(transcript: &str) -> usize {
    transcript
        .lines()
        .filter(|line| {
            let name = line.trim();
            !name.is_empty()
                && Path::new(name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|ext| SOURCE_SUFFIXES.contains(&ext))
                    .unwrap_or(false)
        })
        .count()
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
