// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Per-invocation scratch directories.
//!
//! Each compile gets a uniquely named directory under a configured root,
//! removed when the guard drops (including on timeout, cancellation, and
//! panic unwind) so concurrent and sequential invocations never share or
//! leak working state.

use std::path::{Path, PathBuf};

/// A uniquely named scratch directory, removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `root/{prefix}-{random}` (and any missing parents).
    pub async fn create(root: &Path, prefix: &str) -> std::io::Result<Self> {
        let path = root.join(format!("{prefix}-{}", nanoid::nanoid!(10)));
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a named subdirectory and return its path.
    pub async fn subdir(&self, name: &str) -> std::io::Result<PathBuf> {
        let path = self.path.join(name);
        tokio::fs::create_dir_all(&path).await?;
        Ok(path)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to remove scratch dir"
                );
            }
        }
    }
}

/// Reduce an untrusted upload filename to a bare file name.
pub(crate) fn sanitize_filename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or("sketch.ino")
        .to_string()
}

#[cfg(test)]
#[path = "scratch_tests.rs"]
mod tests;
