// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Optional disk persistence for the result cache.
//!
//! Artifacts are stored one file per entry, named `<fingerprint-hex>.wasm`.
//! Loading is fail-safe: a file whose name does not parse as a fingerprint,
//! or that cannot be read, is skipped with a warning. Corruption degrades
//! to cache misses, never to errors.

use std::path::Path;

use sw_core::Fingerprint;

use crate::cache::ResultCache;

const ARTIFACT_EXT: &str = "wasm";

/// Load persisted artifacts into `cache`. Returns how many were loaded.
///
/// A missing directory loads nothing. Entries beyond the cache's capacity
/// are evicted as usual on insert.
pub async fn load_dir(cache: &ResultCache, dir: &Path) -> usize {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(_) => return 0,
    };

    let mut loaded = 0;
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXT) {
            continue;
        }
        let Some(fingerprint) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(Fingerprint::from_hex)
        else {
            tracing::warn!(path = %path.display(), "skipping cache file with invalid key");
            continue;
        };
        match tokio::fs::read(&path).await {
            Ok(artifact) => {
                cache.put(fingerprint, artifact);
                loaded += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable cache file");
            }
        }
    }

    if loaded > 0 {
        tracing::info!(loaded, dir = %dir.display(), "loaded persisted cache entries");
    }
    loaded
}

/// Write every cached artifact to `dir`, replacing its previous contents.
/// Returns how many entries were written.
pub async fn persist_dir(cache: &ResultCache, dir: &Path) -> std::io::Result<usize> {
    tokio::fs::create_dir_all(dir).await?;

    // Drop files for entries that no longer exist (evicted or cleared).
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(ARTIFACT_EXT) {
            let _ = tokio::fs::remove_file(&path).await;
        }
    }

    let entries = cache.entries_lru_first();
    let written = entries.len();
    for (fingerprint, artifact) in entries {
        let path = dir.join(format!("{}.{ARTIFACT_EXT}", fingerprint.to_hex()));
        tokio::fs::write(&path, artifact.as_slice()).await?;
    }
    Ok(written)
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
