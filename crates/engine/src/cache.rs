// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Bounded, content-addressed result cache.
//!
//! Maps a job fingerprint to the artifact a previous successful compile
//! produced. Strict least-recently-used eviction over two budgets: entry
//! count and total artifact bytes. A `max_entries` of zero disables caching
//! entirely: lookups miss, inserts are dropped, nothing errors.
//!
//! Lookups and inserts take one short mutex section; eviction happens on
//! the inserting caller and never under the compile lock, so it cannot
//! delay another job's compile.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use sw_core::{epoch_ms_now, CacheConfig, Fingerprint};

/// One cached artifact. Content is never mutated after insertion; the
/// fingerprint binds it.
struct CacheEntry {
    artifact: Arc<Vec<u8>>,
    size: u64,
    /// Wall-clock access time, for inspection only.
    last_access_ms: u64,
    /// Logical access counter; the LRU victim is the minimum tick.
    tick: u64,
}

struct CacheInner {
    entries: HashMap<Fingerprint, CacheEntry>,
    total_bytes: u64,
    tick: u64,
}

/// Concurrency-safe LRU artifact cache.
pub struct ResultCache {
    inner: Mutex<CacheInner>,
    max_entries: usize,
    max_bytes: u64,
}

impl ResultCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                total_bytes: 0,
                tick: 0,
            }),
            max_entries: config.max_entries,
            max_bytes: config.max_bytes,
        }
    }

    /// Look up an artifact, refreshing its recency on a hit.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<Vec<u8>>> {
        let mut inner = self.inner.lock();
        inner.tick += 1;
        let tick = inner.tick;
        let entry = inner.entries.get_mut(fingerprint)?;
        entry.tick = tick;
        entry.last_access_ms = epoch_ms_now();
        Some(Arc::clone(&entry.artifact))
    }

    /// Insert an artifact, evicting least-recently-used entries until it
    /// fits. Re-inserting an existing fingerprint only refreshes recency
    /// (equal fingerprints mean equal content).
    ///
    /// Returns a shared handle to the stored bytes (or a fresh handle when
    /// caching is disabled or the artifact exceeds the byte budget).
    pub fn put(&self, fingerprint: Fingerprint, artifact: Vec<u8>) -> Arc<Vec<u8>> {
        let size = artifact.len() as u64;
        let artifact = Arc::new(artifact);
        if self.max_entries == 0 {
            return artifact;
        }
        if self.max_bytes > 0 && size > self.max_bytes {
            tracing::warn!(
                fingerprint = ?fingerprint,
                size,
                max_bytes = self.max_bytes,
                "artifact exceeds cache byte budget, not caching"
            );
            return artifact;
        }

        let mut inner = self.inner.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if let Some(existing) = inner.entries.get_mut(&fingerprint) {
            existing.tick = tick;
            existing.last_access_ms = epoch_ms_now();
            return Arc::clone(&existing.artifact);
        }

        inner.entries.insert(
            fingerprint,
            CacheEntry {
                artifact: Arc::clone(&artifact),
                size,
                last_access_ms: epoch_ms_now(),
                tick,
            },
        );
        inner.total_bytes += size;

        while inner.entries.len() > self.max_entries
            || (self.max_bytes > 0 && inner.total_bytes > self.max_bytes)
        {
            let victim = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.tick)
                .map(|(key, _)| *key);
            let Some(key) = victim else { break };
            if let Some(evicted) = inner.entries.remove(&key) {
                inner.total_bytes -= evicted.size;
                tracing::debug!(fingerprint = ?key, size = evicted.size, "evicted cache entry");
            }
        }

        artifact
    }

    /// Drop every entry. Used when upstream library sources change and all
    /// cached artifacts may be stale.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.total_bytes = 0;
        if dropped > 0 {
            tracing::info!(dropped, "cleared result cache");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> u64 {
        self.inner.lock().total_bytes
    }

    /// Entries in least-recently-used-first order, for persistence.
    pub(crate) fn entries_lru_first(&self) -> Vec<(Fingerprint, Arc<Vec<u8>>)> {
        let inner = self.inner.lock();
        let mut entries: Vec<_> = inner
            .entries
            .iter()
            .map(|(key, entry)| (entry.tick, *key, Arc::clone(&entry.artifact)))
            .collect();
        entries.sort_by_key(|(tick, _, _)| *tick);
        entries
            .into_iter()
            .map(|(_, key, artifact)| (key, artifact))
            .collect()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
