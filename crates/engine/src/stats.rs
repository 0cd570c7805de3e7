// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Compile counters.
//!
//! A single short mutex section per update keeps snapshots consistent: a
//! reader never sees an attempt recorded without its eventual outcome being
//! either pending or counted, and never a torn multi-field view.

use parking_lot::Mutex;

use sw_core::StatsSnapshot;

/// Concurrency-safe attempt/success/failure counters plus the
/// "compiler busy right now" flag.
pub struct StatsAggregator {
    inner: Mutex<StatsSnapshot>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatsSnapshot::default()),
        }
    }

    /// A job entered the compile pipeline (cache miss).
    pub fn record_attempt(&self) {
        self.inner.lock().total_attempts += 1;
    }

    /// The attempt finished.
    pub fn record_result(&self, success: bool) {
        let mut inner = self.inner.lock();
        if success {
            inner.successes += 1;
        } else {
            inner.failures += 1;
        }
    }

    pub fn set_in_use(&self, in_use: bool) {
        self.inner.lock().in_use = in_use;
    }

    /// Scoped `in_use = true`; reset on drop, including unwind.
    pub fn in_use_guard(&self) -> InUseGuard<'_> {
        self.set_in_use(true);
        InUseGuard(self)
    }

    /// Consistent point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.lock().clone()
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the in-use flag when dropped.
pub struct InUseGuard<'a>(&'a StatsAggregator);

impl Drop for InUseGuard<'_> {
    fn drop(&mut self) {
        self.0.set_in_use(false);
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
