// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Stats snapshot type shared between the engine and status endpoints.

use serde::{Deserialize, Serialize};

/// Point-in-time view of the compile counters.
///
/// Attempts count compile-pipeline entries (cache hits and policy
/// rejections are not attempts). `in_use` reports whether a compile is
/// running at the instant of the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub in_use: bool,
}
