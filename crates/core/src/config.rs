// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Coordinator configuration.
//!
//! Every operationally tunable knob lives here as an explicit field with a
//! default, loadable from TOML. Components take the relevant sub-struct at
//! construction; nothing reads configuration ambiently.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result cache bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached artifacts. Zero disables caching entirely.
    pub max_entries: usize,
    /// Total artifact byte budget. Zero means no byte budget.
    pub max_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            max_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Session registry retention and reuse windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Terminal sessions older than this are swept (GC grace period).
    pub retention_ms: u64,
    /// Hard cap on registry size; oldest terminal sessions evicted first.
    pub max_sessions: usize,
    /// A caller-supplied session id older than this is not reused.
    /// Must not exceed `retention_ms` so reuse and sweeping cannot collide.
    pub reuse_lease_ms: u64,
    /// Interval for the background sweeper task.
    pub sweep_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retention_ms: 40 * 60 * 1000,
            max_sessions: 4096,
            reuse_lease_ms: 20 * 60 * 1000,
            sweep_interval_ms: 60 * 1000,
        }
    }
}

impl SessionConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    pub fn reuse_lease(&self) -> Duration {
        Duration::from_millis(self.reuse_lease_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Top-level coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub cache: CacheConfig,
    pub sessions: SessionConfig,
    /// Bound on waiting for the compile lock before reporting busy.
    pub lock_wait_ms: u64,
    /// Wall-clock deadline for one compiler invocation.
    pub compile_deadline_ms: u64,
    /// Refuse debug/release builds (quick-only deployments).
    pub only_quick_builds: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            sessions: SessionConfig::default(),
            lock_wait_ms: 30_000,
            compile_deadline_ms: 5 * 60 * 1000,
            only_quick_builds: false,
        }
    }
}

impl CoordinatorConfig {
    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    pub fn compile_deadline(&self) -> Duration {
        Duration::from_millis(self.compile_deadline_ms)
    }

    /// Parse from a TOML document and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_wait_ms == 0 {
            return Err(ConfigError::Invalid("lock_wait_ms must be nonzero".into()));
        }
        if self.compile_deadline_ms == 0 {
            return Err(ConfigError::Invalid(
                "compile_deadline_ms must be nonzero".into(),
            ));
        }
        if self.sessions.reuse_lease_ms > self.sessions.retention_ms {
            return Err(ConfigError::Invalid(format!(
                "reuse_lease_ms ({}) must not exceed retention_ms ({})",
                self.sessions.reuse_lease_ms, self.sessions.retention_ms
            )));
        }
        if self.sessions.max_sessions == 0 {
            return Err(ConfigError::Invalid("max_sessions must be nonzero".into()));
        }
        Ok(())
    }
}

/// Configuration parse or validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
