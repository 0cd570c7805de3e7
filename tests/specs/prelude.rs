// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Shared helpers for the spec suite.

use std::sync::Arc;

use sw_adapters::{CompilerInvoker, FakeCompiler};
use sw_core::{BuildMode, CacheConfig, CoordinatorConfig};
use sw_engine::{CompileRequest, Coordinator};

/// Coordinator wired to an instrumented fake compiler.
pub fn coordinator(compiler: &Arc<FakeCompiler>, config: CoordinatorConfig) -> Coordinator {
    Coordinator::new(config, Arc::clone(compiler) as Arc<dyn CompilerInvoker>)
}

/// Defaults sized for tests: generous waits, small cache.
pub fn spec_config() -> CoordinatorConfig {
    CoordinatorConfig {
        cache: CacheConfig {
            max_entries: 16,
            max_bytes: 0,
        },
        lock_wait_ms: 60_000,
        compile_deadline_ms: 60_000,
        ..CoordinatorConfig::default()
    }
}

pub fn quick_request(source: &str) -> CompileRequest {
    CompileRequest {
        source: source.as_bytes().to_vec(),
        filename: "sketch.ino".to_string(),
        build_mode: BuildMode::Quick,
        session_id: None,
    }
}
