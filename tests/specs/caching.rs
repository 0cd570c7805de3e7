// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Result cache specs
//!
//! Equal fingerprints compile once; eviction is strict LRU; a disabled
//! cache degrades to compiling every time; persisted caches survive a
//! restart.

use crate::prelude::*;
use std::sync::Arc;
use sw_adapters::{FakeCompiler, FakeOutcome};
use sw_core::{CacheConfig, CoordinatorConfig};
use sw_engine::persist;

#[tokio::test]
async fn equal_fingerprints_share_one_compile() {
    let compiler = Arc::new(FakeCompiler::new());
    let coord = coordinator(&compiler, spec_config());

    let first = coord.submit(quick_request("void loop() {}")).await;
    let second = coord.submit(quick_request("void loop() {}")).await;

    let first = first.result.unwrap();
    let second = second.result.unwrap();
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(
        first.artifact.as_slice(),
        second.artifact.as_slice(),
        "cache must return byte-identical artifact content"
    );
    assert_eq!(compiler.calls(), 1);
}

#[tokio::test]
async fn eviction_is_strict_lru() {
    let compiler = Arc::new(FakeCompiler::new());
    let config = CoordinatorConfig {
        cache: CacheConfig {
            max_entries: 2,
            max_bytes: 0,
        },
        ..spec_config()
    };
    let coord = coordinator(&compiler, config);

    coord.submit(quick_request("sketch A")).await; // compile 1
    coord.submit(quick_request("sketch B")).await; // compile 2
    coord.submit(quick_request("sketch A")).await; // hit, A is now fresher
    coord.submit(quick_request("sketch C")).await; // compile 3, evicts B

    // A survived, B did not.
    coord.submit(quick_request("sketch A")).await; // hit
    assert_eq!(compiler.calls(), 3);
    coord.submit(quick_request("sketch B")).await; // compile 4
    assert_eq!(compiler.calls(), 4);
}

#[tokio::test]
async fn failed_compiles_are_never_served_from_cache() {
    let compiler = Arc::new(FakeCompiler::new());
    compiler.queue(FakeOutcome::Failure {
        exit_code: 1,
        stdout: "undefined reference".to_string(),
    });
    let coord = coordinator(&compiler, spec_config());

    let failed = coord.submit(quick_request("flaky sketch")).await;
    assert!(!failed.success());

    let retried = coord.submit(quick_request("flaky sketch")).await;
    assert!(retried.success());
    assert!(!retried.result.unwrap().cached);
    assert_eq!(compiler.calls(), 2, "failure must re-invoke the compiler");
}

#[tokio::test]
async fn zero_capacity_compiles_every_time_without_error() {
    let compiler = Arc::new(FakeCompiler::new());
    let config = CoordinatorConfig {
        cache: CacheConfig {
            max_entries: 0,
            max_bytes: 0,
        },
        ..spec_config()
    };
    let coord = coordinator(&compiler, config);

    for _ in 0..3 {
        assert!(coord.submit(quick_request("void loop() {}")).await.success());
    }
    assert_eq!(compiler.calls(), 3);
}

#[tokio::test]
async fn persisted_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let compiler = Arc::new(FakeCompiler::new());
    let coord = coordinator(&compiler, spec_config());
    coord.submit(quick_request("void loop() {}")).await;
    persist::persist_dir(coord.cache(), dir.path()).await.unwrap();

    // "Restart": new coordinator, new compiler, reloaded cache.
    let compiler2 = Arc::new(FakeCompiler::new());
    let coord2 = coordinator(&compiler2, spec_config());
    assert_eq!(persist::load_dir(coord2.cache(), dir.path()).await, 1);

    let reply = coord2.submit(quick_request("void loop() {}")).await;
    assert!(reply.result.unwrap().cached);
    assert_eq!(compiler2.calls(), 0);
}
