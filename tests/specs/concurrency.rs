// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Concurrency specs
//!
//! The compiler is an exclusive resource: at most one invocation in flight,
//! FIFO fairness for waiters, bounded waits, and cancellation that leaves
//! the queue clean.

use crate::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use sw_adapters::FakeCompiler;
use sw_core::{CoordinatorConfig, ErrorKind, Fingerprint};
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn at_most_one_invocation_in_flight() {
    let compiler = Arc::new(FakeCompiler::with_delay(Duration::from_millis(50)));
    let coord = Arc::new(coordinator(&compiler, spec_config()));

    let mut handles = Vec::new();
    for i in 0..10 {
        let coord = Arc::clone(&coord);
        handles.push(tokio::spawn(async move {
            coord.submit(quick_request(&format!("sketch {i}"))).await
        }));
        tokio::task::yield_now().await;
    }
    for handle in handles {
        assert!(handle.await.unwrap().success());
    }
    assert_eq!(
        compiler.max_active(),
        1,
        "two compiler invocations overlapped"
    );
}

#[tokio::test(start_paused = true)]
async fn compile_order_matches_submission_order() {
    let compiler = Arc::new(FakeCompiler::with_delay(Duration::from_millis(50)));
    let coord = Arc::new(coordinator(&compiler, spec_config()));

    let sources: Vec<String> = (0..6).map(|i| format!("ordered {i}")).collect();
    let mut handles = Vec::new();
    for source in &sources {
        let coord = Arc::clone(&coord);
        let source = source.clone();
        handles.push(tokio::spawn(async move {
            coord.submit(quick_request(&source)).await
        }));
        tokio::task::yield_now().await;
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let expected: Vec<Fingerprint> = sources
        .iter()
        .map(|s| Fingerprint::compute(sw_core::BuildMode::Quick, s.as_bytes()))
        .collect();
    assert_eq!(compiler.invocation_order(), expected);
}

#[tokio::test(start_paused = true)]
async fn held_lock_times_out_waiters_instead_of_hanging() {
    let compiler = Arc::new(FakeCompiler::with_delay(Duration::from_secs(300)));
    let config = CoordinatorConfig {
        lock_wait_ms: 200,
        compile_deadline_ms: 600_000,
        ..spec_config()
    };
    let coord = Arc::new(coordinator(&compiler, config));

    let holder = {
        let coord = Arc::clone(&coord);
        tokio::spawn(async move { coord.submit(quick_request("long build")).await })
    };
    tokio::task::yield_now().await;

    let reply = coord.submit(quick_request("impatient")).await;
    assert_eq!(reply.error_kind(), Some(ErrorKind::LockTimeout));

    assert!(holder.await.unwrap().success());
}

#[tokio::test(start_paused = true)]
async fn cancelling_a_waiter_does_not_disturb_the_queue() {
    let compiler = Arc::new(FakeCompiler::with_delay(Duration::from_secs(2)));
    let coord = Arc::new(coordinator(&compiler, spec_config()));

    let first = {
        let coord = Arc::clone(&coord);
        tokio::spawn(async move { coord.submit(quick_request("first")).await })
    };
    tokio::task::yield_now().await;

    let cancel = CancellationToken::new();
    let abandoned = {
        let coord = Arc::clone(&coord);
        let opts = sw_engine::SubmitOptions {
            cancel: cancel.clone(),
            progress: None,
        };
        tokio::spawn(async move { coord.submit_with(quick_request("abandoned"), opts).await })
    };
    tokio::task::yield_now().await;

    let last = {
        let coord = Arc::clone(&coord);
        tokio::spawn(async move { coord.submit(quick_request("last")).await })
    };
    tokio::task::yield_now().await;

    cancel.cancel();
    assert_eq!(
        abandoned.await.unwrap().error_kind(),
        Some(ErrorKind::Cancelled)
    );
    assert!(first.await.unwrap().success());
    assert!(last.await.unwrap().success());

    let fp = |s: &str| Fingerprint::compute(sw_core::BuildMode::Quick, s.as_bytes());
    assert_eq!(compiler.invocation_order(), vec![fp("first"), fp("last")]);
}

#[tokio::test(start_paused = true)]
async fn clear_mid_traffic_leaves_in_flight_compiles_alone() {
    let compiler = Arc::new(FakeCompiler::with_delay(Duration::from_secs(1)));
    let coord = Arc::new(coordinator(&compiler, spec_config()));

    // Warm the cache, then start a long compile.
    coord.submit(quick_request("warm")).await;
    let in_flight = {
        let coord = Arc::clone(&coord);
        tokio::spawn(async move { coord.submit(quick_request("in flight")).await })
    };
    tokio::task::yield_now().await;

    coord.apply_sync_report(Ok(sw_adapters::SyncOutcome::Changed { files: 2 }));

    // Previously cached fingerprints now miss...
    let warm_again = coord.submit(quick_request("warm")).await;
    assert!(!warm_again.result.unwrap().cached);

    // ...while the in-flight compile completes normally.
    assert!(in_flight.await.unwrap().success());
}
