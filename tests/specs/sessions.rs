// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Session and stats specs
//!
//! Every submit gets a pollable session with a terminal state and a
//! human-readable reason; counters add up exactly; diagnostics always
//! reach the caller.

use crate::prelude::*;
use std::sync::Arc;
use sw_adapters::{FakeCompiler, FakeOutcome};
use sw_core::{ErrorKind, SessionState};

#[tokio::test]
async fn every_submit_gets_a_pollable_session() {
    let compiler = Arc::new(FakeCompiler::new());
    let coord = coordinator(&compiler, spec_config());

    let reply = coord.submit(quick_request("void loop() {}")).await;
    let session = coord.session(&reply.session_id).unwrap();
    assert_eq!(session.state, SessionState::Succeeded);
    assert!(session.finished_at_ms.is_some());
    assert!(session.error.is_none());
}

#[tokio::test]
async fn stats_add_up_across_mixed_outcomes() {
    let compiler = Arc::new(FakeCompiler::new());
    compiler.queue(FakeOutcome::Success);
    compiler.queue(FakeOutcome::Failure {
        exit_code: 1,
        stdout: "nope".to_string(),
    });
    compiler.queue(FakeOutcome::Success);
    let coord = coordinator(&compiler, spec_config());

    coord.submit(quick_request("one")).await;
    coord.submit(quick_request("two")).await;
    let last = coord.submit(quick_request("three")).await;

    let stats = last.stats;
    assert_eq!(stats.total_attempts, 3);
    assert_eq!(stats.successes, 2);
    assert_eq!(stats.failures, 1);
    assert!(!stats.in_use, "no compile running after replies returned");
}

#[tokio::test]
async fn failure_reason_and_transcript_reach_the_caller() {
    let compiler = Arc::new(FakeCompiler::new());
    compiler.queue(FakeOutcome::Failure {
        exit_code: 2,
        stdout: "sketch.ino:3: error: 'ledPin' was not declared".to_string(),
    });
    let coord = coordinator(&compiler, spec_config());

    let reply = coord.submit(quick_request("bad sketch")).await;
    assert_eq!(reply.error_kind(), Some(ErrorKind::CompileFailure));
    assert!(reply.stdout().contains("'ledPin' was not declared"));

    let session = coord.session(&reply.session_id).unwrap();
    assert_eq!(session.state, SessionState::Failed);
    assert!(session.error.as_deref().unwrap().contains("exit code 2"));
}

#[tokio::test]
async fn infrastructure_and_input_failures_are_distinguishable() {
    let compiler = Arc::new(FakeCompiler::new());
    compiler.queue(FakeOutcome::Broken {
        reason: "toolchain image missing".to_string(),
    });
    compiler.queue(FakeOutcome::Failure {
        exit_code: 1,
        stdout: "syntax error".to_string(),
    });
    let coord = coordinator(&compiler, spec_config());

    let infra = coord.submit(quick_request("a")).await;
    let input = coord.submit(quick_request("b")).await;
    assert_eq!(infra.error_kind(), Some(ErrorKind::Infrastructure));
    assert_eq!(input.error_kind(), Some(ErrorKind::CompileFailure));
}

#[tokio::test]
async fn correlated_resubmission_keeps_the_session_id() {
    let compiler = Arc::new(FakeCompiler::new());
    let coord = coordinator(&compiler, spec_config());

    let first = coord.submit(quick_request("rev 1")).await;
    let mut next = quick_request("rev 2");
    next.session_id = Some(first.session_id.clone());
    let second = coord.submit(next).await;

    assert_eq!(second.session_id, first.session_id);
    assert_eq!(
        coord.session(&second.session_id).unwrap().state,
        SessionState::Succeeded
    );
}
