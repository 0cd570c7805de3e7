// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

use super::*;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use sw_core::{BuildMode, SessionId};

/// A stand-in toolchain that honors the real invocation contract.
const GOOD_COMPILER: &str = r#"#!/bin/sh
sketch=""; mode=""; out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --sketch) sketch="$2"; shift 2 ;;
    --mode) mode="$2"; shift 2 ;;
    --out) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo "building $sketch ($mode)"
mkdir -p "$out"
printf 'fake-wasm' > "$out/sketch.wasm"
"#;

fn write_script(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("fake-compiler");
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn job(mode: BuildMode) -> JobDescriptor {
    JobDescriptor::new(mode, b"void loop() {}".to_vec(), "blink.ino", SessionId::new())
}

const DEADLINE: Duration = Duration::from_secs(10);

#[tokio::test]
async fn success_returns_artifact_and_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let compiler = write_script(dir.path(), GOOD_COMPILER);
    let invoker = SubprocessInvoker::new(compiler, dir.path().join("scratch"));

    let out = invoker
        .run(&job(BuildMode::Quick), DEADLINE, &CancellationToken::new(), None)
        .await
        .unwrap();
    assert_eq!(out.artifact, b"fake-wasm");
    assert_eq!(out.exit_code, 0);
    assert!(out.stdout.contains("building"));
    assert!(out.stdout.contains("(quick)"));
}

#[tokio::test]
async fn nonzero_exit_is_compile_failed_with_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let compiler = write_script(dir.path(), "#!/bin/sh\necho \"error: bad sketch\"\nexit 2\n");
    let invoker = SubprocessInvoker::new(compiler, dir.path().join("scratch"));

    let err = invoker
        .run(&job(BuildMode::Quick), DEADLINE, &CancellationToken::new(), None)
        .await
        .unwrap_err();
    match err {
        InvokeError::CompileFailed { exit_code, stdout } => {
            assert_eq!(exit_code, 2);
            assert!(stdout.contains("error: bad sketch"));
        }
        other => panic!("expected CompileFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_exit_without_artifact_is_infrastructure() {
    let dir = tempfile::tempdir().unwrap();
    let compiler = write_script(dir.path(), "#!/bin/sh\necho \"pretending to build\"\n");
    let invoker = SubprocessInvoker::new(compiler, dir.path().join("scratch"));

    let err = invoker
        .run(&job(BuildMode::Quick), DEADLINE, &CancellationToken::new(), None)
        .await
        .unwrap_err();
    match err {
        InvokeError::Infrastructure { reason } => assert!(reason.contains("artifact missing")),
        other => panic!("expected Infrastructure, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_binary_is_infrastructure() {
    let dir = tempfile::tempdir().unwrap();
    let invoker =
        SubprocessInvoker::new("/nonexistent/fastled-wasm-compiler", dir.path().join("scratch"));

    let err = invoker
        .run(&job(BuildMode::Quick), DEADLINE, &CancellationToken::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::Infrastructure { .. }));
}

#[tokio::test]
async fn deadline_yields_timeout_with_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let compiler = write_script(dir.path(), "#!/bin/sh\necho \"phase one\"\nsleep 30\n");
    let invoker = SubprocessInvoker::new(compiler, dir.path().join("scratch"));

    let err = invoker
        .run(
            &job(BuildMode::Release),
            Duration::from_millis(300),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();
    match err {
        InvokeError::Timeout { deadline_ms, stdout } => {
            assert_eq!(deadline_ms, 300);
            assert!(stdout.contains("phase one"));
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn progress_sink_sees_lines() {
    let dir = tempfile::tempdir().unwrap();
    let compiler = write_script(dir.path(), GOOD_COMPILER);
    let invoker = SubprocessInvoker::new(compiler, dir.path().join("scratch"));

    let (tx, mut rx) = mpsc::channel(16);
    invoker
        .run(&job(BuildMode::Quick), DEADLINE, &CancellationToken::new(), Some(tx))
        .await
        .unwrap();
    let line = rx.recv().await.unwrap();
    assert!(line.contains("building"));
}

#[tokio::test]
async fn scratch_dirs_are_removed_on_every_path() {
    let dir = tempfile::tempdir().unwrap();
    let scratch_root = dir.path().join("scratch");

    let good = write_script(dir.path(), GOOD_COMPILER);
    let invoker = SubprocessInvoker::new(good, &scratch_root);
    let _ = invoker
        .run(&job(BuildMode::Quick), DEADLINE, &CancellationToken::new(), None)
        .await;

    let bad = write_script(dir.path(), "#!/bin/sh\nexit 1\n");
    let invoker = SubprocessInvoker::new(bad, &scratch_root);
    let _ = invoker
        .run(&job(BuildMode::Quick), DEADLINE, &CancellationToken::new(), None)
        .await;

    let leftovers: Vec<_> = std::fs::read_dir(&scratch_root).unwrap().collect();
    assert!(leftovers.is_empty(), "scratch dirs leaked: {leftovers:?}");
}
