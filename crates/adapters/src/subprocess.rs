// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Streaming subprocess execution with deadline and cancellation.
//!
//! Child processes are spawned into their own process group so that a
//! deadline or cancellation kills the whole tree, not just the direct
//! child. Stdout and stderr are merged line-by-line into a single
//! transcript, and each line can be forwarded to an optional sink while the
//! process is still running.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Completed subprocess run: exit status plus the merged output transcript.
#[derive(Debug)]
pub struct StreamedOutput {
    pub exit: std::process::ExitStatus,
    pub transcript: String,
}

/// Errors from running a subprocess to completion.
#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("failed to spawn {what}: {source}")]
    Spawn {
        what: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{what} exceeded its {}ms deadline", deadline.as_millis())]
    DeadlineExceeded {
        what: String,
        deadline: Duration,
        /// Output captured before the process was killed.
        transcript: String,
    },

    #[error("{what} cancelled")]
    Cancelled { what: String, transcript: String },

    #[error("i/o error while running {what}: {source}")]
    Io {
        what: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run a command to completion, streaming its merged output.
///
/// The process and its descendants are killed when `deadline` elapses or
/// `cancel` fires, whichever comes first. Each output line is appended to
/// the returned transcript and, if `sink` is given, forwarded as it
/// arrives; a full sink drops lines rather than stalling the process.
pub async fn run_streaming(
    mut cmd: Command,
    what: &str,
    deadline: Duration,
    cancel: &CancellationToken,
    sink: Option<mpsc::Sender<String>>,
) -> Result<StreamedOutput, SubprocessError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|source| SubprocessError::Spawn {
        what: what.to_string(),
        source,
    })?;

    let (line_tx, mut line_rx) = mpsc::channel::<std::io::Result<String>>(64);
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, line_tx.clone());
    }
    drop(line_tx);

    let mut transcript = String::new();
    let timer = tokio::time::sleep(deadline);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            line = line_rx.recv() => match line {
                Some(Ok(line)) => {
                    if let Some(sink) = &sink {
                        let _ = sink.try_send(line.clone());
                    }
                    transcript.push_str(&line);
                    transcript.push('\n');
                }
                Some(Err(source)) => {
                    kill_tree(&mut child).await;
                    return Err(SubprocessError::Io { what: what.to_string(), source });
                }
                None => break,
            },
            () = &mut timer => {
                kill_tree(&mut child).await;
                return Err(SubprocessError::DeadlineExceeded {
                    what: what.to_string(),
                    deadline,
                    transcript,
                });
            }
            () = cancel.cancelled() => {
                kill_tree(&mut child).await;
                return Err(SubprocessError::Cancelled { what: what.to_string(), transcript });
            }
        }
    }

    // Output streams hit EOF; the same deadline still bounds process exit.
    let exit = tokio::select! {
        status = child.wait() => status.map_err(|source| SubprocessError::Io {
            what: what.to_string(),
            source,
        })?,
        () = &mut timer => {
            kill_tree(&mut child).await;
            return Err(SubprocessError::DeadlineExceeded {
                what: what.to_string(),
                deadline,
                transcript,
            });
        }
        () = cancel.cancelled() => {
            kill_tree(&mut child).await;
            return Err(SubprocessError::Cancelled { what: what.to_string(), transcript });
        }
    };

    Ok(StreamedOutput { exit, transcript })
}

fn spawn_line_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    tx: mpsc::Sender<std::io::Result<String>>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(Ok(line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    break;
                }
            }
        }
    });
}

/// Kill the child's entire process group, then reap it.
async fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
    let _ = child.start_kill();
    let _ = child.wait().await;
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
