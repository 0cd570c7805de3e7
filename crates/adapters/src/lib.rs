// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sw-adapters: Process-facing adapters for the sketchwasm compile service
//!
//! Everything that touches the operating system lives here: the streaming
//! subprocess runner, scratch directory management, the external compiler
//! invoker, and the upstream library source syncer. The engine crate talks
//! to these through the [`CompilerInvoker`] and [`SourceSync`] traits so
//! tests can substitute fakes.

pub mod compiler;
pub mod scratch;
pub mod subprocess;
pub mod sync;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use compiler::{CompileOutput, CompilerInvoker, InvokeError, SubprocessInvoker};
pub use scratch::ScratchDir;
pub use subprocess::{run_streaming, StreamedOutput, SubprocessError};
pub use sync::{RsyncSourceSync, SourceSync, SyncError, SyncOutcome};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCompiler, FakeOutcome, FakeSync};
