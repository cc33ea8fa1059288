// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pv-storage: durable workspace and job state.
//!
//! Both stores are single JSON files rewritten atomically (write a temp
//! file in the same directory, then rename over). All read/modify/write
//! sequences run under one `parking_lot::Mutex` per store; the busy
//! check-and-set for a workspace is atomic under that lock, which is what
//! serializes concurrent triggers on the same workspace.

mod atomic;
mod error;
mod jobs;
mod state;

pub use error::StateError;
pub use jobs::{JobState, JobStateStore};
pub use state::{StateStore, WorkspaceState};
