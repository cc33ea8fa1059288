// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pv-adapters: process-facing edges of the daemon.
//!
//! The provisioner-tool client, subprocess helpers, ANSI stripping for
//! captured error text, and the template fetcher live here so the engine
//! stays free of direct `Command` plumbing.

pub mod ansi;
pub mod provisioner;
pub mod subprocess;
pub mod template_fetch;

pub use ansi::strip_ansi;
pub use provisioner::{
    DeployRequest, ProbedStatus, ProvisionerClient, ProvisionerError, TofuClient, ToolOutput,
};
pub use template_fetch::{copy_tree, fetch_template, hash_tree, FetchError};

#[cfg(any(test, feature = "test-support"))]
pub use provisioner::fake::{FakeProvisioner, RecordedCall};
