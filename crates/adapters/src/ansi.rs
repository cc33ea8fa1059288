// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal escape stripping for captured tool output.
//!
//! Provisioner tools color their diagnostics; anything persisted to the
//! state file or the journal must be plain text. The full colored output
//! still goes to the per-workspace log file, so this is applied only at
//! the state/journal sink.

use regex::Regex;
use std::sync::LazyLock;

// CSI sequences (colors, cursor movement) and OSC titles.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static ESCAPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07]*\x07")
        .expect("constant regex pattern is valid")
});

/// Remove ANSI escape sequences, returning plain text.
pub fn strip_ansi(text: &str) -> String {
    ESCAPE_PATTERN.replace_all(text, "").into_owned()
}
