// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job scoping: jobs belong to a workspace or to the standalone scope.

/// Scope for jobs loaded from the top-level `jobs/` directory.
pub const STANDALONE_SCOPE: &str = "standalone";

/// Build the `scope/name` key used by the job registry and state store.
pub fn scoped_name(scope: &str, name: &str) -> String {
    format!("{}/{}", scope, name)
}

/// Split a `scope/name` key back into its parts.
///
/// A key without a separator is treated as standalone.
pub fn split_scoped_name(key: &str) -> (&str, &str) {
    match key.split_once('/') {
        Some((scope, name)) => (scope, name),
        None => (STANDALONE_SCOPE, key),
    }
}
