// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod docker;
pub mod local;

pub use docker::DockerSandbox;
pub use local::LocalSandbox;

use std::collections::HashMap;

/// Sandbox-level env overlaid with request-level env (request wins).
pub(crate) fn merge_env(
    base: &HashMap<String, String>,
    overrides: &HashMap<String, String>,
) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = base
        .iter()
        .filter(|(key, _)| !overrides.contains_key(*key))
        .chain(overrides.iter())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    merged.sort();
    merged
}
