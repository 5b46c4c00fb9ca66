// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Topology Value Objects
//!
//! - [`TopologyKind`]: which agent-selection policy drives a run.
//! - [`StarPhase`]: the star topology's explicit state machine.
//! - [`Subscription`]: one mesh agent's topic patterns.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    Pipeline,
    Star,
    Mesh,
}

impl TopologyKind {
    /// Iteration cap used when the caller does not set one.
    pub fn default_max_iterations(&self) -> usize {
        match self {
            TopologyKind::Pipeline => 100,
            TopologyKind::Star => 20,
            TopologyKind::Mesh => 50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyKind::Pipeline => "pipeline",
            TopologyKind::Star => "star",
            TopologyKind::Mesh => "mesh",
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Star topology state.
///
/// ```text
/// Supervisor ──Route: w──▶ Worker(w) ──▶ Supervisor
///     │
///     └──DONE / unknown route / no directive──▶ Finished
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StarPhase {
    Supervisor,
    Worker(String),
    Finished,
}

/// Topic patterns one mesh agent listens on, e.g. `research.*` or `**`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub agent: String,
    pub patterns: Vec<String>,
}

impl Subscription {
    pub fn new<I, S>(agent: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            agent: agent.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}
