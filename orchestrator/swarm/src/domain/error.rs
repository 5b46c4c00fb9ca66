// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use conclave_core::domain::agent::AgentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// A step failed; the run is aborted.
    #[error("Agent '{agent}' failed: {source}")]
    Agent {
        agent: String,
        #[source]
        source: AgentError,
    },

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),
}

impl OrchestrationError {
    pub fn agent(agent: impl Into<String>, source: AgentError) -> Self {
        OrchestrationError::Agent {
            agent: agent.into(),
            source,
        }
    }
}
