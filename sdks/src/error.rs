// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use conclave_core::domain::llm::ModelError;
use conclave_core::domain::tool::ToolError;
use conclave_core::infrastructure::agent_manifest_parser::ManifestError;
use conclave_swarm::OrchestrationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The workflow file could not be read, parsed or validated.
    #[error("Workflow validation failed: {0}")]
    ValidationFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Tool provider error: {0}")]
    Tool(#[from] ToolError),

    #[error("Orchestration failed: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("Model client error: {0}")]
    Model(#[from] ModelError),
}
