// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Conclave SDK
//!
//! Declarative workflows: a YAML file names agent manifests, a topology and
//! optional model, gatekeeper and MCP settings. [`WorkflowLoader`] reads and
//! validates it; [`WorkflowRunner`] wires everything together and runs it.
//!
//! ```no_run
//! # async fn demo() -> Result<(), conclave_sdk::WorkflowError> {
//! let runner = conclave_sdk::WorkflowRunner::from_yaml("workflow.yaml")?;
//! let board = runner.run("Write a short report on solar power").await?;
//! println!("{}", board.belief_state);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod models;
pub mod workflow;

pub use error::WorkflowError;
pub use models::*;
pub use workflow::{expand_env, WorkflowLoader, WorkflowRunner, DEFAULT_MODEL};
