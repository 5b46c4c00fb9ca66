// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `conclave-swarm`: Orchestration Topologies
//!
//! Drives a set of [`Agent`](conclave_core::domain::agent::Agent)s over a
//! shared [`Board`](conclave_core::domain::board::Board) until the topology
//! decides the run is over.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `AgentRoster`, `StarPhase`, `Subscription`, `OrchestrationError` |
//! | [`application`] | Application | `Orchestrator` trait, pipeline / star / mesh orchestrators |
//!
//! ## Topologies
//!
//! - **Pipeline**: fixed order, one pass, unfiltered slices.
//! - **Star**: a supervisor routes to workers (`Route: <name>`) until `DONE`.
//! - **Mesh**: agents subscribe to topic globs; events fan out concurrently
//!   and commits follow subscription declaration order.
//!
//! Every run is bounded by `max_iterations`.

pub mod domain;
pub mod application;

#[cfg(test)]
pub(crate) mod testing;

pub use application::*;
pub use domain::*;
