// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Conclave Core
//!
//! Shared board state, agent units, tool dispatch with approval gating,
//! model adapters, MCP and A2A tool providers, remote agents and sandboxes.
//! Topologies that drive agents over a board live in `conclave-swarm`.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain ports plus their application services and
//!   infrastructure adapters

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
