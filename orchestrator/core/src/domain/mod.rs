// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value objects, ports and error types shared by every orchestration
//! topology.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Board state model plus the agent, model, tool, approval and
//!   sandbox ports

pub mod agent;
pub mod board;
pub mod capability;
pub mod events;
pub mod gatekeeper;
pub mod llm;
pub mod message;
pub mod policy;
pub mod repository;
pub mod sandbox;
pub mod tool;
pub mod validation;
