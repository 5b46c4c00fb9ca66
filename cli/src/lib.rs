// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Conclave CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** subcommand handlers for the `conclave` binary and the
//!   terminal formatting they share

pub mod commands;
pub mod output;
