// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod error;
pub mod roster;
pub mod topology;

pub use error::OrchestrationError;
pub use roster::AgentRoster;
pub use topology::{StarPhase, Subscription, TopologyKind};
