// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Conclave CLI

pub mod agents;
pub mod inspect;
pub mod run;
pub mod tools;

pub use self::agents::AgentsCommand;
pub use self::inspect::InspectArgs;
pub use self::run::RunArgs;
pub use self::tools::ToolsCommand;
