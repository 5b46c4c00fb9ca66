// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent_node;
pub mod dispatcher;
pub mod react;
pub mod reflexion;
pub mod safe_dispatcher;
pub mod strategy;

// Re-export the assembly-facing services for convenience
pub use agent_node::AgentNode;
pub use dispatcher::{ToolDispatch, ToolDispatcher};
pub use reflexion::ReflexionAgent;
pub use safe_dispatcher::SafeDispatcher;
pub use strategy::{select_strategy, NativeStrategy, PromptedStrategy, ToolCallingStrategy};
