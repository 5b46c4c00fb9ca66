// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod a2a;
pub mod agent_manifest_parser;
pub mod event_bus;
pub mod gatekeeper;
pub mod llm;
pub mod mcp;
pub mod repositories;
pub mod sandbox;

pub use a2a::{A2AClient, AgentCard, RemoteAgent};
pub use agent_manifest_parser::{AgentManifestParser, ManifestError};
pub use event_bus::{EventBus, EventBusError, TopicPattern};
pub use gatekeeper::{AutoApproveGatekeeper, CliGatekeeper};
pub use llm::{ModelClientFactory, OpenAIAdapter, ProviderRegistry};
pub use mcp::McpClient;
pub use repositories::InMemoryBoardRepository;
pub use sandbox::{DockerSandbox, LocalSandbox};
