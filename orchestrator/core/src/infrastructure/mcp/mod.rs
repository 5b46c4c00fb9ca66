// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! MCP (Model Context Protocol) tool providers
//!
//! [`McpClient`] speaks JSON-RPC 2.0 to a tool server over one of the
//! [`McpTransport`] carriers and plugs into the dispatcher as a
//! [`ToolProvider`](crate::domain::tool::ToolProvider).

pub mod client;
pub mod transport;

pub use client::{create_transport, McpClient, PROTOCOL_VERSION};
pub use transport::{McpTransport, StdioTransport, WebSocketTransport};
