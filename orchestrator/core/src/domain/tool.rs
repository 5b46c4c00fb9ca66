// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Tool Provider Domain
//!
//! A [`ToolProvider`] is any external component that can list and execute
//! named tools: an MCP server, an in-process function table, a test double.
//! Dispatchers in `crate::application` aggregate providers by tool name.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Tool provider port and the dispatch error taxonomy

use crate::domain::board::JsonMap;
use crate::domain::message::{ToolResult, ToolSchema};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// List the tools this provider exposes.
    async fn discover_tools(&self) -> Result<Vec<ToolSchema>, ToolError>;

    /// Execute `name` with `arguments`.
    ///
    /// The returned `tool_call_id` is overwritten by the dispatcher.
    async fn execute_tool(&self, name: &str, arguments: JsonMap) -> Result<ToolResult, ToolError>;

    /// Release any held resources (processes, sockets).
    async fn close(&self) -> Result<(), ToolError> {
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool '{tool}' failed: {detail}")]
    ExecutionFailed { tool: String, detail: String },

    #[error("Tool '{tool}' denied: {reason}")]
    ApprovalDenied { tool: String, reason: String },

    #[error("Approval for tool '{tool}' timed out after {timeout:?}")]
    ApprovalTimeout { tool: String, timeout: Duration },

    #[error("Connection error: {0}")]
    Connection(String),
}

impl ToolError {
    /// Short label used as the `outcome` metric dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            ToolError::NotFound(_) => "not_found",
            ToolError::ExecutionFailed { .. } => "failed",
            ToolError::ApprovalDenied { .. } => "denied",
            ToolError::ApprovalTimeout { .. } => "timeout",
            ToolError::Connection(_) => "connection",
        }
    }
}
