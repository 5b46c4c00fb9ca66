// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Tool Approval Domain
//!
//! Policy configuration and the human-in-the-loop approval port.
//!
//! | Type | Description |
//! |------|-------------|
//! | `PolicyAction` | `allow`, `deny` or `ask` |
//! | `ToolPolicy` | glob pattern over tool names mapped to an action |
//! | `GatekeeperConfig` | ordered policies plus defaults |
//! | `Gatekeeper` | resolves `ask` outcomes (terminal prompt, auto-approve) |

use crate::domain::board::JsonMap;
use crate::domain::tool::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    Allow,
    Deny,
    #[default]
    Ask,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPolicy {
    /// Glob over tool names (`fs_*`, `shell`, `*`)
    pub pattern: String,
    pub action: PolicyAction,
    #[serde(default)]
    pub reason: String,
}

impl ToolPolicy {
    pub fn new(pattern: impl Into<String>, action: PolicyAction) -> Self {
        Self {
            pattern: pattern.into(),
            action,
            reason: String::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatekeeperConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub default_action: PolicyAction,

    /// Exact tool names that never need approval
    #[serde(default)]
    pub safe_tools: Vec<String>,

    /// Evaluated in order; first match wins
    #[serde(default)]
    pub policies: Vec<ToolPolicy>,

    #[serde(default = "default_approval_timeout", with = "humantime_serde")]
    pub approval_timeout: Duration,
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            default_action: PolicyAction::Ask,
            safe_tools: Vec::new(),
            policies: Vec::new(),
            approval_timeout: default_approval_timeout(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_approval_timeout() -> Duration {
    Duration::from_secs(300)
}

/// What the gate is asked to approve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub tool_name: String,
    pub arguments: JsonMap,
    /// Reason of the policy that produced `ask`, empty when none matched
    pub reason: String,
    #[serde(default)]
    pub metadata: JsonMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalResult {
    pub approved: bool,
    #[serde(default)]
    pub reason: String,
}

impl ApprovalResult {
    pub fn approved(reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            reason: reason.into(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
        }
    }
}

/// Resolves `ask` policy outcomes.
#[async_trait]
pub trait Gatekeeper: Send + Sync {
    async fn request_approval(&self, request: ApprovalRequest) -> Result<ApprovalResult, ToolError>;
}
