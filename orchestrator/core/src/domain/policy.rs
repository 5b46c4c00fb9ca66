// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::gatekeeper::{GatekeeperConfig, PolicyAction, ToolPolicy};
use glob::Pattern;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Invalid pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },
}

/// Outcome of evaluating a tool name, with the policy that decided it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyDecision<'a> {
    pub action: PolicyAction,
    pub policy: Option<&'a ToolPolicy>,
}

impl PolicyDecision<'_> {
    pub fn reason(&self) -> &str {
        self.policy.map(|p| p.reason.as_str()).unwrap_or("")
    }
}

/// Pure tool-name policy evaluation.
///
/// Precedence: disabled config, then `safe_tools`, then the first matching
/// glob policy, then `default_action`.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    config: GatekeeperConfig,
    patterns: Vec<Pattern>,
}

impl PolicyEngine {
    pub fn new(config: GatekeeperConfig) -> Result<Self, PolicyError> {
        let patterns = config
            .policies
            .iter()
            .map(|policy| {
                Pattern::new(&policy.pattern).map_err(|e| PolicyError::InvalidPattern {
                    pattern: policy.pattern.clone(),
                    detail: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { config, patterns })
    }

    pub fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    pub fn evaluate(&self, tool_name: &str) -> PolicyAction {
        self.decide(tool_name).action
    }

    pub fn decide(&self, tool_name: &str) -> PolicyDecision<'_> {
        if !self.config.enabled || self.config.safe_tools.iter().any(|t| t == tool_name) {
            return PolicyDecision {
                action: PolicyAction::Allow,
                policy: None,
            };
        }

        self.patterns
            .iter()
            .zip(&self.config.policies)
            .find(|(pattern, _)| pattern.matches(tool_name))
            .map(|(_, policy)| PolicyDecision {
                action: policy.action,
                policy: Some(policy),
            })
            .unwrap_or(PolicyDecision {
                action: self.config.default_action,
                policy: None,
            })
    }
}
