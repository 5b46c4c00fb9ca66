// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Llm
//!
//! Model-call port consumed by agent nodes.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Provider-neutral interface to language models

// Model Client Domain Interface (Anti-Corruption Layer)
//
// Agents only ever hand a list of CanonicalMessage values (plus optional tool
// schemas) to a ModelClient and receive one assistant CanonicalMessage back.
// Concrete adapters live in infrastructure/llm/.

use crate::domain::message::{CanonicalMessage, ToolSchema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Domain interface for model providers
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate the next assistant message for `history`.
    async fn generate(
        &self,
        history: &[CanonicalMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<CanonicalMessage, ModelError>;
}

/// Configuration for a specific model/provider combination.
///
/// `model` uses the `provider/model_name` convention (e.g. `openai/gpt-4o`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub capabilities: HashMap<String, bool>,
    /// Extra request-body parameters (temperature, max_tokens, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            api_base: None,
            context_window: None,
            capabilities: HashMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Provider prefix of the model string, `openai` when there is none.
    pub fn provider(&self) -> &str {
        match self.model.split_once('/') {
            Some((provider, _)) => provider,
            None => "openai",
        }
    }

    /// Model name without the provider prefix.
    pub fn model_name(&self) -> &str {
        match self.model.split_once('/') {
            Some((_, name)) => name,
            None => &self.model,
        }
    }
}

/// Errors that can occur during model calls
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_prefix() {
        assert_eq!(ModelConfig::new("anthropic/claude-3-haiku").provider(), "anthropic");
        assert_eq!(ModelConfig::new("gpt-4o").provider(), "openai");
        assert_eq!(ModelConfig::new("openai/gpt-4o").model_name(), "gpt-4o");
    }

    #[test]
    fn test_model_config_from_yaml() {
        let config: ModelConfig = serde_yaml::from_str(
            "model: ollama/llama3\napi_base: http://localhost:11434/v1\ncapabilities:\n  native_tool_calling: false\nextra:\n  temperature: 0.2\n",
        )
        .unwrap();
        assert_eq!(config.provider(), "ollama");
        assert_eq!(config.capabilities.get("native_tool_calling"), Some(&false));
        assert_eq!(config.extra.get("temperature"), Some(&serde_json::json!(0.2)));
    }
}
