// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Model Client Registry - ModelConfig to ModelClient resolution
//
// Turns a `provider/model` configuration into a ready client: the capability
// registry decides native vs prompted tool calling, and every provider is
// reached through its OpenAI-compatible endpoint.

use crate::application::strategy::{select_strategy, ToolCallingStrategy};
use crate::domain::capability::CapabilityRegistry;
use crate::domain::llm::{ModelClient, ModelConfig, ModelError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::openai::OpenAIAdapter;

/// Builds model clients from configuration.
#[async_trait]
pub trait ModelClientFactory: Send + Sync {
    async fn create(&self, config: &ModelConfig) -> Result<Arc<dyn ModelClient>, ModelError>;
}

/// Default factory: OpenAI-compatible adapter plus capability-driven strategy.
pub struct ProviderRegistry {
    capabilities: CapabilityRegistry,
    strategy_override: Option<Arc<dyn ToolCallingStrategy>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(CapabilityRegistry::with_known_models())
    }
}

impl ProviderRegistry {
    pub fn new(capabilities: CapabilityRegistry) -> Self {
        Self {
            capabilities,
            strategy_override: None,
        }
    }

    /// Force one strategy for every client this registry builds.
    pub fn with_strategy(mut self, strategy: Arc<dyn ToolCallingStrategy>) -> Self {
        self.strategy_override = Some(strategy);
        self
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    pub fn build(&self, config: &ModelConfig) -> OpenAIAdapter {
        let profile = self.capabilities.resolve(config);
        info!(
            model = %config.model,
            native_tools = profile.supports_native_tools,
            "Creating model client"
        );
        let strategy = select_strategy(&self.capabilities, config, self.strategy_override.clone());
        OpenAIAdapter::new(config.clone()).with_strategy(strategy)
    }
}

#[async_trait]
impl ModelClientFactory for ProviderRegistry {
    async fn create(&self, config: &ModelConfig) -> Result<Arc<dyn ModelClient>, ModelError> {
        if config.model.trim().is_empty() {
            return Err(ModelError::ModelNotFound("<empty>".to_string()));
        }
        Ok(Arc::new(self.build(config)))
    }
}
