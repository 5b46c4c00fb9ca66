// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Model capability profiles
//!
//! Decides whether a model gets native tool calling or the prompted (ReAct)
//! polyfill. The registry is an explicit value handed down by the assembly
//! layer; [`CapabilityRegistry::with_known_models`] is the batteries-included
//! constructor.

use crate::domain::llm::ModelConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityProfile {
    pub supports_native_tools: bool,
    pub supports_vision: bool,
    pub supports_audio: bool,
    pub supports_streaming: bool,
    pub context_window: u32,
}

impl Default for CapabilityProfile {
    fn default() -> Self {
        Self {
            supports_native_tools: false,
            supports_vision: false,
            supports_audio: false,
            supports_streaming: true,
            context_window: 4096,
        }
    }
}

impl CapabilityProfile {
    fn native(context_window: u32, vision: bool, audio: bool) -> Self {
        Self {
            supports_native_tools: true,
            supports_vision: vision,
            supports_audio: audio,
            supports_streaming: true,
            context_window,
        }
    }

    /// Override fields from a flat capability map.
    ///
    /// Recognised keys: `native_tool_calling`, `vision`, `audio`, `streaming`.
    /// Unknown keys are ignored.
    pub fn with_overrides(mut self, overrides: &HashMap<String, bool>) -> Self {
        for (key, value) in overrides {
            match key.as_str() {
                "native_tool_calling" => self.supports_native_tools = *value,
                "vision" => self.supports_vision = *value,
                "audio" => self.supports_audio = *value,
                "streaming" => self.supports_streaming = *value,
                _ => {}
            }
        }
        self
    }
}

/// Maps model identifiers to capability profiles.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    models: HashMap<String, CapabilityProfile>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with well-known hosted models.
    pub fn with_known_models() -> Self {
        let mut registry = Self::new();
        let known = [
            ("openai/gpt-4o", CapabilityProfile::native(128_000, true, false)),
            ("openai/gpt-4o-mini", CapabilityProfile::native(128_000, true, false)),
            ("openai/gpt-4-turbo", CapabilityProfile::native(128_000, true, false)),
            ("openai/gpt-3.5-turbo", CapabilityProfile::native(16_385, false, false)),
            ("anthropic/claude-3-opus", CapabilityProfile::native(200_000, true, false)),
            ("anthropic/claude-3-sonnet", CapabilityProfile::native(200_000, true, false)),
            ("anthropic/claude-3-haiku", CapabilityProfile::native(200_000, true, false)),
            ("gemini/gemini-1.5-pro", CapabilityProfile::native(1_000_000, true, true)),
            ("gemini/gemini-1.5-flash", CapabilityProfile::native(1_000_000, true, true)),
            ("gemini/gemini-2.0-flash", CapabilityProfile::native(1_000_000, true, true)),
        ];
        for (model_id, profile) in known {
            registry.register(model_id, profile);
        }
        registry
    }

    pub fn register(&mut self, model_id: impl Into<String>, profile: CapabilityProfile) {
        self.models.insert(model_id.into(), profile);
    }

    /// Resolve the profile for `config`.
    ///
    /// Lookup order: full model string, then the name without provider
    /// prefix, then the default profile. `config.capabilities` overrides the
    /// result.
    pub fn resolve(&self, config: &ModelConfig) -> CapabilityProfile {
        let profile = self
            .models
            .get(&config.model)
            .or_else(|| self.models.get(config.model_name()))
            .copied()
            .unwrap_or_default();

        if config.capabilities.is_empty() {
            profile
        } else {
            profile.with_overrides(&config.capabilities)
        }
    }
}
