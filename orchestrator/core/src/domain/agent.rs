// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Domain
//!
//! The [`Agent`] trait is the unit every topology drives: it turns one
//! [`ContextSlice`] into one [`StateDelta`]. [`AgentManifest`] is the
//! declarative description (`agent.yaml` / `agent.json`) an agent node is
//! built from.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Agent port and manifest model

use crate::domain::board::{ContextSlice, JsonMap, StateDelta};
use crate::domain::llm::ModelError;
use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

/// An executable agent: one reasoning step per call.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn step(&self, context: ContextSlice) -> Result<StateDelta, AgentError>;
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Remote agent failed: {0}")]
    Remote(String),
}

/// Declarative description of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentManifest {
    /// Required: unique agent name
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub model_requirements: ModelRequirements,

    /// `$name` / `${name}` placeholders are substituted at render time
    #[serde(default = "default_prompt_template")]
    pub system_prompt_template: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mcp_servers: Vec<McpServerRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: JsonMap,
}

impl AgentManifest {
    pub fn new(name: impl Into<String>, system_prompt_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            description: String::new(),
            model_requirements: ModelRequirements::default(),
            system_prompt_template: system_prompt_template.into(),
            mcp_servers: Vec::new(),
            input_schema: None,
            output_schema: None,
            metadata: JsonMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequirements {
    #[serde(default = "default_min_context_window")]
    pub min_context_window: u32,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_model: Option<String>,
}

impl Default for ModelRequirements {
    fn default() -> Self {
        Self {
            min_context_window: default_min_context_window(),
            capabilities: Vec::new(),
            preferred_model: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpTransportKind {
    #[default]
    Stdio,
    Websocket,
}

/// Reference to an MCP server an agent (or workflow) wants connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerRef {
    pub name: String,
    #[serde(default)]
    pub transport: McpTransportKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_prompt_template() -> String {
    "You are $name.".to_string()
}

fn default_min_context_window() -> u32 {
    4096
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(\$)|([A-Za-z_][A-Za-z0-9_]*)|\{([A-Za-z_][A-Za-z0-9_]*)\})")
        .expect("placeholder pattern is valid")
});

/// Render the manifest's system prompt.
///
/// `name` is always bound to the manifest name; `variables` add or override
/// bindings. Unknown placeholders are left untouched and `$$` renders as `$`.
pub fn render_prompt(manifest: &AgentManifest, variables: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(&manifest.system_prompt_template, |caps: &Captures| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let key = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
            match key {
                Some(key) => match variables.get(key) {
                    Some(value) => value.clone(),
                    None if key == "name" => manifest.name.clone(),
                    None => caps[0].to_string(),
                },
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
