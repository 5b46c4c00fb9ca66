// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Node
//!
//! The model-backed [`Agent`]: renders a [`ContextSlice`] into a user
//! message, calls its [`ModelClient`] once, and reports the reply as a
//! `generate` trace entry plus a `last_response` artifact.
//!
//! ## Context rendering
//!
//! Sections are separated by a blank line and omitted when empty:
//!
//! ```text
//! Current state: <belief>
//!
//! Pending tasks:
//! - <description> (priority <p>)
//!
//! Artifacts: <compact JSON>
//!
//! Recent trace:
//! - [<agent_id>] <action>
//! ```
//!
//! Only the last five trace entries are rendered.

use crate::domain::agent::{render_prompt, Agent, AgentError, AgentManifest};
use crate::domain::board::{ContextSlice, JsonMap, StateDelta, TraceEntry};
use crate::domain::llm::ModelClient;
use crate::domain::message::{CanonicalMessage, ToolSchema};
use crate::domain::validation::GENERATE_ACTION;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const RECENT_TRACE_ENTRIES: usize = 5;

pub struct AgentNode {
    name: String,
    instructions: String,
    client: Arc<dyn ModelClient>,
    tools: Option<Vec<ToolSchema>>,
}

impl AgentNode {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        client: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            client,
            tools: None,
        }
    }

    /// Build a node from a manifest, rendering its prompt template.
    pub fn from_manifest(
        manifest: &AgentManifest,
        client: Arc<dyn ModelClient>,
        variables: &HashMap<String, String>,
    ) -> Self {
        Self::new(manifest.name.clone(), render_prompt(manifest, variables), client)
    }

    /// Tool schemas offered to the model. An empty list offers none.
    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = (!tools.is_empty()).then_some(tools);
        self
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> Option<&[ToolSchema]> {
        self.tools.as_deref()
    }
}

#[async_trait]
impl Agent for AgentNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn step(&self, context: ContextSlice) -> Result<StateDelta, AgentError> {
        let mut messages = vec![CanonicalMessage::system(self.instructions.clone())];
        let rendered = render_context(&context);
        if !rendered.is_empty() {
            messages.push(CanonicalMessage::user(rendered));
        }

        debug!(agent = %self.name, messages = messages.len(), "Calling model");
        metrics::counter!("conclave_agent_steps_total", "agent" => self.name.clone()).increment(1);

        let reply = self.client.generate(&messages, self.tools.as_deref()).await?;
        let text = reply.text();
        let has_tool_calls = reply.tool_calls.is_some();

        let mut data = JsonMap::new();
        data.insert("text".to_string(), Value::String(text.clone()));
        data.insert("has_tool_calls".to_string(), Value::Bool(has_tool_calls));

        Ok(StateDelta::trace(TraceEntry::new(&self.name, GENERATE_ACTION).with_data(data))
            .with_artifact("last_response", json!({ self.name.clone(): text })))
    }
}

/// Render a slice as the user message an agent sees.
pub fn render_context(context: &ContextSlice) -> String {
    let mut sections = Vec::new();

    if !context.belief_state.is_empty() {
        sections.push(format!("Current state: {}", context.belief_state));
    }

    if !context.pending_tasks.is_empty() {
        let lines: Vec<String> = context
            .pending_tasks
            .iter()
            .map(|task| format!("- {} (priority {})", task.description, task.priority))
            .collect();
        sections.push(format!("Pending tasks:\n{}", lines.join("\n")));
    }

    if !context.artifacts.is_empty() {
        let artifacts = Value::Object(context.artifacts.clone());
        sections.push(format!("Artifacts: {artifacts}"));
    }

    if !context.trace.is_empty() {
        let skip = context.trace.len().saturating_sub(RECENT_TRACE_ENTRIES);
        let lines: Vec<String> = context.trace[skip..]
            .iter()
            .map(|entry| format!("- [{}] {}", entry.agent_id, entry.action))
            .collect();
        sections.push(format!("Recent trace:\n{}", lines.join("\n")));
    }

    sections.join("\n\n")
}
