// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// A2A (Agent-to-Agent) Adapter
//
// Remote agents advertise an agent card at `/.well-known/agent.json` and
// accept JSON-RPC `tasks/send` requests at their base URL. `A2AClient`
// exposes each advertised skill as a tool; `RemoteAgent` lets a remote skill
// take a turn on the board like any local agent.

use crate::domain::agent::{Agent, AgentError};
use crate::domain::board::{ContextSlice, JsonMap, StateDelta, TraceEntry};
use crate::domain::message::{ToolResult, ToolSchema};
use crate::domain::tool::{ToolError, ToolProvider};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Trace action recorded by [`RemoteAgent`].
pub const DELEGATE_ACTION: &str = "a2a_delegate";

pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Metadata a remote agent serves at [`AGENT_CARD_PATH`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct TaskMessage {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct TaskStatus {
    #[serde(default)]
    message: Option<TaskMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct TaskArtifact {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct TaskResult {
    #[serde(default)]
    status: TaskStatus,
    #[serde(default)]
    artifacts: Vec<TaskArtifact>,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(default)]
    result: Option<TaskResult>,
    #[serde(default)]
    error: Option<Value>,
}

impl TaskResponse {
    /// First non-empty text part of the artifacts, then of the status message.
    fn text(&self) -> String {
        let Some(result) = &self.result else {
            return String::new();
        };
        result
            .artifacts
            .iter()
            .flat_map(|artifact| &artifact.parts)
            .chain(result.status.message.iter().flat_map(|message| &message.parts))
            .find(|part| !part.text.is_empty())
            .map(|part| part.text.clone())
            .unwrap_or_default()
    }
}

/// Client for one remote A2A agent.
pub struct A2AClient {
    client: reqwest::Client,
    base_url: String,
    card: RwLock<Option<AgentCard>>,
}

impl A2AClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            card: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch and cache the agent card.
    pub async fn fetch_agent_card(&self) -> Result<AgentCard, ToolError> {
        let url = format!("{}{AGENT_CARD_PATH}", self.base_url);
        debug!(url = %url, "Fetching agent card");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolError::Connection(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ToolError::Connection(format!(
                "agent card request to {url} returned HTTP {}",
                response.status()
            )));
        }
        let card: AgentCard = response
            .json()
            .await
            .map_err(|e| ToolError::Connection(format!("invalid agent card: {e}")))?;

        info!(agent = %card.name, skills = card.skills.len(), "Fetched A2A agent card");
        *self.card.write() = Some(card.clone());
        Ok(card)
    }

    fn task_request(message: &str) -> Value {
        let mut task_id = Uuid::new_v4().simple().to_string();
        task_id.truncate(12);
        json!({
            "jsonrpc": "2.0",
            "method": "tasks/send",
            "id": 1,
            "params": {
                "id": task_id,
                "message": {"role": "user", "parts": [{"type": "text", "text": message}]},
            },
        })
    }
}

#[async_trait]
impl ToolProvider for A2AClient {
    /// One function per skill, taking a single `message` string.
    async fn discover_tools(&self) -> Result<Vec<ToolSchema>, ToolError> {
        let cached = self.card.read().clone();
        let card = match cached {
            Some(card) => card,
            None => self.fetch_agent_card().await?,
        };
        Ok(card
            .skills
            .iter()
            .map(|skill| {
                let description = if skill.description.is_empty() {
                    &skill.name
                } else {
                    &skill.description
                };
                ToolSchema::function(
                    skill.id.clone(),
                    description.clone(),
                    Some(json!({
                        "type": "object",
                        "properties": {
                            "message": {"type": "string", "description": "Input for the agent"},
                        },
                        "required": ["message"],
                    })),
                )
            })
            .collect())
    }

    async fn execute_tool(&self, name: &str, arguments: JsonMap) -> Result<ToolResult, ToolError> {
        // skills are only checked once a card has been fetched
        if let Some(card) = self.card.read().as_ref() {
            if !card.skills.iter().any(|skill| skill.id == name) {
                return Err(ToolError::NotFound(name.to_string()));
            }
        }

        let message = match arguments.get("message") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let failed = |detail: String| ToolError::ExecutionFailed {
            tool: name.to_string(),
            detail,
        };

        debug!(skill = %name, url = %self.base_url, "Sending A2A task");
        let response = self
            .client
            .post(format!("{}/", self.base_url))
            .json(&Self::task_request(&message))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(failed(format!("HTTP {status}: {body}")));
        }

        let task: TaskResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("invalid task response: {e}")))?;
        if let Some(error) = &task.error {
            let detail = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(failed(detail));
        }

        Ok(ToolResult::from_text("", task.text()))
    }
}

/// A remote skill taking turns on the board.
///
/// The belief state, followed by the slice's artifacts as JSON when there
/// are any, is sent as the task message. The reply lands under
/// `last_response.<name>` with an `a2a_delegate` trace entry.
pub struct RemoteAgent {
    name: String,
    skill: String,
    client: Arc<A2AClient>,
}

impl RemoteAgent {
    /// The skill id defaults to the agent name.
    pub fn new(name: impl Into<String>, client: Arc<A2AClient>) -> Self {
        let name = name.into();
        Self {
            skill: name.clone(),
            name,
            client,
        }
    }

    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skill = skill.into();
        self
    }

    fn message(context: &ContextSlice) -> String {
        if context.artifacts.is_empty() {
            context.belief_state.clone()
        } else {
            format!(
                "{}\n\nArtifacts: {}",
                context.belief_state,
                Value::Object(context.artifacts.clone())
            )
        }
    }
}

#[async_trait]
impl Agent for RemoteAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn step(&self, context: ContextSlice) -> Result<StateDelta, AgentError> {
        let mut arguments = JsonMap::new();
        arguments.insert("message".into(), json!(Self::message(&context)));

        let text = self
            .client
            .execute_tool(&self.skill, arguments)
            .await
            .map_err(|e| AgentError::Remote(e.to_string()))?
            .text();

        let mut data = JsonMap::new();
        data.insert("skill".into(), json!(self.skill));
        data.insert("response_length".into(), json!(text.chars().count()));
        Ok(StateDelta::trace(TraceEntry::new(&self.name, DELEGATE_ACTION).with_data(data))
            .with_artifact("last_response", json!({ self.name.as_str(): text })))
    }
}
