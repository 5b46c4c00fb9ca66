// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// OpenAI Model Client Adapter
//
// Anti-Corruption Layer for the chat-completions API.
// Also works with OpenAI-compatible gateways (LiteLLM proxy, Ollama, vLLM,
// LM Studio) through `api_base`.

use crate::application::strategy::{NativeStrategy, ToolCallingStrategy};
use crate::domain::board::JsonMap;
use crate::domain::llm::{ModelClient, ModelConfig, ModelError};
use crate::domain::message::{CanonicalMessage, ContentPart, Role, ToolCall, ToolSchema};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAIAdapter {
    client: reqwest::Client,
    config: ModelConfig,
    endpoint: String,
    strategy: Arc<dyn ToolCallingStrategy>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunctionCall,
}

#[derive(Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl OpenAIAdapter {
    pub fn new(config: ModelConfig) -> Self {
        let endpoint = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Self {
            client: reqwest::Client::new(),
            config,
            endpoint,
            strategy: Arc::new(NativeStrategy),
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn ToolCallingStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn request_body(&self, messages: &[CanonicalMessage], tools: Option<&[ToolSchema]>) -> Value {
        let mut body = JsonMap::new();
        body.insert("model".into(), json!(self.config.model_name()));
        body.insert(
            "messages".into(),
            Value::Array(messages.iter().map(to_openai_message).collect()),
        );
        if let Some(tools) = tools.filter(|tools| !tools.is_empty()) {
            body.insert("tools".into(), json!(tools));
        }
        for (key, value) in &self.config.extra {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }

    async fn complete(
        &self,
        messages: &[CanonicalMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<CanonicalMessage, ModelError> {
        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));
        debug!(model = %self.config.model, url = %url, messages = messages.len(), "Sending chat completion");

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&self.request_body(messages, tools));
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(if status == 401 || status == 403 {
                ModelError::Authentication(error_text)
            } else if status == 429 {
                ModelError::RateLimit
            } else if status == 404 {
                ModelError::ModelNotFound(self.config.model.clone())
            } else {
                ModelError::Provider(format!("HTTP {status}: {error_text}"))
            });
        }

        let body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        from_openai_response(body)
    }
}

#[async_trait]
impl ModelClient for OpenAIAdapter {
    async fn generate(
        &self,
        history: &[CanonicalMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<CanonicalMessage, ModelError> {
        let (messages, tools) = self
            .strategy
            .prepare(history.to_vec(), tools.map(<[ToolSchema]>::to_vec));
        let reply = self.complete(&messages, tools.as_deref()).await?;
        Ok(self.strategy.interpret(reply))
    }
}

fn to_openai_message(message: &CanonicalMessage) -> Value {
    let mut out = JsonMap::new();
    out.insert("role".into(), json!(message.role.as_str()));

    let has_image = message
        .content
        .iter()
        .any(|part| matches!(part, ContentPart::Image { .. }));
    let content = if has_image {
        Value::Array(
            message
                .content
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => json!({"type": "text", "text": text}),
                    ContentPart::Image { url, .. } => {
                        json!({"type": "image_url", "image_url": {"url": url}})
                    }
                })
                .collect(),
        )
    } else {
        let text = message.text();
        if text.is_empty() && message.tool_calls.is_some() {
            Value::Null
        } else {
            Value::String(text)
        }
    };
    out.insert("content".into(), content);

    if let Some(tool_calls) = message.tool_calls.as_ref().filter(|_| message.role == Role::Assistant) {
        let calls: Vec<Value> = tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": Value::Object(call.arguments.clone()).to_string(),
                    }
                })
            })
            .collect();
        out.insert("tool_calls".into(), Value::Array(calls));
    }

    if let Some(tool_call_id) = &message.tool_call_id {
        out.insert("tool_call_id".into(), json!(tool_call_id));
    }

    Value::Object(out)
}

fn from_openai_response(response: OpenAIResponse) -> Result<CanonicalMessage, ModelError> {
    let OpenAIResponse { choices, usage } = response;
    let choice = choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::InvalidResponse("No choices in response".into()))?;

    let mut metadata = JsonMap::new();
    if let Some(usage) = usage {
        metadata.insert("usage".into(), usage);
    }
    if let Some(finish_reason) = choice.finish_reason {
        metadata.insert("finish_reason".into(), json!(finish_reason));
    }

    let mut message = CanonicalMessage::assistant(choice.message.content.unwrap_or_default())
        .with_metadata(metadata);

    if let Some(tool_calls) = choice.message.tool_calls.filter(|calls| !calls.is_empty()) {
        let calls = tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                arguments: parse_arguments(&call.function.arguments),
                name: call.function.name,
            })
            .collect();
        message = message.with_tool_calls(calls);
    }

    Ok(message)
}

/// Decode a JSON-string argument payload, keeping undecodable input as `raw`.
fn parse_arguments(raw: &str) -> JsonMap {
    if raw.trim().is_empty() {
        return JsonMap::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(arguments)) => arguments,
        _ => {
            let mut arguments = JsonMap::new();
            arguments.insert("raw".into(), json!(raw));
            arguments
        }
    }
}
