// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Tool-calling strategies
//!
//! A strategy wraps every model call: `prepare` rewrites the outgoing
//! conversation and tool list, `interpret` rewrites the reply.
//! [`NativeStrategy`] is a passthrough for models with function calling;
//! [`PromptedStrategy`] teaches the ReAct text format to models without it.

use crate::application::react::{react_prompt, ReActParser};
use crate::domain::capability::{CapabilityRegistry};
use crate::domain::llm::ModelConfig;
use crate::domain::message::{CanonicalMessage, ToolSchema};
use std::sync::Arc;

pub trait ToolCallingStrategy: Send + Sync {
    fn prepare(
        &self,
        messages: Vec<CanonicalMessage>,
        tools: Option<Vec<ToolSchema>>,
    ) -> (Vec<CanonicalMessage>, Option<Vec<ToolSchema>>);

    fn interpret(&self, reply: CanonicalMessage) -> CanonicalMessage;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeStrategy;

impl ToolCallingStrategy for NativeStrategy {
    fn prepare(
        &self,
        messages: Vec<CanonicalMessage>,
        tools: Option<Vec<ToolSchema>>,
    ) -> (Vec<CanonicalMessage>, Option<Vec<ToolSchema>>) {
        (messages, tools)
    }

    fn interpret(&self, reply: CanonicalMessage) -> CanonicalMessage {
        reply
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptedStrategy {
    parser: ReActParser,
}

impl ToolCallingStrategy for PromptedStrategy {
    fn prepare(
        &self,
        messages: Vec<CanonicalMessage>,
        tools: Option<Vec<ToolSchema>>,
    ) -> (Vec<CanonicalMessage>, Option<Vec<ToolSchema>>) {
        let tools = match tools {
            Some(tools) if !tools.is_empty() => tools,
            _ => return (messages, None),
        };

        let mut prepared = Vec::with_capacity(messages.len() + 1);
        prepared.push(CanonicalMessage::system(react_prompt(&tools)));
        prepared.extend(messages);
        (prepared, None)
    }

    fn interpret(&self, reply: CanonicalMessage) -> CanonicalMessage {
        let text = reply.text();
        if text.is_empty() {
            return reply;
        }

        let parsed = self.parser.parse(&text);
        if let Some(call) = parsed.tool_call {
            return reply.with_tool_calls(vec![call]);
        }
        match parsed.final_answer {
            Some(answer) if !answer.is_empty() => {
                CanonicalMessage::assistant(answer).with_metadata(reply.metadata)
            }
            _ => reply,
        }
    }
}

/// Pick the strategy for `config`.
///
/// An explicit override wins; otherwise native tools when the resolved
/// capability profile supports them, the ReAct polyfill when it does not.
pub fn select_strategy(
    registry: &CapabilityRegistry,
    config: &ModelConfig,
    explicit: Option<Arc<dyn ToolCallingStrategy>>,
) -> Arc<dyn ToolCallingStrategy> {
    if let Some(strategy) = explicit {
        return strategy;
    }
    if registry.resolve(config).supports_native_tools {
        Arc::new(NativeStrategy)
    } else {
        Arc::new(PromptedStrategy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::Role;
    use serde_json::json;

    fn tools() -> Option<Vec<ToolSchema>> {
        Some(vec![ToolSchema::function("search", "Search", None)])
    }

    #[test]
    fn test_native_is_passthrough() {
        let (messages, tools) = NativeStrategy.prepare(vec![CanonicalMessage::user("hi")], tools());
        assert_eq!(messages.len(), 1);
        assert_eq!(tools.unwrap().len(), 1);
    }

    #[test]
    fn test_prompted_prepends_system_and_strips_tools() {
        let strategy = PromptedStrategy::default();
        let (messages, tools) = strategy.prepare(vec![CanonicalMessage::user("hi")], tools());
        assert!(tools.is_none());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].text().contains("- search: Search"));

        let (messages, tools) = strategy.prepare(vec![CanonicalMessage::user("hi")], Some(vec![]));
        assert_eq!(messages.len(), 1);
        assert!(tools.is_none());
    }

    #[test]
    fn test_prompted_interpret_tool_call() {
        let reply = CanonicalMessage::assistant("Thought: x\nAction: search\nAction Input: {\"q\": 1}");
        let reply = PromptedStrategy::default().interpret(reply);
        let calls = reply.tool_calls.unwrap();
        assert_eq!(calls[0].name, "search");
        assert_eq!(calls[0].arguments.get("q"), Some(&json!(1)));
    }

    #[test]
    fn test_prompted_interpret_final_answer() {
        let reply = CanonicalMessage::assistant("Thought: ok\nFinal Answer: 42");
        let reply = PromptedStrategy::default().interpret(reply);
        assert_eq!(reply.text(), "42");
        assert!(reply.tool_calls.is_none());
    }

    #[test]
    fn test_select_strategy() {
        let registry = CapabilityRegistry::with_known_models();
        let native = select_strategy(&registry, &ModelConfig::new("openai/gpt-4o"), None);
        let (_, offered) = native.prepare(vec![], tools());
        assert!(offered.is_some());

        let prompted = select_strategy(&registry, &ModelConfig::new("ollama/tinyllama"), None);
        let (_, offered) = prompted.prepare(vec![], tools());
        assert!(offered.is_none());

        let forced = select_strategy(
            &registry,
            &ModelConfig::new("ollama/tinyllama"),
            Some(Arc::new(NativeStrategy)),
        );
        let (_, offered) = forced.prepare(vec![], tools());
        assert!(offered.is_some());
    }
}
