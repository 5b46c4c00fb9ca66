// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! ReAct prompt polyfill
//!
//! Models without native tool calling are taught the
//! `Thought / Action / Action Input / Final Answer` format through a system
//! prompt ([`react_prompt`]) and their free-form reply is turned back into a
//! structured [`ToolCall`] by [`ReActParser`].

use crate::domain::board::JsonMap;
use crate::domain::message::{ToolCall, ToolSchema};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action:[ \t]*(.+)").expect("action pattern is valid"));
static ACTION_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action Input:\s*(.+)").expect("action input pattern is valid")
});
static FINAL_ANSWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Final Answer:\s*(.+)").expect("final answer pattern is valid")
});

const PREAMBLE: &str = "You have access to the following tools:";

const INSTRUCTIONS: &str = "\
To use a tool, respond with EXACTLY this format:

Thought: <your reasoning about what to do next>
Action: <tool_name>
Action Input: <JSON object with the tool arguments>

After the tool runs you will receive an Observation with the result.
You may repeat the Thought/Action/Action Input cycle as many times as needed.

When you have enough information to answer the user, respond with:

Thought: <your final reasoning>
Final Answer: <your response to the user>

IMPORTANT:
- Always start with a Thought.
- Use EXACTLY the tool names listed above.
- Action Input MUST be valid JSON.
- Do NOT wrap your answer in any other format.";

/// Build the ReAct system prompt describing `tools`.
pub fn react_prompt(tools: &[ToolSchema]) -> String {
    let tool_list = tools
        .iter()
        .map(|tool| {
            let description = if tool.function.description.is_empty() {
                "No description provided."
            } else {
                tool.function.description.as_str()
            };
            let parameters = serde_json::to_string_pretty(&tool.function.parameters)
                .unwrap_or_else(|_| "{}".to_string());
            format!("- {}: {}\n  Parameters: {}", tool.name(), description, parameters)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{PREAMBLE}\n\n{tool_list}\n\n{INSTRUCTIONS}")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReActParseResult {
    pub thought: Option<String>,
    pub tool_call: Option<ToolCall>,
    pub final_answer: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReActParser;

impl ReActParser {
    /// Parse ReAct-formatted text.
    ///
    /// `Final Answer:` wins over `Action:` when both appear. Text matching
    /// neither degrades to the trimmed text as the final answer.
    pub fn parse(&self, text: &str) -> ReActParseResult {
        let thought = extract_thought(text);

        if let Some(caps) = FINAL_ANSWER.captures(text) {
            return ReActParseResult {
                thought,
                tool_call: None,
                final_answer: Some(caps[1].trim().to_string()),
            };
        }

        if let Some(caps) = ACTION.captures(text) {
            let name = caps[1].trim().to_string();
            return ReActParseResult {
                thought,
                tool_call: Some(ToolCall::new(name, extract_arguments(text))),
                final_answer: None,
            };
        }

        ReActParseResult {
            thought,
            tool_call: None,
            final_answer: Some(text.trim().to_string()),
        }
    }
}

/// Text after `Thought:` up to the next `Action:` / `Final Answer:` line.
fn extract_thought(text: &str) -> Option<String> {
    let start = text.find("Thought:")? + "Thought:".len();
    let rest = &text[start..];
    let end = ["\nAction:", "\nFinal Answer:"]
        .iter()
        .filter_map(|marker| rest.find(marker))
        .min()
        .unwrap_or(rest.len());
    let thought = rest[..end].trim();
    (!thought.is_empty()).then(|| thought.to_string())
}

fn extract_arguments(text: &str) -> JsonMap {
    let Some(caps) = ACTION_INPUT.captures(text) else {
        return JsonMap::new();
    };
    let raw = caps[1].trim();
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(arguments)) => arguments,
        _ => {
            let mut arguments = JsonMap::new();
            arguments.insert("input".to_string(), Value::String(raw.to_string()));
            arguments
        }
    }
}
