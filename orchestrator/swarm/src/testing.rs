// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use conclave_core::domain::agent::{Agent, AgentError};
use conclave_core::domain::board::{ContextSlice, JsonMap, StateDelta, TraceEntry};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Replies with its scripted texts in turn, repeating the last one.
pub struct ScriptedAgent {
    name: String,
    responses: Vec<String>,
    publish: Vec<Value>,
    fail: bool,
    calls: AtomicUsize,
    contexts: Mutex<Vec<ContextSlice>>,
}

impl ScriptedAgent {
    pub fn new<I, S>(name: &str, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            responses: responses.into_iter().map(Into::into).collect(),
            publish: Vec::new(),
            fail: false,
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name, Vec::<String>::new())
        }
    }

    /// `_publish` entries emitted on the first call only.
    pub fn publishing(mut self, entries: Vec<Value>) -> Self {
        self.publish = entries;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<ContextSlice> {
        self.contexts.lock().clone()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn step(&self, context: ContextSlice) -> Result<StateDelta, AgentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().push(context);
        if self.fail {
            return Err(AgentError::Remote(format!("{} is broken", self.name)));
        }

        let text = self
            .responses
            .get(call)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_default();

        let mut data = JsonMap::new();
        data.insert("text".into(), json!(text));
        data.insert("has_tool_calls".into(), json!(false));
        let mut delta = StateDelta::trace(TraceEntry::new(&self.name, "generate").with_data(data))
            .with_artifact("last_response", json!({ self.name.as_str(): text }));
        if call == 0 && !self.publish.is_empty() {
            delta = delta.with_artifact("_publish", Value::Array(self.publish.clone()));
        }
        Ok(delta)
    }
}
