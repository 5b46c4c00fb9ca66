// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Tool Dispatcher
//!
//! Aggregates [`ToolProvider`]s behind one name-indexed registry and routes
//! [`ToolCall`]s to the provider that owns the tool.
//!
//! Registration happens during assembly, before any execution traffic. When
//! two providers expose the same tool name the last registration wins.

use crate::domain::board::JsonMap;
use crate::domain::message::{ToolCall, ToolResult, ToolSchema};
use crate::domain::tool::{ToolError, ToolProvider};
use async_trait::async_trait;
use futures::future::try_join_all;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Common surface of [`ToolDispatcher`] and the policy-gated wrapper.
#[async_trait]
pub trait ToolDispatch: Send + Sync {
    async fn register(&self, provider: Arc<dyn ToolProvider>) -> Result<(), ToolError>;

    fn all_tools(&self) -> Vec<ToolSchema>;

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError>;

    /// Execute `calls`, returning results in input order.
    ///
    /// The first failing call aborts the batch.
    async fn execute_all(&self, calls: &[ToolCall]) -> Result<Vec<ToolResult>, ToolError>;
}

#[derive(Default)]
struct Registry {
    providers: Vec<Arc<dyn ToolProvider>>,
    routes: HashMap<String, Arc<dyn ToolProvider>>,
    schemas: Vec<ToolSchema>,
}

#[derive(Default)]
pub struct ToolDispatcher {
    registry: RwLock<Registry>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.registry.read().routes.contains_key(name)
    }

    /// Close every registered provider. Failures are logged, not returned.
    pub async fn close_all(&self) {
        let providers: Vec<Arc<dyn ToolProvider>> = self.registry.read().providers.clone();
        for provider in providers {
            if let Err(e) = provider.close().await {
                warn!(error = %e, "Failed to close tool provider");
            }
        }
    }

    fn route(&self, name: &str) -> Option<Arc<dyn ToolProvider>> {
        self.registry.read().routes.get(name).cloned()
    }
}

#[async_trait]
impl ToolDispatch for ToolDispatcher {
    async fn register(&self, provider: Arc<dyn ToolProvider>) -> Result<(), ToolError> {
        let schemas = provider.discover_tools().await?;

        let mut registry = self.registry.write();
        for schema in schemas {
            let name = schema.name().to_string();
            if registry.routes.insert(name.clone(), provider.clone()).is_some() {
                debug!(tool = %name, "Tool re-registered, last provider wins");
                registry.schemas.retain(|existing| existing.name() != name);
            }
            registry.schemas.push(schema);
        }
        registry.providers.push(provider);
        Ok(())
    }

    fn all_tools(&self) -> Vec<ToolSchema> {
        self.registry.read().schemas.clone()
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let Some(provider) = self.route(&call.name) else {
            metrics::counter!("conclave_tool_calls_total", "tool" => call.name.clone(), "outcome" => "not_found")
                .increment(1);
            return Err(ToolError::NotFound(call.name.clone()));
        };

        debug!(tool = %call.name, call_id = %call.id, "Executing tool");
        let arguments: JsonMap = call.arguments.clone();
        match provider.execute_tool(&call.name, arguments).await {
            Ok(mut result) => {
                result.tool_call_id = call.id.clone();
                metrics::counter!("conclave_tool_calls_total", "tool" => call.name.clone(), "outcome" => "ok")
                    .increment(1);
                Ok(result)
            }
            Err(e) => {
                metrics::counter!("conclave_tool_calls_total", "tool" => call.name.clone(), "outcome" => e.outcome())
                    .increment(1);
                Err(e)
            }
        }
    }

    async fn execute_all(&self, calls: &[ToolCall]) -> Result<Vec<ToolResult>, ToolError> {
        try_join_all(calls.iter().map(|call| self.execute(call))).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory provider that echoes its own label and records call order.
    pub(crate) struct EchoProvider {
        pub label: &'static str,
        pub tools: Vec<&'static str>,
        pub delay: Duration,
        pub started: AtomicUsize,
        pub max_in_flight: AtomicUsize,
        pub in_flight: AtomicUsize,
        pub closed: AtomicBool,
    }

    impl EchoProvider {
        pub(crate) fn new(label: &'static str, tools: Vec<&'static str>) -> Self {
            Self {
                label,
                tools,
                delay: Duration::ZERO,
                started: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl ToolProvider for EchoProvider {
        async fn discover_tools(&self) -> Result<Vec<ToolSchema>, ToolError> {
            Ok(self
                .tools
                .iter()
                .map(|name| ToolSchema::function(*name, self.label, None))
                .collect())
        }

        async fn execute_tool(&self, name: &str, arguments: JsonMap) -> Result<ToolResult, ToolError> {
            if name == "boom" {
                return Err(ToolError::ExecutionFailed {
                    tool: name.to_string(),
                    detail: "exploded".to_string(),
                });
            }
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let value = arguments.get("value").cloned().unwrap_or(json!(null));
            Ok(ToolResult::from_text("ignored", format!("{}:{}:{}", self.label, name, value)))
        }

        async fn close(&self) -> Result<(), ToolError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn call(name: &str, value: i64) -> ToolCall {
        let mut arguments = JsonMap::new();
        arguments.insert("value".into(), json!(value));
        ToolCall::new(name, arguments)
    }

    #[tokio::test]
    async fn test_register_and_execute_sets_call_id() {
        let dispatcher = ToolDispatcher::new();
        dispatcher
            .register(Arc::new(EchoProvider::new("p1", vec!["add", "sub"])))
            .await
            .unwrap();

        assert_eq!(dispatcher.all_tools().len(), 2);
        let call = call("add", 3);
        let result = dispatcher.execute(&call).await.unwrap();
        assert_eq!(result.tool_call_id, call.id);
        assert_eq!(result.text(), "p1:add:3");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let dispatcher = ToolDispatcher::new();
        let err = dispatcher.execute(&call("missing", 0)).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let dispatcher = ToolDispatcher::new();
        dispatcher.register(Arc::new(EchoProvider::new("first", vec!["x", "y"]))).await.unwrap();
        dispatcher.register(Arc::new(EchoProvider::new("second", vec!["x"]))).await.unwrap();

        let tools = dispatcher.all_tools();
        assert_eq!(tools.len(), 2);
        assert_eq!(
            tools.iter().find(|t| t.name() == "x").unwrap().function.description,
            "second"
        );
        assert_eq!(dispatcher.execute(&call("x", 1)).await.unwrap().text(), "second:x:1");
        assert_eq!(dispatcher.execute(&call("y", 1)).await.unwrap().text(), "first:y:1");
    }

    #[tokio::test]
    async fn test_execute_all_preserves_order_and_runs_concurrently() {
        let provider = Arc::new(EchoProvider::new("p", vec!["t"]).with_delay(Duration::from_millis(20)));
        let dispatcher = ToolDispatcher::new();
        dispatcher.register(provider.clone()).await.unwrap();

        let calls = vec![call("t", 1), call("t", 5), call("t", 10)];
        let results = dispatcher.execute_all(&calls).await.unwrap();
        let texts: Vec<String> = results.iter().map(ToolResult::text).collect();
        assert_eq!(texts, vec!["p:t:1", "p:t:5", "p:t:10"]);
        for (result, call) in results.iter().zip(&calls) {
            assert_eq!(result.tool_call_id, call.id);
        }
        assert!(provider.max_in_flight.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_execute_all_fails_on_first_error() {
        let dispatcher = ToolDispatcher::new();
        dispatcher.register(Arc::new(EchoProvider::new("p", vec!["t", "boom"]))).await.unwrap();
        let err = dispatcher
            .execute_all(&[call("t", 1), call("boom", 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn test_close_all() {
        let provider = Arc::new(EchoProvider::new("p", vec!["t"]));
        let dispatcher = ToolDispatcher::new();
        dispatcher.register(provider.clone()).await.unwrap();
        dispatcher.close_all().await;
        assert!(provider.closed.load(Ordering::SeqCst));
    }
}
