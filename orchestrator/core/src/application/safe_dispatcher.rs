// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Policy-gated dispatch
//!
//! [`SafeDispatcher`] decorates a [`ToolDispatcher`] with the
//! [`PolicyEngine`] and an optional [`Gatekeeper`]:
//!
//! | Policy | Behaviour |
//! |--------|-----------|
//! | `allow` | forwarded |
//! | `deny` | `ToolError::ApprovalDenied`, the tool never runs |
//! | `ask` | gatekeeper decides; with no gatekeeper the call is allowed with a warning |
//!
//! Batches run one at a time while a gatekeeper is active so a human never
//! faces concurrent prompts.

use crate::application::dispatcher::{ToolDispatch, ToolDispatcher};
use crate::domain::board::JsonMap;
use crate::domain::gatekeeper::{ApprovalRequest, Gatekeeper, GatekeeperConfig, PolicyAction};
use crate::domain::message::{ToolCall, ToolResult, ToolSchema};
use crate::domain::policy::{PolicyEngine, PolicyError};
use crate::domain::tool::{ToolError, ToolProvider};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SafeDispatcher {
    inner: Arc<ToolDispatcher>,
    engine: PolicyEngine,
    gatekeeper: Option<Arc<dyn Gatekeeper>>,
}

impl SafeDispatcher {
    pub fn new(
        inner: Arc<ToolDispatcher>,
        config: GatekeeperConfig,
        gatekeeper: Option<Arc<dyn Gatekeeper>>,
    ) -> Result<Self, PolicyError> {
        Ok(Self {
            inner,
            engine: PolicyEngine::new(config)?,
            gatekeeper,
        })
    }

    pub fn config(&self) -> &GatekeeperConfig {
        self.engine.config()
    }

    pub fn inner(&self) -> &Arc<ToolDispatcher> {
        &self.inner
    }

    fn is_sequential(&self) -> bool {
        self.engine.config().enabled && self.gatekeeper.is_some()
    }

    async fn authorize(&self, call: &ToolCall) -> Result<(), ToolError> {
        let decision = self.engine.decide(&call.name);
        match decision.action {
            PolicyAction::Allow => Ok(()),
            PolicyAction::Deny => {
                info!(tool = %call.name, "Tool call denied by policy");
                Err(ToolError::ApprovalDenied {
                    tool: call.name.clone(),
                    reason: "denied by policy".to_string(),
                })
            }
            PolicyAction::Ask => {
                let Some(gatekeeper) = &self.gatekeeper else {
                    warn!(
                        tool = %call.name,
                        "Policy requires approval but no gatekeeper is configured, allowing"
                    );
                    return Ok(());
                };

                let mut metadata = JsonMap::new();
                metadata.insert("tool_call_id".to_string(), Value::String(call.id.clone()));
                let request = ApprovalRequest {
                    tool_name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    reason: decision.reason().to_string(),
                    metadata,
                };

                let result = gatekeeper.request_approval(request).await?;
                if result.approved {
                    Ok(())
                } else {
                    info!(tool = %call.name, reason = %result.reason, "Tool call rejected");
                    Err(ToolError::ApprovalDenied {
                        tool: call.name.clone(),
                        reason: result.reason,
                    })
                }
            }
        }
    }
}

#[async_trait]
impl ToolDispatch for SafeDispatcher {
    async fn register(&self, provider: Arc<dyn ToolProvider>) -> Result<(), ToolError> {
        self.inner.register(provider).await
    }

    fn all_tools(&self) -> Vec<ToolSchema> {
        self.inner.all_tools()
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        if let Err(e) = self.authorize(call).await {
            metrics::counter!("conclave_tool_calls_total", "tool" => call.name.clone(), "outcome" => e.outcome())
                .increment(1);
            return Err(e);
        }
        self.inner.execute(call).await
    }

    async fn execute_all(&self, calls: &[ToolCall]) -> Result<Vec<ToolResult>, ToolError> {
        if self.is_sequential() {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.execute(call).await?);
            }
            Ok(results)
        } else {
            try_join_all(calls.iter().map(|call| self.execute(call))).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatcher::tests::EchoProvider;
    use crate::domain::gatekeeper::{ApprovalResult, ToolPolicy};
    use parking_lot::Mutex;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    /// Gatekeeper answering from a fixed verdict and recording requests.
    struct ScriptedGatekeeper {
        approve: bool,
        requests: Mutex<Vec<ApprovalRequest>>,
    }

    impl ScriptedGatekeeper {
        fn new(approve: bool) -> Arc<Self> {
            Arc::new(Self {
                approve,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Gatekeeper for ScriptedGatekeeper {
        async fn request_approval(&self, request: ApprovalRequest) -> Result<ApprovalResult, ToolError> {
            self.requests.lock().push(request);
            Ok(if self.approve {
                ApprovalResult::approved("")
            } else {
                ApprovalResult::denied("denied by user")
            })
        }
    }

    struct SlowGatekeeper;

    #[async_trait]
    impl Gatekeeper for SlowGatekeeper {
        async fn request_approval(&self, request: ApprovalRequest) -> Result<ApprovalResult, ToolError> {
            Err(ToolError::ApprovalTimeout {
                tool: request.tool_name,
                timeout: Duration::from_millis(1),
            })
        }
    }

    async fn dispatcher_with(provider: Arc<EchoProvider>) -> Arc<ToolDispatcher> {
        let dispatcher = Arc::new(ToolDispatcher::new());
        dispatcher.register(provider).await.unwrap();
        dispatcher
    }

    fn config(default_action: PolicyAction, policies: Vec<ToolPolicy>) -> GatekeeperConfig {
        GatekeeperConfig {
            default_action,
            policies,
            ..Default::default()
        }
    }

    fn call(name: &str) -> ToolCall {
        ToolCall::new(name, JsonMap::new())
    }

    // ── Policy outcomes ──

    #[tokio::test]
    async fn test_deny_never_runs_tool() {
        let provider = Arc::new(EchoProvider::new("p", vec!["rm"]));
        let safe = SafeDispatcher::new(
            dispatcher_with(provider.clone()).await,
            config(PolicyAction::Deny, vec![]),
            Some(ScriptedGatekeeper::new(true)),
        )
        .unwrap();

        let err = safe.execute(&call("rm")).await.unwrap_err();
        assert!(matches!(err, ToolError::ApprovalDenied { ref reason, .. } if reason == "denied by policy"));
        assert_eq!(provider.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_approved_runs_and_passes_policy_reason() {
        let gatekeeper = ScriptedGatekeeper::new(true);
        let safe = SafeDispatcher::new(
            dispatcher_with(Arc::new(EchoProvider::new("p", vec!["fs_write"]))).await,
            config(
                PolicyAction::Allow,
                vec![ToolPolicy::new("fs_*", PolicyAction::Ask).with_reason("writes files")],
            ),
            Some(gatekeeper.clone()),
        )
        .unwrap();

        let result = safe.execute(&call("fs_write")).await.unwrap();
        assert_eq!(result.text(), "p:fs_write:null");

        let requests = gatekeeper.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tool_name, "fs_write");
        assert_eq!(requests[0].reason, "writes files");
    }

    #[tokio::test]
    async fn test_ask_rejected_carries_gate_reason() {
        let provider = Arc::new(EchoProvider::new("p", vec!["shell"]));
        let safe = SafeDispatcher::new(
            dispatcher_with(provider.clone()).await,
            config(PolicyAction::Ask, vec![]),
            Some(ScriptedGatekeeper::new(false)),
        )
        .unwrap();

        let err = safe.execute(&call("shell")).await.unwrap_err();
        assert!(matches!(err, ToolError::ApprovalDenied { ref reason, .. } if reason == "denied by user"));
        assert_eq!(provider.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_gate_timeout_propagates() {
        let safe = SafeDispatcher::new(
            dispatcher_with(Arc::new(EchoProvider::new("p", vec!["shell"]))).await,
            config(PolicyAction::Ask, vec![]),
            Some(Arc::new(SlowGatekeeper)),
        )
        .unwrap();
        let err = safe.execute(&call("shell")).await.unwrap_err();
        assert!(matches!(err, ToolError::ApprovalTimeout { .. }));
    }

    #[tokio::test]
    async fn test_ask_without_gatekeeper_fails_open() {
        let safe = SafeDispatcher::new(
            dispatcher_with(Arc::new(EchoProvider::new("p", vec!["shell"]))).await,
            config(PolicyAction::Ask, vec![]),
            None,
        )
        .unwrap();
        assert!(safe.execute(&call("shell")).await.is_ok());
    }

    #[tokio::test]
    async fn test_safe_tools_skip_gate() {
        let gatekeeper = ScriptedGatekeeper::new(false);
        let mut cfg = config(PolicyAction::Ask, vec![]);
        cfg.safe_tools = vec!["read".into()];
        let safe = SafeDispatcher::new(
            dispatcher_with(Arc::new(EchoProvider::new("p", vec!["read"]))).await,
            cfg,
            Some(gatekeeper.clone()),
        )
        .unwrap();
        assert!(safe.execute(&call("read")).await.is_ok());
        assert!(gatekeeper.requests.lock().is_empty());
    }

    // ── Batch scheduling ──

    #[tokio::test]
    async fn test_execute_all_sequential_with_gatekeeper() {
        let provider = Arc::new(EchoProvider::new("p", vec!["t"]).with_delay(Duration::from_millis(10)));
        let safe = SafeDispatcher::new(
            dispatcher_with(provider.clone()).await,
            config(PolicyAction::Allow, vec![]),
            Some(ScriptedGatekeeper::new(true)),
        )
        .unwrap();

        let results = safe.execute_all(&[call("t"), call("t"), call("t")]).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_all_concurrent_without_gatekeeper() {
        let provider = Arc::new(EchoProvider::new("p", vec!["t"]).with_delay(Duration::from_millis(20)));
        let safe = SafeDispatcher::new(
            dispatcher_with(provider.clone()).await,
            config(PolicyAction::Allow, vec![]),
            None,
        )
        .unwrap();

        let calls = vec![call("t"), call("t"), call("t")];
        let results = safe.execute_all(&calls).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.tool_call_id.as_str()).collect();
        let expected: Vec<&str> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, expected);
        assert!(provider.max_in_flight.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_register_and_all_tools_forwarded() {
        let safe = SafeDispatcher::new(
            Arc::new(ToolDispatcher::new()),
            GatekeeperConfig::default(),
            None,
        )
        .unwrap();
        safe.register(Arc::new(EchoProvider::new("p", vec!["a", "b"]))).await.unwrap();
        assert_eq!(safe.all_tools().len(), 2);
        assert!(safe.inner().has_tool("a"));
    }
}
