// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::agent::{McpServerRef, McpTransportKind};
use crate::domain::board::JsonMap;
use crate::domain::message::{empty_parameters, ToolResult, ToolSchema};
use crate::domain::tool::{ToolError, ToolProvider};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::transport::{McpTransport, StdioTransport, WebSocketTransport};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct McpToolDef {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "inputSchema", default)]
    input_schema: Option<Value>,
}

/// Build the transport named by a server reference.
pub fn create_transport(server: &McpServerRef) -> Result<Box<dyn McpTransport>, ToolError> {
    match server.transport {
        McpTransportKind::Stdio => {
            let command = server.command.as_deref().filter(|c| !c.trim().is_empty()).ok_or_else(|| {
                ToolError::Connection(format!("MCP server '{}' uses stdio but has no 'command'", server.name))
            })?;
            Ok(Box::new(StdioTransport::new(command, server.env.clone())))
        }
        McpTransportKind::Websocket => {
            let url = server.url.as_deref().filter(|u| !u.trim().is_empty()).ok_or_else(|| {
                ToolError::Connection(format!("MCP server '{}' uses websocket but has no 'url'", server.name))
            })?;
            Ok(Box::new(WebSocketTransport::new(url)))
        }
    }
}

/// JSON-RPC 2.0 client for one MCP server, exposed as a [`ToolProvider`].
///
/// One request is in flight at a time; the transport lock covers the
/// send and the wait for the matching response.
pub struct McpClient {
    name: String,
    transport: Mutex<Box<dyn McpTransport>>,
    connected: AtomicBool,
    next_id: AtomicU64,
    tools: RwLock<HashSet<String>>,
    request_timeout: Duration,
}

impl McpClient {
    pub fn new(server: &McpServerRef) -> Result<Self, ToolError> {
        Ok(Self::with_transport(server.name.clone(), create_transport(server)?))
    }

    pub fn with_transport(name: impl Into<String>, transport: Box<dyn McpTransport>) -> Self {
        Self {
            name: name.into(),
            transport: Mutex::new(transport),
            connected: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            tools: RwLock::new(HashSet::new()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Open the transport and run the `initialize` handshake.
    pub async fn connect(&self) -> Result<(), ToolError> {
        self.transport.lock().await.connect().await?;
        self.connected.store(true, Ordering::SeqCst);

        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {"name": "conclave", "version": env!("CARGO_PKG_VERSION")},
                }),
            )
            .await?;
        self.notify("notifications/initialized").await?;

        let protocol = result
            .get("protocolVersion")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown");
        info!(server = %self.name, protocol = %protocol, "MCP session initialized");
        Ok(())
    }

    async fn notify(&self, method: &str) -> Result<(), ToolError> {
        let message = json!({"jsonrpc": "2.0", "method": method});
        self.transport.lock().await.send(&message).await
    }

    /// Send a request and wait for the response carrying the same id.
    /// Returns the `result` member; a JSON-RPC error becomes `ExecutionFailed`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ToolError> {
        if !self.is_connected() {
            return Err(ToolError::Connection(format!("MCP server '{}' is not connected", self.name)));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let message = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});

        let mut transport = self.transport.lock().await;
        let exchange = async {
            transport.send(&message).await?;
            loop {
                let raw = transport.receive().await?;
                if raw.get("id").and_then(Value::as_u64) == Some(id) && raw.get("method").is_none() {
                    return Ok::<Value, ToolError>(raw);
                }
                debug!(server = %self.name, message = %raw, "Skipping unrelated MCP message");
            }
        };
        let raw = tokio::time::timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| {
                ToolError::Connection(format!(
                    "MCP server '{}' did not answer '{method}' within {:?}",
                    self.name, self.request_timeout
                ))
            })??;
        drop(transport);

        let response: JsonRpcResponse = serde_json::from_value(raw)
            .map_err(|e| ToolError::Connection(format!("malformed JSON-RPC response: {e}")))?;
        if let Some(error) = response.error {
            return Err(ToolError::ExecutionFailed {
                tool: method.to_string(),
                detail: format!("{} (code {})", error.message, error.code),
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

fn extract_text(result: &Value) -> String {
    let parts: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .map(|item| item.get("text").and_then(Value::as_str).unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();

    if parts.is_empty() {
        result.to_string()
    } else {
        parts.join("\n")
    }
}

#[async_trait]
impl ToolProvider for McpClient {
    async fn discover_tools(&self) -> Result<Vec<ToolSchema>, ToolError> {
        let result = self.request("tools/list", json!({})).await?;
        let raw_tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        let defs: Vec<McpToolDef> = serde_json::from_value(raw_tools)
            .map_err(|e| ToolError::Connection(format!("malformed tools/list result: {e}")))?;

        let mut known = self.tools.write();
        known.clear();
        let schemas = defs
            .into_iter()
            .map(|def| {
                known.insert(def.name.clone());
                ToolSchema::function(def.name, def.description, Some(def.input_schema.unwrap_or_else(empty_parameters)))
            })
            .collect::<Vec<_>>();

        info!(server = %self.name, tools = schemas.len(), "Discovered MCP tools");
        Ok(schemas)
    }

    async fn execute_tool(&self, name: &str, arguments: JsonMap) -> Result<ToolResult, ToolError> {
        if !self.tools.read().contains(name) {
            return Err(ToolError::NotFound(name.to_string()));
        }

        let result = self
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await
            .map_err(|e| match e {
                ToolError::ExecutionFailed { detail, .. } => ToolError::ExecutionFailed {
                    tool: name.to_string(),
                    detail,
                },
                other => other,
            })?;

        let text = extract_text(&result);
        if result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
            Ok(ToolResult::error("", text))
        } else {
            Ok(ToolResult::from_text("", text))
        }
    }

    async fn close(&self) -> Result<(), ToolError> {
        self.connected.store(false, Ordering::SeqCst);
        self.transport.lock().await.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    type Responder = Box<dyn Fn(&str, &Value) -> Value + Send + Sync>;

    /// Answers each request through `respond`, echoing the request id.
    struct MockTransport {
        sent: Arc<parking_lot::Mutex<Vec<Value>>>,
        inbox: VecDeque<Value>,
        respond: Responder,
        fail_connect: bool,
    }

    impl MockTransport {
        fn new(respond: impl Fn(&str, &Value) -> Value + Send + Sync + 'static) -> Self {
            Self {
                sent: Arc::default(),
                inbox: VecDeque::new(),
                respond: Box::new(respond),
                fail_connect: false,
            }
        }
    }

    #[async_trait]
    impl McpTransport for MockTransport {
        async fn connect(&mut self) -> Result<(), ToolError> {
            if self.fail_connect {
                return Err(ToolError::Connection("refused".into()));
            }
            Ok(())
        }

        async fn send(&mut self, message: &Value) -> Result<(), ToolError> {
            self.sent.lock().push(message.clone());
            if let (Some(id), Some(method)) = (message.get("id"), message["method"].as_str()) {
                // a server-side notification arrives before the answer
                self.inbox.push_back(json!({"jsonrpc": "2.0", "method": "notifications/progress"}));
                let mut reply = (self.respond)(method, &message["params"]);
                reply["jsonrpc"] = json!("2.0");
                reply["id"] = id.clone();
                self.inbox.push_back(reply);
            }
            Ok(())
        }

        async fn receive(&mut self) -> Result<Value, ToolError> {
            self.inbox
                .pop_front()
                .ok_or_else(|| ToolError::Connection("nothing to receive".into()))
        }

        async fn close(&mut self) -> Result<(), ToolError> {
            Ok(())
        }
    }

    fn filesystem_server(method: &str, params: &Value) -> Value {
        match method {
            "initialize" => json!({"result": {"protocolVersion": PROTOCOL_VERSION, "capabilities": {}}}),
            "tools/list" => json!({"result": {"tools": [
                {"name": "read_file", "description": "Read a file",
                 "inputSchema": {"type": "object", "properties": {"path": {"type": "string"}}}},
                {"name": "list_dir"},
            ]}}),
            "tools/call" => match params["name"].as_str() {
                Some("read_file") => json!({"result": {"content": [
                    {"type": "text", "text": "line one"},
                    {"type": "image", "data": "..."},
                    {"type": "text", "text": "line two"},
                ]}}),
                Some("list_dir") => json!({"result": {"entries": 2}}),
                _ => json!({"error": {"code": -32602, "message": "bad arguments"}}),
            },
            _ => json!({"error": {"code": -32601, "message": "method not found"}}),
        }
    }

    async fn connected_client() -> (McpClient, Arc<parking_lot::Mutex<Vec<Value>>>) {
        let transport = MockTransport::new(filesystem_server);
        let sent = transport.sent.clone();
        let client = McpClient::with_transport("fs", Box::new(transport));
        client.connect().await.unwrap();
        (client, sent)
    }

    // ── Handshake ──

    #[tokio::test]
    async fn test_connect_sends_initialize_then_initialized() {
        let (client, sent) = connected_client().await;
        assert!(client.is_connected());

        let sent = sent.lock();
        assert_eq!(sent[0]["method"], "initialize");
        assert_eq!(sent[0]["id"], 1);
        assert_eq!(sent[0]["params"]["protocolVersion"], "2024-11-05");
        assert_eq!(sent[0]["params"]["clientInfo"]["name"], "conclave");
        assert_eq!(sent[1]["method"], "notifications/initialized");
        assert!(sent[1].get("id").is_none());
    }

    #[tokio::test]
    async fn test_connect_tolerates_missing_protocol_version() {
        let transport = MockTransport::new(|method, params| match method {
            "initialize" => json!({"result": {"capabilities": {}}}),
            _ => filesystem_server(method, params),
        });
        let client = McpClient::with_transport("fs", Box::new(transport));
        client.connect().await.unwrap();
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let mut transport = MockTransport::new(filesystem_server);
        transport.fail_connect = true;
        let client = McpClient::with_transport("fs", Box::new(transport));
        assert!(matches!(client.connect().await, Err(ToolError::Connection(_))));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_requests_before_connect_fail() {
        let client = McpClient::with_transport("fs", Box::new(MockTransport::new(filesystem_server)));
        assert!(matches!(client.discover_tools().await, Err(ToolError::Connection(_))));
    }

    // ── Tools ──

    #[tokio::test]
    async fn test_discover_tools() {
        let (client, _) = connected_client().await;
        let tools = client.discover_tools().await.unwrap();

        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name(), "read_file");
        assert_eq!(tools[0].function.description, "Read a file");
        assert_eq!(tools[0].function.parameters["properties"]["path"]["type"], "string");
        assert_eq!(tools[1].function.parameters, empty_parameters());
    }

    #[tokio::test]
    async fn test_execute_joins_text_content() {
        let (client, sent) = connected_client().await;
        client.discover_tools().await.unwrap();

        let mut arguments = JsonMap::new();
        arguments.insert("path".into(), json!("/tmp/x"));
        let result = client.execute_tool("read_file", arguments).await.unwrap();

        assert_eq!(result.text(), "line one\nline two");
        assert!(!result.is_error);
        let call = sent.lock().last().cloned().unwrap();
        assert_eq!(call["params"]["arguments"]["path"], "/tmp/x");
    }

    #[tokio::test]
    async fn test_execute_without_text_uses_raw_result() {
        let (client, _) = connected_client().await;
        client.discover_tools().await.unwrap();
        let result = client.execute_tool("list_dir", JsonMap::new()).await.unwrap();
        assert_eq!(result.text(), r#"{"entries":2}"#);
    }

    #[tokio::test]
    async fn test_execute_undiscovered_tool() {
        let (client, _) = connected_client().await;
        let err = client.execute_tool("read_file", JsonMap::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "read_file"));
    }

    #[tokio::test]
    async fn test_execute_rpc_error() {
        let transport = MockTransport::new(|method, params| match method {
            "tools/call" => json!({"error": {"code": -32000, "message": "disk full"}}),
            _ => filesystem_server(method, params),
        });
        let client = McpClient::with_transport("fs", Box::new(transport));
        client.connect().await.unwrap();
        client.discover_tools().await.unwrap();

        let err = client.execute_tool("read_file", JsonMap::new()).await.unwrap_err();
        match err {
            ToolError::ExecutionFailed { tool, detail } => {
                assert_eq!(tool, "read_file");
                assert!(detail.contains("disk full"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_disconnects() {
        let (client, _) = connected_client().await;
        client.close().await.unwrap();
        assert!(!client.is_connected());
        assert!(client.discover_tools().await.is_err());
    }

    // ── Transport selection ──

    #[test]
    fn test_create_transport_requires_endpoint() {
        let stdio = McpServerRef {
            name: "fs".into(),
            transport: McpTransportKind::Stdio,
            command: None,
            url: None,
            env: HashMap::new(),
        };
        assert!(matches!(create_transport(&stdio), Err(ToolError::Connection(_))));

        let ws = McpServerRef {
            transport: McpTransportKind::Websocket,
            ..stdio.clone()
        };
        assert!(create_transport(&ws).is_err());

        let ws = McpServerRef {
            url: Some("ws://localhost:9000".into()),
            ..ws
        };
        assert!(create_transport(&ws).is_ok());
    }
}
