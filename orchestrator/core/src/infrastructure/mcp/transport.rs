// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// ============================================================================
// MCP Transports
// ============================================================================
// Two wire carriers for JSON-RPC messages:
//
// - StdioTransport: child process, one JSON document per line on stdin/stdout
// - WebSocketTransport: one JSON document per text frame
//
// Transports move raw `serde_json::Value`s only. Request ids, handshakes and
// response matching belong to `McpClient`.
// ============================================================================

use crate::domain::tool::ToolError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

#[async_trait]
pub trait McpTransport: Send {
    async fn connect(&mut self) -> Result<(), ToolError>;

    async fn send(&mut self, message: &Value) -> Result<(), ToolError>;

    /// Wait for the next inbound message.
    async fn receive(&mut self) -> Result<Value, ToolError>;

    async fn close(&mut self) -> Result<(), ToolError>;
}

fn not_connected() -> ToolError {
    ToolError::Connection("transport is not connected".to_string())
}

// ── Stdio ──

pub struct StdioTransport {
    command: String,
    env: HashMap<String, String>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<Lines<BufReader<ChildStdout>>>,
}

impl StdioTransport {
    pub fn new(command: impl Into<String>, env: HashMap<String, String>) -> Self {
        Self {
            command: command.into(),
            env,
            child: None,
            stdin: None,
            stdout: None,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn connect(&mut self) -> Result<(), ToolError> {
        let argv = shell_words::split(&self.command)
            .map_err(|e| ToolError::Connection(format!("invalid command '{}': {e}", self.command)))?;
        let Some((program, args)) = argv.split_first() else {
            return Err(ToolError::Connection("empty MCP server command".to_string()));
        };

        let mut child = Command::new(program)
            .args(args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::Connection(format!("failed to spawn '{program}': {e}")))?;

        let stdin = child.stdin.take().ok_or_else(not_connected)?;
        let stdout = child.stdout.take().ok_or_else(not_connected)?;

        info!(command = %self.command, pid = ?child.id(), "Started MCP server process");
        self.stdin = Some(stdin);
        self.stdout = Some(BufReader::new(stdout).lines());
        self.child = Some(child);
        Ok(())
    }

    async fn send(&mut self, message: &Value) -> Result<(), ToolError> {
        let stdin = self.stdin.as_mut().ok_or_else(not_connected)?;
        let mut line = serde_json::to_string(message)
            .map_err(|e| ToolError::Connection(format!("failed to encode message: {e}")))?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ToolError::Connection(format!("failed to write to MCP server: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| ToolError::Connection(format!("failed to flush MCP server stdin: {e}")))
    }

    async fn receive(&mut self) -> Result<Value, ToolError> {
        let lines = self.stdout.as_mut().ok_or_else(not_connected)?;
        loop {
            let line = lines
                .next_line()
                .await
                .map_err(|e| ToolError::Connection(format!("failed to read from MCP server: {e}")))?
                .ok_or_else(|| ToolError::Connection("MCP server closed its stdout".to_string()))?;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(value) => return Ok(value),
                // servers sometimes log to stdout; skip anything that is not JSON
                Err(e) => debug!(error = %e, line, "Ignoring non-JSON line from MCP server"),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ToolError> {
        // dropping stdin lets well-behaved servers exit on EOF
        self.stdin = None;
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                warn!(command = %self.command, error = %e, "Failed to kill MCP server process");
            }
        }
        Ok(())
    }
}

// ── WebSocket ──

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WebSocketTransport {
    url: String,
    stream: Option<WsStream>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl McpTransport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), ToolError> {
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ToolError::Connection(format!("failed to connect to {}: {e}", self.url)))?;
        info!(url = %self.url, "Connected to MCP server over websocket");
        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, message: &Value) -> Result<(), ToolError> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        let text = serde_json::to_string(message)
            .map_err(|e| ToolError::Connection(format!("failed to encode message: {e}")))?;
        stream
            .send(Message::Text(text))
            .await
            .map_err(|e| ToolError::Connection(format!("websocket send failed: {e}")))
    }

    async fn receive(&mut self) -> Result<Value, ToolError> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        loop {
            let frame = stream
                .next()
                .await
                .ok_or_else(|| ToolError::Connection("websocket closed".to_string()))?
                .map_err(|e| ToolError::Connection(format!("websocket receive failed: {e}")))?;

            let parsed = match frame {
                Message::Text(text) => serde_json::from_str(&text),
                Message::Binary(bytes) => serde_json::from_slice(&bytes),
                Message::Close(_) => return Err(ToolError::Connection("websocket closed by server".to_string())),
                _ => continue,
            };
            return parsed.map_err(|e| ToolError::Connection(format!("invalid JSON frame: {e}")));
        }
    }

    async fn close(&mut self) -> Result<(), ToolError> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                debug!(url = %self.url, error = %e, "Websocket close failed");
            }
        }
        Ok(())
    }
}
