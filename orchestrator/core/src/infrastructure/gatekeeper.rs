// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Gatekeeper implementations
//!
//! [`CliGatekeeper`] prompts on the terminal and waits (bounded) for a
//! `y/N` answer. [`AutoApproveGatekeeper`] approves everything and is meant
//! for tests and trusted automation.
//!
//! The prompt and the answer both go through async handles, so a timed-out
//! read is dropped with the rest of the request. The input reader is shared
//! between requests: a line typed after a timeout answers the next prompt.

use crate::domain::gatekeeper::{ApprovalRequest, ApprovalResult, Gatekeeper};
use crate::domain::tool::ToolError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{info, warn};

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApproveGatekeeper;

#[async_trait]
impl Gatekeeper for AutoApproveGatekeeper {
    async fn request_approval(&self, request: ApprovalRequest) -> Result<ApprovalResult, ToolError> {
        info!(tool = %request.tool_name, "Auto-approving tool call");
        Ok(ApprovalResult::approved("auto-approved"))
    }
}

type Input = Box<dyn AsyncBufRead + Send + Unpin>;
type Output = Box<dyn AsyncWrite + Send + Unpin>;

struct Terminal {
    input: Input,
    output: Output,
}

/// Interactive terminal approval.
#[derive(Clone)]
pub struct CliGatekeeper {
    timeout: Duration,
    terminal: Arc<Mutex<Terminal>>,
}

impl fmt::Debug for CliGatekeeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliGatekeeper")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CliGatekeeper {
    /// Prompts on stdout and reads answers from stdin.
    pub fn new(timeout: Duration) -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), timeout)
    }

    pub fn with_io(
        input: impl AsyncBufRead + Send + Unpin + 'static,
        output: impl AsyncWrite + Send + Unpin + 'static,
        timeout: Duration,
    ) -> Self {
        Self {
            timeout,
            terminal: Arc::new(Mutex::new(Terminal {
                input: Box::new(input),
                output: Box::new(output),
            })),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn ask(&self, prompt: &str) -> std::io::Result<String> {
        let mut terminal = self.terminal.lock().await;
        terminal.output.write_all(prompt.as_bytes()).await?;
        terminal.output.flush().await?;
        let mut line = String::new();
        terminal.input.read_line(&mut line).await?;
        Ok(line)
    }
}

#[async_trait]
impl Gatekeeper for CliGatekeeper {
    async fn request_approval(&self, request: ApprovalRequest) -> Result<ApprovalResult, ToolError> {
        let prompt = format_prompt(&request);

        let answer = match tokio::time::timeout(self.timeout, self.ask(&prompt)).await {
            Err(_) => {
                warn!(tool = %request.tool_name, timeout = ?self.timeout, "Approval timed out");
                return Err(ToolError::ApprovalTimeout {
                    tool: request.tool_name,
                    timeout: self.timeout,
                });
            }
            Ok(Err(io_error)) => {
                return Err(ToolError::ExecutionFailed {
                    tool: request.tool_name,
                    detail: format!("failed to read approval: {io_error}"),
                })
            }
            Ok(Ok(line)) => line,
        };

        if is_affirmative(&answer) {
            Ok(ApprovalResult::approved(""))
        } else {
            Ok(ApprovalResult::denied("denied by user"))
        }
    }
}

/// Summary shown before asking for approval.
pub fn format_prompt(request: &ApprovalRequest) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let mut out = format!("\n{rule}\nTool: {}\n", request.tool_name);
    if !request.arguments.is_empty() {
        let arguments = serde_json::to_string_pretty(&request.arguments)
            .unwrap_or_else(|_| format!("{:?}", request.arguments));
        out.push_str(&format!("Arguments: {arguments}\n"));
    }
    if !request.reason.is_empty() {
        out.push_str(&format!("Reason: {}\n", request.reason));
    }
    out.push_str(&format!("{rule}\nApprove? [y/N]: "));
    out
}

fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
