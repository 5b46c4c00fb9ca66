// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::sandbox::{ExecutionRequest, SandboxConfig, SandboxError, SandboxExecutor, SandboxResult};
use crate::infrastructure::sandbox::merge_env;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

/// Runs commands directly on the host. There is no isolation at all.
pub struct LocalSandbox {
    config: SandboxConfig,
}

impl LocalSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        warn!("LocalSandbox executes commands directly on the host with NO isolation; use DockerSandbox for untrusted code");
        Self { config }
    }
}

#[async_trait]
impl SandboxExecutor for LocalSandbox {
    async fn execute(&self, request: ExecutionRequest) -> Result<SandboxResult, SandboxError> {
        let Some((program, args)) = request.command.split_first() else {
            return Err(SandboxError::Failed("empty command".to_string()));
        };
        warn!(command = ?request.command, "LocalSandbox: executing on host (UNSANDBOXED)");

        let timeout = request.timeout.unwrap_or(self.config.timeout);

        let mut child = Command::new(program)
            .args(args)
            .envs(merge_env(&self.config.env, &request.env))
            .stdin(if request.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::Failed(format!("failed to spawn '{program}': {e}")))?;

        let stdin = child.stdin.take();
        let input = request.stdin.clone();
        let feed = async move {
            if let (Some(input), Some(mut stdin)) = (input, stdin) {
                match stdin.write_all(input.as_bytes()).await {
                    // the child exited without reading all of its input
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
                // dropping stdin signals EOF to the child
            }
            Ok::<(), std::io::Error>(())
        };
        // stdin is fed while stdout and stderr drain, so neither side can
        // block on a full pipe outside the timeout
        let run = async {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed.map_err(|e| SandboxError::Failed(format!("failed to write stdin: {e}")))?;
            output.map_err(|e| SandboxError::Failed(e.to_string()))
        };

        // on timeout the child is dropped and killed
        let output = match tokio::time::timeout(timeout, run).await {
            Ok(result) => result?,
            Err(_) => return Err(SandboxError::Timeout(timeout)),
        };

        Ok(SandboxResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
            metadata: Default::default(),
        })
    }
}
