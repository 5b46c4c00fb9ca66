// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::board::new_task_id;
use crate::domain::sandbox::{ExecutionRequest, SandboxConfig, SandboxError, SandboxExecutor, SandboxResult};
use crate::infrastructure::sandbox::merge_env;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Ephemeral container per execution, driven through the `docker` CLI.
///
/// Each execution runs `create`, `start`, `wait` (bounded by the timeout),
/// `logs`, and finally `rm -f` whether or not anything failed.
pub struct DockerSandbox {
    config: SandboxConfig,
    docker_bin: String,
    active: Mutex<HashSet<String>>,
}

struct DockerOutput {
    stdout: String,
    stderr: String,
}

impl DockerSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            docker_bin: "docker".to_string(),
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Use a different CLI binary (`podman`, an absolute path).
    pub fn with_docker_bin(mut self, docker_bin: impl Into<String>) -> Self {
        self.docker_bin = docker_bin.into();
        self
    }

    pub fn active_containers(&self) -> Vec<String> {
        self.active.lock().iter().cloned().collect()
    }

    /// Arguments of the `docker create` invocation (without the binary).
    pub fn create_args(&self, container_name: &str, request: &ExecutionRequest) -> Vec<String> {
        let cfg = &self.config;
        let mut args: Vec<String> = vec![
            "create".into(),
            "--name".into(),
            container_name.into(),
            "--memory".into(),
            cfg.memory_limit.clone(),
            "--cpus".into(),
            cfg.cpu_limit.to_string(),
            "--workdir".into(),
            cfg.working_dir.clone(),
        ];

        if !cfg.network_enabled {
            args.extend(["--network".into(), "none".into()]);
        }

        if cfg.read_only {
            args.push("--read-only".into());
            args.extend(["--tmpfs".into(), "/tmp:rw,noexec,nosuid,size=64m".into()]);
        }

        for (key, value) in merge_env(&cfg.env, &request.env) {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }

        args.push(cfg.image.clone());
        args.extend(request.command.iter().cloned());
        args
    }

    async fn docker(&self, args: &[String]) -> Result<DockerOutput, SandboxError> {
        debug!(args = ?args, "Running docker command");
        let output = Command::new(&self.docker_bin)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SandboxError::Failed(format!("Failed to run {}: {e}", self.docker_bin)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let detail = if stderr.is_empty() { &stdout } else { &stderr };
            return Err(SandboxError::Failed(format!(
                "docker {} failed (rc={code}): {detail}",
                args.first().map(String::as_str).unwrap_or_default()
            )));
        }
        Ok(DockerOutput { stdout, stderr })
    }

    async fn remove(&self, container_name: &str) {
        let args = ["rm".to_string(), "-f".to_string(), container_name.to_string()];
        if let Err(e) = self.docker(&args).await {
            warn!(container = %container_name, error = %e, "Failed to remove sandbox container");
        }
        self.active.lock().remove(container_name);
    }

    async fn run(&self, container_name: &str, request: &ExecutionRequest) -> Result<SandboxResult, SandboxError> {
        let timeout = request.timeout.unwrap_or(self.config.timeout);

        self.docker(&self.create_args(container_name, request)).await?;
        self.active.lock().insert(container_name.to_string());

        self.docker(&["start".to_string(), container_name.to_string()]).await?;

        let wait_args = ["wait".to_string(), container_name.to_string()];
        let waited = match tokio::time::timeout(timeout, self.docker(&wait_args)).await {
            Ok(result) => result?,
            Err(_) => {
                info!(container = %container_name, timeout = ?timeout, "Sandbox timed out, killing container");
                let kill_args = ["kill".to_string(), container_name.to_string()];
                if let Err(e) = self.docker(&kill_args).await {
                    debug!(error = %e, "docker kill failed");
                }
                return Err(SandboxError::Timeout(timeout));
            }
        };
        let exit_code = waited.stdout.parse::<i32>().unwrap_or(1);

        let logs = self.docker(&["logs".to_string(), container_name.to_string()]).await?;

        Ok(SandboxResult {
            exit_code,
            stdout: logs.stdout,
            stderr: logs.stderr,
            timed_out: false,
            metadata: Default::default(),
        })
    }
}

#[async_trait]
impl SandboxExecutor for DockerSandbox {
    async fn execute(&self, request: ExecutionRequest) -> Result<SandboxResult, SandboxError> {
        if request.command.is_empty() {
            return Err(SandboxError::Failed("empty command".to_string()));
        }
        let container_name = format!("conclave-sandbox-{}", new_task_id());
        let result = self.run(&container_name, &request).await;
        self.remove(&container_name).await;
        result
    }

    async fn cleanup(&self) -> Result<(), SandboxError> {
        for name in self.active_containers() {
            self.remove(&name).await;
        }
        Ok(())
    }
}
