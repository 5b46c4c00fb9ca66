// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::domain::board::JsonMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Docker memory limit syntax (`256m`, `1g`)
    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,
    #[serde(default = "default_cpu_limit")]
    pub cpu_limit: f64,
    #[serde(default)]
    pub network_enabled: bool,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
    #[serde(default = "default_read_only")]
    pub read_only: bool,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            memory_limit: default_memory_limit(),
            cpu_limit: default_cpu_limit(),
            network_enabled: false,
            image: default_image(),
            working_dir: default_working_dir(),
            read_only: default_read_only(),
            env: HashMap::new(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_memory_limit() -> String {
    "256m".to_string()
}

fn default_cpu_limit() -> f64 {
    1.0
}

fn default_image() -> String {
    "python:3.12-slim".to_string()
}

fn default_working_dir() -> String {
    "/workspace".to_string()
}

fn default_read_only() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    /// Overrides [`SandboxConfig::timeout`] for this request
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub metadata: JsonMap,
}

impl ExecutionRequest {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SandboxResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub metadata: JsonMap,
}

impl SandboxResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Sandbox execution failed: {0}")]
    Failed(String),
    #[error("Sandbox execution timed out after {0:?}")]
    Timeout(Duration),
}

/// Isolated command execution for agent-generated code.
#[async_trait]
pub trait SandboxExecutor: Send + Sync {
    async fn execute(&self, request: ExecutionRequest) -> Result<SandboxResult, SandboxError>;

    /// Release everything the sandbox created.
    async fn cleanup(&self) -> Result<(), SandboxError> {
        Ok(())
    }
}
