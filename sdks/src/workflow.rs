// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow loading and execution
//!
//! [`WorkflowRunner::run`] assembles a run in this order:
//!
//! 1. parse every agent manifest (paths relative to the workflow file)
//! 2. build one model client per agent, concurrently
//! 3. connect the MCP servers (workflow-level first, then per manifest)
//!    one by one and register them on a dispatcher
//! 4. wrap the dispatcher in a [`SafeDispatcher`] when the gatekeeper is on
//! 5. build the agent nodes and the topology, then run it
//!
//! MCP providers are closed whether or not the run succeeds.

use crate::error::WorkflowError;
use crate::models::WorkflowSpec;
use conclave_core::application::agent_node::AgentNode;
use conclave_core::application::dispatcher::{ToolDispatch, ToolDispatcher};
use conclave_core::application::safe_dispatcher::SafeDispatcher;
use conclave_core::domain::agent::{render_prompt, Agent, AgentManifest, McpServerRef};
use conclave_core::domain::board::Board;
use conclave_core::domain::gatekeeper::Gatekeeper;
use conclave_core::domain::llm::{ModelClient, ModelConfig};
use conclave_core::domain::message::ToolSchema;
use conclave_core::infrastructure::agent_manifest_parser::AgentManifestParser;
use conclave_core::infrastructure::gatekeeper::CliGatekeeper;
use conclave_core::infrastructure::llm::{ModelClientFactory, ProviderRegistry};
use conclave_core::infrastructure::mcp::McpClient;
use conclave_core::domain::tool::ToolProvider;
use conclave_swarm::{
    AgentRoster, MeshOrchestrator, Orchestrator, PipelineOrchestrator, StarOrchestrator, TopologyKind,
};
use futures::future::join_all;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

/// Model used when neither the workflow nor the manifest names one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))").expect("env var pattern is valid")
});

/// Expand `${VAR}` and `$VAR` from the process environment.
/// Unset variables are left as written.
pub fn expand_env(raw: &str) -> String {
    ENV_VAR
        .replace_all(raw, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or_default();
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Reads and validates a workflow file.
pub struct WorkflowLoader {
    path: PathBuf,
}

impl WorkflowLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<WorkflowSpec, WorkflowError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| WorkflowError::ValidationFailed(format!("Cannot read {}: {e}", self.path.display())))?;
        Self::parse(&raw)
    }

    /// Expand, parse and validate workflow YAML text.
    pub fn parse(raw: &str) -> Result<WorkflowSpec, WorkflowError> {
        let expanded = expand_env(raw);
        let value: serde_yaml::Value = serde_yaml::from_str(&expanded)
            .map_err(|e| WorkflowError::ValidationFailed(format!("YAML parse error: {e}")))?;
        if !value.is_mapping() {
            return Err(WorkflowError::ValidationFailed("Workflow YAML must be a mapping".into()));
        }
        let spec: WorkflowSpec =
            serde_yaml::from_value(value).map_err(|e| WorkflowError::ValidationFailed(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }
}

/// Executes a validated [`WorkflowSpec`].
pub struct WorkflowRunner {
    spec: WorkflowSpec,
    base_dir: PathBuf,
    gatekeeper: Option<Arc<dyn Gatekeeper>>,
    client_factory: Arc<dyn ModelClientFactory>,
}

impl WorkflowRunner {
    pub fn new(spec: WorkflowSpec, base_dir: impl Into<PathBuf>) -> Self {
        if let Some(endpoint) = spec.telemetry.as_ref().and_then(|t| t.ignored_endpoint()) {
            warn!(workflow = %spec.name, endpoint = %endpoint, "OTLP export is not supported; telemetry.otlp_endpoint is ignored");
        }
        Self {
            spec,
            base_dir: base_dir.into(),
            gatekeeper: None,
            client_factory: Arc::new(ProviderRegistry::default()),
        }
    }

    /// Load a workflow file; manifests resolve relative to its directory.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let spec = WorkflowLoader::new(path).load()?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self::new(spec, base_dir))
    }

    /// Gate used instead of the terminal prompt when the gatekeeper is enabled.
    pub fn with_gatekeeper(mut self, gatekeeper: Arc<dyn Gatekeeper>) -> Self {
        self.gatekeeper = Some(gatekeeper);
        self
    }

    pub fn with_client_factory(mut self, factory: Arc<dyn ModelClientFactory>) -> Self {
        self.client_factory = factory;
        self
    }

    pub fn spec(&self) -> &WorkflowSpec {
        &self.spec
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Parse every agent's manifest, keyed by the workflow's agent name.
    pub fn load_manifests(&self) -> Result<Vec<(String, AgentManifest)>, WorkflowError> {
        self.spec
            .agents
            .iter()
            .map(|(name, agent_ref)| -> Result<(String, AgentManifest), WorkflowError> {
                let manifest = AgentManifestParser::parse_file(self.base_dir.join(&agent_ref.manifest))?;
                Ok((name.clone(), manifest))
            })
            .collect()
    }

    /// Agent override, then workflow model, then the manifest's preference,
    /// then [`DEFAULT_MODEL`].
    pub fn model_config_for(&self, agent: &str, manifest: &AgentManifest) -> ModelConfig {
        self.spec
            .agents
            .get(agent)
            .and_then(|agent_ref| agent_ref.model.clone())
            .or_else(|| self.spec.model.clone())
            .unwrap_or_else(|| {
                let preferred = manifest.model_requirements.preferred_model.as_deref();
                ModelConfig::new(preferred.unwrap_or(DEFAULT_MODEL))
            })
    }

    /// Workflow-level servers first, then each manifest's in agent order.
    pub fn mcp_refs(&self, manifests: &[(String, AgentManifest)]) -> Vec<McpServerRef> {
        self.spec
            .mcp_servers
            .iter()
            .chain(manifests.iter().flat_map(|(_, manifest)| manifest.mcp_servers.iter()))
            .cloned()
            .collect()
    }

    /// Connect to every MCP server and return the discovered tool schemas.
    pub async fn discover_tools(&self) -> Result<Vec<ToolSchema>, WorkflowError> {
        let manifests = self.load_manifests()?;
        let dispatcher = ToolDispatcher::new();
        let connected = self.connect_providers(&dispatcher, &self.mcp_refs(&manifests)).await;
        let tools = dispatcher.all_tools();
        dispatcher.close_all().await;
        connected?;
        Ok(tools)
    }

    pub async fn run(&self, goal: &str) -> Result<Board, WorkflowError> {
        self.run_with(Board::new(), goal).await
    }

    /// Run starting from an existing board.
    pub async fn run_with(&self, board: Board, goal: &str) -> Result<Board, WorkflowError> {
        let manifests = self.load_manifests()?;
        let clients = self.build_clients(&manifests).await?;

        let dispatcher = Arc::new(ToolDispatcher::new());
        let result = match self.connect_providers(&dispatcher, &self.mcp_refs(&manifests)).await {
            Ok(()) => self.execute(&manifests, clients, dispatcher.clone(), board, goal).await,
            Err(e) => Err(e),
        };
        dispatcher.close_all().await;
        result
    }

    async fn build_clients(
        &self,
        manifests: &[(String, AgentManifest)],
    ) -> Result<Vec<Arc<dyn ModelClient>>, WorkflowError> {
        let configs: Vec<ModelConfig> = manifests
            .iter()
            .map(|(name, manifest)| self.model_config_for(name, manifest))
            .collect();
        let factory = &self.client_factory;
        join_all(configs.iter().map(|config| factory.create(config)))
            .await
            .into_iter()
            .map(|client| client.map_err(WorkflowError::from))
            .collect()
    }

    async fn connect_providers(&self, dispatcher: &ToolDispatcher, refs: &[McpServerRef]) -> Result<(), WorkflowError> {
        for server in refs {
            let client = Arc::new(McpClient::new(server)?);
            client.connect().await?;
            let provider: Arc<dyn ToolProvider> = client;
            if let Err(e) = dispatcher.register(provider.clone()).await {
                // not registered yet, so close_all would miss it
                if let Err(close_err) = provider.close().await {
                    warn!(server = %server.name, error = %close_err, "Failed to close MCP server");
                }
                return Err(e.into());
            }
            info!(server = %server.name, "Registered MCP server");
        }
        Ok(())
    }

    async fn execute(
        &self,
        manifests: &[(String, AgentManifest)],
        clients: Vec<Arc<dyn ModelClient>>,
        dispatcher: Arc<ToolDispatcher>,
        board: Board,
        goal: &str,
    ) -> Result<Board, WorkflowError> {
        let tools = match self.spec.gatekeeper.as_ref().filter(|g| g.enabled) {
            Some(settings) => {
                let config = settings.to_config();
                let gatekeeper = self
                    .gatekeeper
                    .clone()
                    .unwrap_or_else(|| Arc::new(CliGatekeeper::new(config.approval_timeout)));
                let safe = SafeDispatcher::new(dispatcher, config, Some(gatekeeper))
                    .map_err(|e| WorkflowError::ValidationFailed(e.to_string()))?;
                safe.all_tools()
            }
            None => dispatcher.all_tools(),
        };

        let roster: AgentRoster = manifests
            .iter()
            .zip(clients)
            .map(|((name, manifest), client)| -> Arc<dyn Agent> {
                let instructions = render_prompt(manifest, &HashMap::new());
                Arc::new(AgentNode::new(name.clone(), instructions, client).with_tools(tools.clone()))
            })
            .collect();

        let orchestrator = self.build_orchestrator(roster)?;
        info!(
            workflow = %self.spec.name,
            topology = %orchestrator.kind(),
            max_iterations = orchestrator.max_iterations(),
            tools = tools.len(),
            "Starting workflow"
        );
        Ok(orchestrator.run_with(board, goal).await?)
    }

    fn build_orchestrator(&self, roster: AgentRoster) -> Result<Box<dyn Orchestrator>, WorkflowError> {
        let topology = &self.spec.topology;
        let max_iterations = self.spec.max_iterations;
        let missing = |field: &str| WorkflowError::ValidationFailed(format!("{} topology requires '{field}'", topology.kind));

        let orchestrator: Box<dyn Orchestrator> = match topology.kind {
            TopologyKind::Pipeline => {
                let order = topology.order.clone().ok_or_else(|| missing("order"))?;
                Box::new(PipelineOrchestrator::new(roster, order)?.with_max_iterations(max_iterations))
            }
            TopologyKind::Star => {
                let supervisor = topology.supervisor.clone().ok_or_else(|| missing("supervisor"))?;
                Box::new(StarOrchestrator::new(roster, supervisor)?.with_max_iterations(max_iterations))
            }
            TopologyKind::Mesh => {
                let subscriptions = topology.subscriptions.clone().ok_or_else(|| missing("subscriptions"))?;
                Box::new(MeshOrchestrator::new(roster, subscriptions)?.with_max_iterations(max_iterations))
            }
        };
        Ok(orchestrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env() {
        std::env::set_var("CONCLAVE_TEST_EXPAND_KEY", "sk-123");
        std::env::remove_var("CONCLAVE_TEST_EXPAND_UNSET");

        assert_eq!(expand_env("key: ${CONCLAVE_TEST_EXPAND_KEY}"), "key: sk-123");
        assert_eq!(expand_env("key: $CONCLAVE_TEST_EXPAND_KEY/v1"), "key: sk-123/v1");
        assert_eq!(
            expand_env("a: ${CONCLAVE_TEST_EXPAND_UNSET} b: $CONCLAVE_TEST_EXPAND_UNSET"),
            "a: ${CONCLAVE_TEST_EXPAND_UNSET} b: $CONCLAVE_TEST_EXPAND_UNSET"
        );
        assert_eq!(expand_env("price: $5"), "price: $5");
    }

    #[test]
    fn test_parse_rejects_non_mapping() {
        let err = WorkflowLoader::parse("- just\n- a list\n").unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(msg) if msg == "Workflow YAML must be a mapping"));
    }

    #[test]
    fn test_parse_reports_yaml_errors() {
        let err = WorkflowLoader::parse("name: [unclosed").unwrap_err();
        assert!(err.to_string().contains("YAML parse error"));
    }

    #[test]
    fn test_missing_file() {
        let err = WorkflowLoader::new("/nonexistent/workflow.yaml").load().unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(msg) if msg.starts_with("Cannot read")));
    }

    #[test]
    fn test_model_precedence() {
        let spec = WorkflowLoader::parse(
            "name: demo\ntopology: {type: pipeline, order: [a, b, c]}\n\
             model: {model: openai/gpt-4o-mini}\n\
             agents:\n  a: {manifest: a.yaml, model: {model: anthropic/claude-3-5-sonnet}}\n  \
             b: {manifest: b.yaml}\n  c: {manifest: c.yaml}\n",
        )
        .unwrap();
        let runner = WorkflowRunner::new(spec.clone(), ".");
        let mut manifest = AgentManifest::new("x", "You are $name.");

        assert_eq!(runner.model_config_for("a", &manifest).model, "anthropic/claude-3-5-sonnet");
        assert_eq!(runner.model_config_for("b", &manifest).model, "openai/gpt-4o-mini");

        let mut no_default = spec;
        no_default.model = None;
        let runner = WorkflowRunner::new(no_default, ".");
        assert_eq!(runner.model_config_for("c", &manifest).model, DEFAULT_MODEL);
        manifest.model_requirements.preferred_model = Some("gemini/gemini-1.5-pro".into());
        assert_eq!(runner.model_config_for("c", &manifest).model, "gemini/gemini-1.5-pro");
    }
}
