// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use super::driver::{drive, Observation, Orchestrator, Turn, TurnPolicy};
use crate::domain::{AgentRoster, OrchestrationError, StarPhase, TopologyKind};
use async_trait::async_trait;
use conclave_core::domain::board::{Board, JsonMap, SliceOptions, StateDelta, TraceEntry};
use conclave_core::domain::validation::response_text;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;
use tracing::{info, warn};

static DONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bDONE\b").expect("DONE pattern is valid"));
static ROUTE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Route:\s*(\S+)").expect("route pattern is valid"));

/// Trace action appended when the supervisor declares the goal complete.
pub const TERMINATE_ACTION: &str = "terminate";

/// Supervisor-directed topology.
///
/// The supervisor runs, then either names a worker (`Route: <name>`), which
/// runs once before control returns, or ends the run with `DONE`. Output
/// with neither directive also ends the run.
#[derive(Debug, Clone)]
pub struct StarOrchestrator {
    agents: AgentRoster,
    supervisor: String,
    max_iterations: usize,
}

impl StarOrchestrator {
    pub fn new(agents: AgentRoster, supervisor: impl Into<String>) -> Result<Self, OrchestrationError> {
        let supervisor = supervisor.into();
        agents.require(&supervisor)?;
        Ok(Self {
            agents,
            supervisor,
            max_iterations: TopologyKind::Star.default_max_iterations(),
        })
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn supervisor(&self) -> &str {
        &self.supervisor
    }
}

/// Per-run phase tracking.
struct StarRun<'a> {
    agents: &'a AgentRoster,
    supervisor: &'a str,
    phase: StarPhase,
}

impl StarRun<'_> {
    /// Parse the supervisor's reply; `DONE` is checked before `Route:`.
    fn route(&mut self, text: &str) -> Observation {
        if DONE_PATTERN.is_match(text) {
            info!(supervisor = %self.supervisor, "Supervisor declared DONE");
            self.phase = StarPhase::Finished;
            let mut data = JsonMap::new();
            data.insert("reason".into(), json!("DONE"));
            let terminate = TraceEntry::new(self.supervisor, TERMINATE_ACTION).with_data(data);
            return Observation::finish(Some(StateDelta::trace(terminate)));
        }

        let Some(target) = ROUTE_PATTERN.captures(text).and_then(|c| c.get(1)) else {
            info!(supervisor = %self.supervisor, "No routing directive, finishing");
            self.phase = StarPhase::Finished;
            return Observation::finish(None);
        };

        let target = target.as_str();
        if self.agents.contains(target) {
            info!(supervisor = %self.supervisor, worker = %target, "Routing to worker");
            self.phase = StarPhase::Worker(target.to_string());
            Observation::proceed()
        } else {
            warn!(supervisor = %self.supervisor, worker = %target, "Supervisor routed to unknown agent, finishing");
            self.phase = StarPhase::Finished;
            Observation::finish(None)
        }
    }
}

impl TurnPolicy for StarRun<'_> {
    fn next_round(&mut self) -> Option<Vec<Turn>> {
        let agent = match &self.phase {
            StarPhase::Supervisor => self.supervisor.to_string(),
            StarPhase::Worker(name) => name.clone(),
            StarPhase::Finished => return None,
        };
        Some(vec![Turn {
            slice: SliceOptions::for_agent(&agent),
            agent,
        }])
    }

    fn observe(&mut self, _agent: &str, delta: &StateDelta) -> Observation {
        match &self.phase {
            StarPhase::Supervisor => self.route(response_text(delta).unwrap_or_default()),
            StarPhase::Worker(_) => {
                self.phase = StarPhase::Supervisor;
                Observation::proceed()
            }
            StarPhase::Finished => Observation::finish(None),
        }
    }
}

#[async_trait]
impl Orchestrator for StarOrchestrator {
    fn kind(&self) -> TopologyKind {
        TopologyKind::Star
    }

    fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    async fn run_with(&self, board: Board, goal: &str) -> Result<Board, OrchestrationError> {
        let mut run = StarRun {
            agents: &self.agents,
            supervisor: &self.supervisor,
            phase: StarPhase::Supervisor,
        };
        drive(self.kind(), &self.agents, &mut run, board, goal, self.max_iterations).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedAgent;
    use std::sync::Arc;

    fn actions(board: &Board) -> Vec<(&str, &str)> {
        board
            .execution_trace
            .iter()
            .map(|entry| (entry.agent_id.as_str(), entry.action.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn test_done_on_first_turn() {
        let worker = Arc::new(ScriptedAgent::new("worker", ["working"]));
        let agents = AgentRoster::new()
            .with(Arc::new(ScriptedAgent::new("supervisor", ["All good. DONE"])))
            .with(worker.clone());

        let board = StarOrchestrator::new(agents, "supervisor").unwrap().run("goal").await.unwrap();

        assert_eq!(actions(&board), vec![("supervisor", "generate"), ("supervisor", "terminate")]);
        assert_eq!(board.execution_trace[1].data["reason"], "DONE");
        assert_eq!(worker.calls(), 0);
    }

    #[tokio::test]
    async fn test_route_then_done() {
        let agents = AgentRoster::new()
            .with(Arc::new(ScriptedAgent::new("supervisor", ["route: worker", "done"])))
            .with(Arc::new(ScriptedAgent::new("worker", ["draft"])));

        let board = StarOrchestrator::new(agents, "supervisor").unwrap().run("goal").await.unwrap();

        assert_eq!(
            actions(&board),
            vec![
                ("supervisor", "generate"),
                ("worker", "generate"),
                ("supervisor", "generate"),
                ("supervisor", "terminate"),
            ]
        );
    }

    #[tokio::test]
    async fn test_done_wins_over_route() {
        let worker = Arc::new(ScriptedAgent::new("worker", ["draft"]));
        let agents = AgentRoster::new()
            .with(Arc::new(ScriptedAgent::new("supervisor", ["Route: worker, or maybe we are DONE"])))
            .with(worker.clone());

        StarOrchestrator::new(agents, "supervisor").unwrap().run("goal").await.unwrap();
        assert_eq!(worker.calls(), 0);
    }

    #[tokio::test]
    async fn test_ambiguous_output_finishes() {
        let agents = AgentRoster::new().with(Arc::new(ScriptedAgent::new("supervisor", ["I am not sure"])));
        let board = StarOrchestrator::new(agents, "supervisor").unwrap().run("goal").await.unwrap();
        assert_eq!(actions(&board), vec![("supervisor", "generate")]);
    }

    #[tokio::test]
    async fn test_unknown_route_finishes() {
        let agents = AgentRoster::new().with(Arc::new(ScriptedAgent::new("supervisor", ["Route: ghost"])));
        let board = StarOrchestrator::new(agents, "supervisor").unwrap().run("goal").await.unwrap();
        assert_eq!(board.execution_trace.len(), 1);
    }

    #[tokio::test]
    async fn test_worker_sees_only_its_own_trace() {
        let worker = Arc::new(ScriptedAgent::new("worker", ["draft"]));
        let agents = AgentRoster::new()
            .with(Arc::new(ScriptedAgent::new("supervisor", ["Route: worker", "Route: worker", "DONE"])))
            .with(worker.clone());

        StarOrchestrator::new(agents, "supervisor").unwrap().run("goal").await.unwrap();

        let contexts = worker.contexts();
        assert_eq!(contexts.len(), 2);
        assert!(contexts[0].trace.is_empty());
        assert_eq!(contexts[1].trace.len(), 1);
        assert!(contexts[1].trace.iter().all(|entry| entry.agent_id == "worker"));
    }

    #[tokio::test]
    async fn test_max_iterations_bounds_routing_loop() {
        let agents = AgentRoster::new()
            .with(Arc::new(ScriptedAgent::new("supervisor", ["Route: worker"])))
            .with(Arc::new(ScriptedAgent::new("worker", ["again"])));

        let board = StarOrchestrator::new(agents, "supervisor")
            .unwrap()
            .with_max_iterations(5)
            .run("goal")
            .await
            .unwrap();
        assert_eq!(board.execution_trace.len(), 5);
    }

    #[test]
    fn test_unknown_supervisor_rejected() {
        let err = StarOrchestrator::new(AgentRoster::new(), "boss").unwrap_err();
        assert!(matches!(err, OrchestrationError::UnknownAgent(name) if name == "boss"));
    }
}
