// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use super::driver::{drive, Observation, Orchestrator, Turn, TurnPolicy};
use crate::domain::{AgentRoster, OrchestrationError, TopologyKind};
use async_trait::async_trait;
use conclave_core::domain::board::{Board, SliceOptions, StateDelta};

/// Runs each agent in `order` exactly once, in sequence.
///
/// Slices are unfiltered: every agent sees the full trace and artifacts
/// written by the agents before it.
#[derive(Debug, Clone)]
pub struct PipelineOrchestrator {
    agents: AgentRoster,
    order: Vec<String>,
    max_iterations: usize,
}

impl PipelineOrchestrator {
    pub fn new<I, S>(agents: AgentRoster, order: I) -> Result<Self, OrchestrationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = order.into_iter().map(Into::into).collect();
        for name in &order {
            agents.require(name)?;
        }
        Ok(Self {
            agents,
            order,
            max_iterations: TopologyKind::Pipeline.default_max_iterations(),
        })
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }
}

struct Cursor<'a> {
    order: &'a [String],
    next: usize,
}

impl TurnPolicy for Cursor<'_> {
    fn next_round(&mut self) -> Option<Vec<Turn>> {
        let agent = self.order.get(self.next)?.clone();
        self.next += 1;
        Some(vec![Turn {
            agent,
            slice: SliceOptions::default(),
        }])
    }

    fn observe(&mut self, _agent: &str, _delta: &StateDelta) -> Observation {
        if self.next >= self.order.len() {
            Observation::finish(None)
        } else {
            Observation::proceed()
        }
    }
}

#[async_trait]
impl Orchestrator for PipelineOrchestrator {
    fn kind(&self) -> TopologyKind {
        TopologyKind::Pipeline
    }

    fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    async fn run_with(&self, board: Board, goal: &str) -> Result<Board, OrchestrationError> {
        let mut cursor = Cursor {
            order: &self.order,
            next: 0,
        };
        drive(self.kind(), &self.agents, &mut cursor, board, goal, self.max_iterations).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedAgent;
    use conclave_core::domain::agent::Agent;
    use std::sync::Arc;

    fn roster(names: &[&str]) -> AgentRoster {
        names
            .iter()
            .map(|name| -> Arc<dyn Agent> { Arc::new(ScriptedAgent::new(*name, [format!("{name} output")])) })
            .collect()
    }

    fn generate_agents(board: &Board) -> Vec<&str> {
        board
            .execution_trace
            .iter()
            .filter(|entry| entry.action == "generate")
            .map(|entry| entry.agent_id.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_runs_each_agent_once_in_order() {
        let pipeline = PipelineOrchestrator::new(roster(&["a", "b", "c"]), ["a", "b", "c"]).unwrap();
        let board = pipeline.run("summarize").await.unwrap();

        assert_eq!(board.belief_state, "summarize");
        assert_eq!(generate_agents(&board), vec!["a", "b", "c"]);
        assert_eq!(board.execution_trace.len(), 3);
    }

    #[tokio::test]
    async fn test_later_agents_see_earlier_output() {
        let a = Arc::new(ScriptedAgent::new("a", ["first"]));
        let b = Arc::new(ScriptedAgent::new("b", ["second"]));
        let agents = AgentRoster::new().with(a).with(b.clone());

        PipelineOrchestrator::new(agents, ["a", "b"]).unwrap().run("go").await.unwrap();

        let seen = b.contexts();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].trace.len(), 1);
        assert_eq!(seen[0].trace[0].agent_id, "a");
        assert_eq!(seen[0].artifacts["last_response"]["a"], "first");
    }

    #[tokio::test]
    async fn test_max_iterations_truncates() {
        let pipeline = PipelineOrchestrator::new(roster(&["a", "b", "c"]), ["a", "b", "c"])
            .unwrap()
            .with_max_iterations(2);
        let board = pipeline.run("go").await.unwrap();
        assert_eq!(generate_agents(&board), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_order_only_sets_goal() {
        let board = PipelineOrchestrator::new(roster(&["a"]), Vec::<String>::new())
            .unwrap()
            .run("idle")
            .await
            .unwrap();
        assert_eq!(board.belief_state, "idle");
        assert!(board.execution_trace.is_empty());
    }

    #[test]
    fn test_unknown_agent_rejected() {
        let err = PipelineOrchestrator::new(roster(&["a"]), ["a", "ghost"]).unwrap_err();
        assert!(matches!(err, OrchestrationError::UnknownAgent(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_step_error_aborts() {
        let agents = roster(&["a"]).with(Arc::new(ScriptedAgent::failing("broken")));
        let err = PipelineOrchestrator::new(agents, ["a", "broken", "a"])
            .unwrap()
            .run("go")
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Agent { agent, .. } if agent == "broken"));
    }
}
