// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Turn Driver
//!
//! The loop shared by every topology:
//!
//! 1. apply the goal as the belief state
//! 2. ask the policy for the next round of turns; stop when there is none
//! 3. slice the board for every turn of the round, then step those agents
//!    concurrently
//! 4. in round order, let the policy observe each delta, apply it plus any
//!    follow-up
//! 5. stop when the policy reports done or `max_iterations` rounds have run
//!
//! Pipeline and star schedule one turn per round. Mesh schedules every
//! subscriber of the dequeued event. The board is owned by value for the
//! whole run, so applies never interleave.

use crate::domain::{AgentRoster, OrchestrationError, TopologyKind};
use async_trait::async_trait;
use conclave_core::domain::board::{Board, SliceOptions, StateDelta};
use futures::future::join_all;
use tracing::{debug, info};

/// Runs agents over a board until the topology finishes.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    fn kind(&self) -> TopologyKind;

    fn max_iterations(&self) -> usize;

    /// Run from an existing board (for example one restored from a snapshot).
    async fn run_with(&self, board: Board, goal: &str) -> Result<Board, OrchestrationError>;

    /// Run from an empty board.
    async fn run(&self, goal: &str) -> Result<Board, OrchestrationError> {
        self.run_with(Board::new(), goal).await
    }
}

/// One scheduled activation.
#[derive(Debug, Clone)]
pub(crate) struct Turn {
    pub agent: String,
    pub slice: SliceOptions,
}

/// What a policy concluded from the latest delta.
#[derive(Debug, Default)]
pub(crate) struct Observation {
    pub done: bool,
    /// Applied right after the agent's own delta.
    pub follow_up: Option<StateDelta>,
}

impl Observation {
    pub fn proceed() -> Self {
        Self::default()
    }

    pub fn finish(follow_up: Option<StateDelta>) -> Self {
        Self { done: true, follow_up }
    }
}

/// Per-run selection state of a topology.
pub(crate) trait TurnPolicy: Send {
    /// Turns for the next round. `None` ends the run; an empty round still
    /// counts against `max_iterations`.
    fn next_round(&mut self) -> Option<Vec<Turn>>;

    fn observe(&mut self, agent: &str, delta: &StateDelta) -> Observation;
}

pub(crate) async fn drive<P: TurnPolicy>(
    kind: TopologyKind,
    roster: &AgentRoster,
    policy: &mut P,
    mut board: Board,
    goal: &str,
    max_iterations: usize,
) -> Result<Board, OrchestrationError> {
    board.apply(StateDelta::belief(goal));

    for iteration in 0..max_iterations {
        let Some(round) = policy.next_round() else {
            debug!(topology = %kind, iteration, "No agent selected, stopping");
            break;
        };

        let mut activations = Vec::with_capacity(round.len());
        for turn in &round {
            let agent = roster.require(&turn.agent)?.clone();
            info!(topology = %kind, agent = %turn.agent, iteration, "Running agent turn");
            // every slice is taken before any delta of this round is applied
            let context = board.slice(&turn.slice);
            let name = turn.agent.as_str();
            activations.push(async move {
                agent
                    .step(context)
                    .await
                    .map_err(|source| OrchestrationError::agent(name, source))
            });
        }
        let deltas = join_all(activations)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let mut done = false;
        for (turn, delta) in round.iter().zip(deltas) {
            let observation = policy.observe(&turn.agent, &delta);
            board.apply(delta);
            if let Some(follow_up) = observation.follow_up {
                board.apply(follow_up);
            }
            done |= observation.done;
        }
        if done {
            debug!(topology = %kind, iteration, "Topology reported done");
            break;
        }
    }

    Ok(board)
}
