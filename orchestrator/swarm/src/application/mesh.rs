// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use super::driver::{drive, Observation, Orchestrator, Turn, TurnPolicy};
use crate::domain::{AgentRoster, OrchestrationError, Subscription, TopologyKind};
use async_trait::async_trait;
use conclave_core::domain::board::{Board, JsonMap, SliceOptions, StateDelta, TraceEntry};
use conclave_core::domain::events::Event;
use conclave_core::infrastructure::event_bus::{EventBus, TopicPattern};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Artifact key an agent writes to publish follow-up events.
pub const PUBLISH_ARTIFACT: &str = "_publish";

/// Trace action recorded after each mesh activation.
pub const ACTIVATE_ACTION: &str = "mesh_activate";

#[derive(Debug)]
struct CompiledSubscription {
    agent: String,
    patterns: Vec<TopicPattern>,
}

impl CompiledSubscription {
    fn matches(&self, topic: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(topic))
    }
}

/// Event-driven topology.
///
/// Every dequeued event activates all subscribed agents concurrently. Their
/// deltas are committed in subscription declaration order, each followed by
/// a `mesh_activate` trace entry, and any `_publish` events they carry are
/// enqueued in that same order.
#[derive(Debug)]
pub struct MeshOrchestrator {
    agents: AgentRoster,
    subscriptions: Vec<CompiledSubscription>,
    max_iterations: usize,
}

impl MeshOrchestrator {
    pub fn new(agents: AgentRoster, subscriptions: Vec<Subscription>) -> Result<Self, OrchestrationError> {
        let mut compiled = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            agents.require(&subscription.agent)?;
            let patterns = subscription
                .patterns
                .iter()
                .map(|pattern| {
                    TopicPattern::compile(pattern).map_err(|e| {
                        OrchestrationError::InvalidTopology(format!(
                            "invalid topic pattern '{pattern}' for agent '{}': {e}",
                            subscription.agent
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            compiled.push(CompiledSubscription {
                agent: subscription.agent,
                patterns,
            });
        }

        Ok(Self {
            agents,
            subscriptions: compiled,
            max_iterations: TopologyKind::Mesh.default_max_iterations(),
        })
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Subscribed agents for `topic`, in declaration order.
    pub fn subscribers(&self, topic: &str) -> Vec<&str> {
        self.subscriptions
            .iter()
            .filter(|subscription| subscription.matches(topic))
            .map(|subscription| subscription.agent.as_str())
            .collect()
    }
}

/// Follow-up events carried by a delta's `_publish` artifact.
fn follow_up_events(agent: &str, delta: &StateDelta) -> Vec<Event> {
    match delta.artifacts.get(PUBLISH_ARTIFACT) {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| Event::from_publish_entry(entry, agent))
            .collect(),
        _ => Vec::new(),
    }
}

/// One event per round: every subscriber of the dequeued topic runs.
struct MeshRun<'a> {
    subscriptions: &'a [CompiledSubscription],
    bus: EventBus,
    /// Topic of the event being handled.
    topic: String,
}

impl TurnPolicy for MeshRun<'_> {
    fn next_round(&mut self) -> Option<Vec<Turn>> {
        let Ok(event) = self.bus.try_recv() else {
            debug!("Event queue drained");
            return None;
        };

        let turns: Vec<Turn> = self
            .subscriptions
            .iter()
            .filter(|subscription| subscription.matches(&event.topic))
            .map(|subscription| Turn {
                agent: subscription.agent.clone(),
                slice: SliceOptions::for_agent(&subscription.agent),
            })
            .collect();

        if turns.is_empty() {
            metrics::counter!("conclave_mesh_events_total", "outcome" => "dropped").increment(1);
            debug!(topic = %event.topic, "No subscribers, dropping event");
        } else {
            metrics::counter!("conclave_mesh_events_total", "outcome" => "delivered").increment(1);
            info!(topic = %event.topic, subscribers = turns.len(), "Activating subscribers");
        }
        self.topic = event.topic;
        Some(turns)
    }

    fn observe(&mut self, agent: &str, delta: &StateDelta) -> Observation {
        for follow_up in follow_up_events(agent, delta) {
            self.bus.publish(follow_up);
        }
        let mut data = JsonMap::new();
        data.insert("trigger_topic".into(), json!(self.topic));
        Observation {
            done: false,
            follow_up: Some(StateDelta::trace(TraceEntry::new(agent, ACTIVATE_ACTION).with_data(data))),
        }
    }
}

#[async_trait]
impl Orchestrator for MeshOrchestrator {
    fn kind(&self) -> TopologyKind {
        TopologyKind::Mesh
    }

    fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    async fn run_with(&self, board: Board, goal: &str) -> Result<Board, OrchestrationError> {
        let bus = EventBus::new();
        bus.publish(Event::start(goal));
        let mut run = MeshRun {
            subscriptions: &self.subscriptions,
            bus,
            topic: String::new(),
        };
        let board = drive(self.kind(), &self.agents, &mut run, board, goal, self.max_iterations).await?;
        run.bus.close();
        Ok(board)
    }
}
