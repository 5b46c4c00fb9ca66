// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Roster
//!
//! The set of agents a topology can activate, addressed by
//! [`Agent::name`]. Registration order is kept so listings are stable.

use conclave_core::domain::agent::Agent;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::OrchestrationError;

#[derive(Clone, Default)]
pub struct AgentRoster {
    order: Vec<String>,
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent. A later agent with the same name replaces the earlier one.
    pub fn insert(&mut self, agent: Arc<dyn Agent>) {
        let name = agent.name().to_string();
        if self.agents.insert(name.clone(), agent).is_none() {
            self.order.push(name);
        }
    }

    pub fn with(mut self, agent: Arc<dyn Agent>) -> Self {
        self.insert(agent);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Agent>> {
        self.agents.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Like [`get`](Self::get) but failing with `UnknownAgent`.
    pub fn require(&self, name: &str) -> Result<&Arc<dyn Agent>, OrchestrationError> {
        self.get(name)
            .ok_or_else(|| OrchestrationError::UnknownAgent(name.to_string()))
    }

    /// Names in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl FromIterator<Arc<dyn Agent>> for AgentRoster {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Agent>>>(iter: I) -> Self {
        let mut roster = AgentRoster::new();
        for agent in iter {
            roster.insert(agent);
        }
        roster
    }
}

impl std::fmt::Debug for AgentRoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRoster").field("agents", &self.order).finish()
    }
}
