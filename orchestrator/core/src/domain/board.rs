// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Board Domain (Shared State Store)
//!
//! The [`Board`] is the blackboard every orchestration run reads from and
//! writes to. Agents never mutate it directly: they return a [`StateDelta`]
//! which the owning orchestrator applies in one step.
//!
//! | Type | Role |
//! |------|------|
//! | [`Board`] | belief state, execution trace, artifacts, pending task queue |
//! | [`TraceEntry`] | append-only record of one agent action |
//! | [`TaskItem`] | entry in the priority queue (lower `priority` = more urgent) |
//! | [`StateDelta`] | partial update, applied atomically |
//! | [`ContextSlice`] | filtered deep copy handed to a single agent |
//!
//! # Apply ordering
//!
//! `belief_state` overwrite → trace append → artifact deep-merge → task add →
//! task remove-by-id → re-sort (only when the task set changed).
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Deterministic merge and slice semantics for shared agent state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// String-keyed JSON object used for artifacts, trace data and metadata.
pub type JsonMap = serde_json::Map<String, Value>;

/// Number of trace entries a slice keeps when no cap is given.
pub const DEFAULT_MAX_TRACE_ENTRIES: usize = 50;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Failed to deserialize board snapshot: {0}")]
    Deserialization(String),
    #[error("Failed to serialize board snapshot: {0}")]
    Serialization(String),
}

/// Generate a 12-character opaque task identifier.
pub fn new_task_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

/// A single execution trace entry recording an agent action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub action: String,
    #[serde(default)]
    pub data: JsonMap,
    #[serde(default)]
    pub metadata: JsonMap,
}

impl TraceEntry {
    pub fn new(agent_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            agent_id: agent_id.into(),
            action: action.into(),
            data: JsonMap::new(),
            metadata: JsonMap::new(),
        }
    }

    pub fn with_data(mut self, data: JsonMap) -> Self {
        self.data = data;
        self
    }

    pub fn with_metadata(mut self, metadata: JsonMap) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A pending task in the board's priority queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    #[serde(default = "new_task_id")]
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub metadata: JsonMap,
}

impl TaskItem {
    pub fn new(description: impl Into<String>, priority: i64) -> Self {
        Self {
            id: new_task_id(),
            description: description.into(),
            priority,
            metadata: JsonMap::new(),
        }
    }
}

/// A partial update to apply to a [`Board`].
///
/// Empty collections and a `None` belief leave the corresponding board field
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub belief_state: Option<String>,
    #[serde(default)]
    pub trace_entries: Vec<TraceEntry>,
    #[serde(default)]
    pub artifacts: JsonMap,
    #[serde(default)]
    pub add_tasks: Vec<TaskItem>,
    #[serde(default)]
    pub remove_task_ids: Vec<String>,
}

impl StateDelta {
    pub fn belief(belief_state: impl Into<String>) -> Self {
        Self {
            belief_state: Some(belief_state.into()),
            ..Default::default()
        }
    }

    pub fn trace(entry: TraceEntry) -> Self {
        Self {
            trace_entries: vec![entry],
            ..Default::default()
        }
    }

    pub fn with_trace(mut self, entry: TraceEntry) -> Self {
        self.trace_entries.push(entry);
        self
    }

    pub fn with_artifact(mut self, key: impl Into<String>, value: Value) -> Self {
        self.artifacts.insert(key.into(), value);
        self
    }

    pub fn with_task(mut self, task: TaskItem) -> Self {
        self.add_tasks.push(task);
        self
    }

    pub fn without_task(mut self, task_id: impl Into<String>) -> Self {
        self.remove_task_ids.push(task_id.into());
        self
    }
}

/// Filtering options for [`Board::slice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceOptions {
    /// Keep only trace entries written by this agent.
    pub agent_id: Option<String>,
    /// Keep only these artifact keys.
    pub artifact_keys: Option<Vec<String>>,
    /// Cap applied to the (already filtered) trace, keeping the most recent.
    /// `0` yields an empty trace, not an uncapped one.
    pub max_trace_entries: usize,
}

impl Default for SliceOptions {
    fn default() -> Self {
        Self {
            agent_id: None,
            artifact_keys: None,
            max_trace_entries: DEFAULT_MAX_TRACE_ENTRIES,
        }
    }
}

impl SliceOptions {
    pub fn for_agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Default::default()
        }
    }

    pub fn with_artifact_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artifact_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_trace_entries(mut self, max: usize) -> Self {
        self.max_trace_entries = max;
        self
    }
}

/// A filtered, read-only deep copy of a [`Board`] for a specific agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSlice {
    pub belief_state: String,
    pub trace: Vec<TraceEntry>,
    pub artifacts: JsonMap,
    pub pending_tasks: Vec<TaskItem>,
}

/// Recursively merge `updates` into `base`.
///
/// Nested objects merge key by key, an explicit `null` deletes the key, and
/// every other value overwrites.
pub fn deep_merge(base: &mut JsonMap, updates: JsonMap) {
    for (key, value) in updates {
        match value {
            Value::Null => {
                base.remove(&key);
            }
            Value::Object(nested) => match base.get_mut(&key) {
                Some(Value::Object(existing)) => deep_merge(existing, nested),
                _ => {
                    base.insert(key, Value::Object(nested));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}

/// Shared state store for a single orchestration session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub belief_state: String,
    #[serde(default)]
    pub execution_trace: Vec<TraceEntry>,
    #[serde(default)]
    pub artifacts: JsonMap,
    #[serde(default)]
    pub pending_tasks: Vec<TaskItem>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a [`StateDelta`] and return `self` for chaining.
    ///
    /// Never fails: removing an id that is not queued is a no-op.
    pub fn apply(&mut self, delta: StateDelta) -> &mut Self {
        let StateDelta {
            belief_state,
            trace_entries,
            artifacts,
            add_tasks,
            remove_task_ids,
        } = delta;

        if let Some(belief) = belief_state {
            self.belief_state = belief;
        }

        self.execution_trace.extend(trace_entries);

        if !artifacts.is_empty() {
            deep_merge(&mut self.artifacts, artifacts);
        }

        let tasks_changed = !add_tasks.is_empty() || !remove_task_ids.is_empty();
        self.pending_tasks.extend(add_tasks);
        if !remove_task_ids.is_empty() {
            self.pending_tasks
                .retain(|task| !remove_task_ids.contains(&task.id));
        }
        if tasks_changed {
            // stable: equal priorities keep insertion order
            self.pending_tasks.sort_by_key(|task| task.priority);
        }

        self
    }

    /// Serialise the entire board to JSON bytes.
    pub fn snapshot(&self) -> Result<Vec<u8>, BoardError> {
        serde_json::to_vec(self).map_err(|e| BoardError::Serialization(e.to_string()))
    }

    /// Rebuild a board from bytes produced by [`Board::snapshot`].
    pub fn restore(data: &[u8]) -> Result<Self, BoardError> {
        serde_json::from_slice(data).map_err(|e| BoardError::Deserialization(e.to_string()))
    }

    /// Project a filtered deep copy of this board.
    ///
    /// The trace is filtered by agent first and capped second.
    pub fn slice(&self, options: &SliceOptions) -> ContextSlice {
        let filtered: Vec<&TraceEntry> = self
            .execution_trace
            .iter()
            .filter(|entry| match &options.agent_id {
                Some(agent_id) => &entry.agent_id == agent_id,
                None => true,
            })
            .collect();
        let skip = filtered.len().saturating_sub(options.max_trace_entries);
        let trace = filtered.into_iter().skip(skip).cloned().collect();

        let artifacts = match &options.artifact_keys {
            Some(keys) => self
                .artifacts
                .iter()
                .filter(|(key, _)| keys.iter().any(|wanted| wanted == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            None => self.artifacts.clone(),
        };

        ContextSlice {
            belief_state: self.belief_state.clone(),
            trace,
            artifacts,
            pending_tasks: self.pending_tasks.clone(),
        }
    }

    pub fn get_artifact(&self, key: &str) -> Option<&Value> {
        self.artifacts.get(key)
    }

    pub fn set_artifact(&mut self, key: impl Into<String>, value: Value) {
        self.artifacts.insert(key.into(), value);
    }

    pub fn add_trace(&mut self, agent_id: impl Into<String>, action: impl Into<String>, data: JsonMap) {
        self.execution_trace
            .push(TraceEntry::new(agent_id, action).with_data(data));
    }

    /// Remove and return the most urgent (lowest `priority`) task.
    pub fn pop_task(&mut self) -> Option<TaskItem> {
        if self.pending_tasks.is_empty() {
            None
        } else {
            Some(self.pending_tasks.remove(0))
        }
    }
}
