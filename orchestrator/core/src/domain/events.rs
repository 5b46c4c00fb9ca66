// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::board::JsonMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Topic published to seed a mesh run.
pub const START_TOPIC: &str = "orchestration.start";

/// A message on the mesh event bus.
///
/// Topics are dot-segmented (`research.done`, `code.review.requested`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub topic: String,
    #[serde(default)]
    pub payload: JsonMap,
    /// Publishing agent; empty for the synthetic start event
    #[serde(default)]
    pub source: String,
}

impl Event {
    pub fn new(topic: impl Into<String>, payload: JsonMap, source: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload,
            source: source.into(),
        }
    }

    /// The `orchestration.start` event carrying `{goal}`.
    pub fn start(goal: &str) -> Self {
        let mut payload = JsonMap::new();
        payload.insert("goal".to_string(), Value::String(goal.to_string()));
        Self::new(START_TOPIC, payload, "")
    }

    /// Parse one `_publish` entry (`{topic, payload}`).
    ///
    /// Returns `None` when `topic` is missing or not a string. A missing or
    /// non-object payload becomes empty.
    pub fn from_publish_entry(entry: &Value, source: &str) -> Option<Self> {
        let topic = entry.get("topic")?.as_str()?;
        let payload = entry
            .get("payload")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Some(Self::new(topic, payload, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_event() {
        let event = Event::start("write a poem");
        assert_eq!(event.topic, "orchestration.start");
        assert_eq!(event.source, "");
        assert_eq!(event.payload.get("goal"), Some(&json!("write a poem")));
    }

    #[test]
    fn test_publish_entry_parsing() {
        let event = Event::from_publish_entry(&json!({"topic": "a.b", "payload": {"x": 1}}), "writer").unwrap();
        assert_eq!(event.topic, "a.b");
        assert_eq!(event.source, "writer");
        assert_eq!(event.payload.get("x"), Some(&json!(1)));

        assert!(Event::from_publish_entry(&json!({"payload": {}}), "w").is_none());
        assert!(Event::from_publish_entry(&json!({"topic": 7}), "w").is_none());
        assert!(Event::from_publish_entry(&json!({"topic": "t"}), "w").unwrap().payload.is_empty());
    }
}
