// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow Models
//!
//! Serde model of the workflow YAML consumed by `conclave run`.
//!
//! ```yaml
//! name: research-team
//! topology:
//!   type: mesh
//!   subscriptions:
//!     planner: ["orchestration.start"]
//!     writer: ["plan.*"]
//! model:
//!   model: openai/gpt-4o-mini
//!   api_key: ${OPENAI_API_KEY}
//! agents:
//!   planner: { manifest: agents/planner.yaml }
//!   writer: { manifest: agents/writer.yaml }
//! ```

use crate::error::WorkflowError;
use conclave_core::domain::agent::McpServerRef;
use conclave_core::domain::gatekeeper::{GatekeeperConfig, PolicyAction, ToolPolicy};
use conclave_core::domain::llm::ModelConfig;
use conclave_swarm::{Subscription, TopologyKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    #[serde(default = "default_version")]
    pub version: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub topology: TopologyConfig,

    /// Default model for agents without their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,

    pub agents: BTreeMap<String, AgentRef>,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gatekeeper: Option<GatekeeperSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<TelemetrySettings>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mcp_servers: Vec<McpServerRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(rename = "type")]
    pub kind: TopologyKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<String>,

    /// Agent → patterns, in document order
    #[serde(default, skip_serializing_if = "Option::is_none", with = "ordered_subscriptions")]
    pub subscriptions: Option<Vec<Subscription>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRef {
    /// Manifest path, relative to the workflow file
    pub manifest: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatekeeperSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub default_action: PolicyAction,

    #[serde(default)]
    pub safe_tools: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<ToolPolicy>,
}

impl Default for GatekeeperSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            default_action: PolicyAction::Ask,
            safe_tools: Vec::new(),
            policies: Vec::new(),
        }
    }
}

impl GatekeeperSettings {
    pub fn to_config(&self) -> GatekeeperConfig {
        GatekeeperConfig {
            enabled: self.enabled,
            default_action: self.default_action,
            safe_tools: self.safe_tools.clone(),
            policies: self.policies.clone(),
            ..GatekeeperConfig::default()
        }
    }
}

/// `enabled` switches the CLI to JSON logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub enabled: bool,

    /// Accepted for compatibility. There is no OTLP exporter, so a
    /// configured endpoint is reported and otherwise ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp_endpoint: Option<String>,
}

impl TelemetrySettings {
    /// The configured OTLP endpoint, which nothing exports to.
    pub fn ignored_endpoint(&self) -> Option<&str> {
        self.otlp_endpoint.as_deref().filter(|endpoint| !endpoint.trim().is_empty())
    }
}

fn default_version() -> String {
    "1".to_string()
}

fn default_max_iterations() -> usize {
    30
}

impl WorkflowSpec {
    /// Check the topology against the declared agents.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let invalid = |msg: String| Err(WorkflowError::ValidationFailed(msg));

        if self.agents.is_empty() {
            return invalid("workflow must declare at least one agent".into());
        }

        let topology = &self.topology;
        match topology.kind {
            TopologyKind::Pipeline => {
                let order = match &topology.order {
                    Some(order) if !order.is_empty() => order,
                    _ => return invalid("pipeline topology requires 'order'".into()),
                };
                if let Some(name) = order.iter().find(|name| !self.agents.contains_key(*name)) {
                    return invalid(format!("pipeline order references unknown agent '{name}'"));
                }
            }
            TopologyKind::Star => {
                let Some(supervisor) = topology.supervisor.as_deref().filter(|s| !s.is_empty()) else {
                    return invalid("star topology requires 'supervisor'".into());
                };
                if !self.agents.contains_key(supervisor) {
                    return invalid(format!("star supervisor '{supervisor}' not in agents"));
                }
            }
            TopologyKind::Mesh => {
                let subscriptions = match &topology.subscriptions {
                    Some(subscriptions) if !subscriptions.is_empty() => subscriptions,
                    _ => return invalid("mesh topology requires 'subscriptions'".into()),
                };
                if let Some(sub) = subscriptions.iter().find(|s| !self.agents.contains_key(&s.agent)) {
                    return invalid(format!("mesh subscription key '{}' not in agents", sub.agent));
                }
            }
        }
        Ok(())
    }

    pub fn gatekeeper_enabled(&self) -> bool {
        self.gatekeeper.as_ref().is_some_and(|g| g.enabled)
    }

    pub fn telemetry_enabled(&self) -> bool {
        self.telemetry.as_ref().is_some_and(|t| t.enabled)
    }
}

/// `subscriptions` is a YAML mapping whose order matters (mesh commits follow
/// it), so it is read entry by entry into a list instead of a hash map.
mod ordered_subscriptions {
    use conclave_swarm::Subscription;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &Option<Vec<Subscription>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            None => serializer.serialize_none(),
            Some(subscriptions) => {
                let mut map = serializer.serialize_map(Some(subscriptions.len()))?;
                for subscription in subscriptions {
                    map.serialize_entry(&subscription.agent, &subscription.patterns)?;
                }
                map.end()
            }
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<Subscription>>, D::Error> {
        deserializer.deserialize_option(SubscriptionsVisitor)
    }

    struct SubscriptionsVisitor;

    impl<'de> Visitor<'de> for SubscriptionsVisitor {
        type Value = Option<Vec<Subscription>>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of agent name to a list of topic patterns")
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
            deserializer.deserialize_map(self)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut subscriptions = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((agent, patterns)) = map.next_entry::<String, Vec<String>>()? {
                subscriptions.push(Subscription { agent, patterns });
            }
            Ok(Some(subscriptions))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> WorkflowSpec {
        serde_yaml::from_str(yaml).unwrap()
    }

    const AGENTS: &str = "agents:\n  a: {manifest: a.yaml}\n  b: {manifest: b.yaml}\n";

    #[test]
    fn test_defaults() {
        let spec = parse(&format!("name: demo\ntopology: {{type: pipeline, order: [a, b]}}\n{AGENTS}"));
        assert_eq!(spec.version, "1");
        assert_eq!(spec.max_iterations, 30);
        assert!(spec.model.is_none());
        assert!(!spec.gatekeeper_enabled());
        assert!(!spec.telemetry_enabled());
        spec.validate().unwrap();
    }

    #[test]
    fn test_subscriptions_keep_document_order() {
        let spec = parse(&format!(
            "name: demo\ntopology:\n  type: mesh\n  subscriptions:\n    b: [\"x.*\"]\n    a: [\"**\", \"y\"]\n{AGENTS}"
        ));
        let subscriptions = spec.topology.subscriptions.as_ref().unwrap();
        assert_eq!(subscriptions[0], Subscription::new("b", ["x.*"]));
        assert_eq!(subscriptions[1], Subscription::new("a", ["**", "y"]));
        spec.validate().unwrap();

        let yaml = serde_yaml::to_string(&spec).unwrap();
        assert_eq!(parse(&yaml), spec);
    }

    #[test]
    fn test_otlp_endpoint_is_reported_as_ignored() {
        let spec = parse(&format!(
            "name: demo\ntopology: {{type: star, supervisor: a}}\ntelemetry:\n  enabled: true\n  otlp_endpoint: http://collector:4317\n{AGENTS}"
        ));
        assert!(spec.telemetry_enabled());
        let telemetry = spec.telemetry.unwrap();
        assert_eq!(telemetry.ignored_endpoint(), Some("http://collector:4317"));

        let blank = TelemetrySettings {
            enabled: true,
            otlp_endpoint: Some("  ".into()),
        };
        assert_eq!(blank.ignored_endpoint(), None);
        assert_eq!(TelemetrySettings::default().ignored_endpoint(), None);
    }

    #[test]
    fn test_gatekeeper_settings() {
        let spec = parse(&format!(
            "name: demo\ntopology: {{type: star, supervisor: a}}\ngatekeeper:\n  enabled: true\n  default_action: deny\n  safe_tools: [read_file]\n{AGENTS}"
        ));
        assert!(spec.gatekeeper_enabled());
        let config = spec.gatekeeper.unwrap().to_config();
        assert_eq!(config.default_action, PolicyAction::Deny);
        assert_eq!(config.safe_tools, vec!["read_file"]);
    }

    #[test]
    fn test_validation_messages() {
        let cases = [
            ("topology: {type: pipeline}", "pipeline topology requires 'order'"),
            ("topology: {type: pipeline, order: [a, ghost]}", "pipeline order references unknown agent 'ghost'"),
            ("topology: {type: star}", "star topology requires 'supervisor'"),
            ("topology: {type: star, supervisor: boss}", "star supervisor 'boss' not in agents"),
            ("topology: {type: mesh}", "mesh topology requires 'subscriptions'"),
            ("topology: {type: mesh, subscriptions: {ghost: [\"**\"]}}", "mesh subscription key 'ghost' not in agents"),
        ];
        for (topology, expected) in cases {
            let spec = parse(&format!("name: demo\n{topology}\n{AGENTS}"));
            match spec.validate() {
                Err(WorkflowError::ValidationFailed(msg)) => assert_eq!(msg, expected),
                other => panic!("{topology}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_agents_required() {
        let spec = parse("name: demo\ntopology: {type: pipeline, order: [a]}\nagents: {}\n");
        assert!(matches!(spec.validate(), Err(WorkflowError::ValidationFailed(_))));
    }
}
