// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent Manifest Parser
//!
//! Loads [`AgentManifest`]s from YAML or JSON files.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Parse external manifest files → Domain objects
//!
//! # Manifest Format
//!
//! ```yaml
//! name: researcher
//! description: Finds sources for a topic
//! system_prompt_template: |
//!   You are $name. Cite every source.
//! model_requirements:
//!   min_context_window: 8192
//!   preferred_model: openai/gpt-4o
//! mcp_servers:
//!   - name: fs
//!     command: npx @modelcontextprotocol/server-filesystem /tmp
//! ```

use crate::domain::agent::AgentManifest;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to parse manifest {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("Invalid manifest {path}: {detail}")]
    Invalid { path: PathBuf, detail: String },
}

/// Serialization format of a manifest document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    /// `.json` selects JSON; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ManifestFormat::Json,
            _ => ManifestFormat::Yaml,
        }
    }
}

// ============================================================================
// Parser API
// ============================================================================

pub struct AgentManifestParser;

impl AgentManifestParser {
    /// Parse a manifest document. `origin` is only used in error messages.
    pub fn parse_str(content: &str, format: ManifestFormat, origin: &Path) -> Result<AgentManifest, ManifestError> {
        let parsed = match format {
            ManifestFormat::Yaml => serde_yaml::from_str::<AgentManifest>(content).map_err(|e| e.to_string()),
            ManifestFormat::Json => serde_json::from_str::<AgentManifest>(content).map_err(|e| e.to_string()),
        };
        let manifest = parsed.map_err(|detail| ManifestError::Parse {
            path: origin.to_path_buf(),
            detail,
        })?;

        if manifest.name.trim().is_empty() {
            return Err(ManifestError::Invalid {
                path: origin.to_path_buf(),
                detail: "'name' must not be empty".to_string(),
            });
        }
        Ok(manifest)
    }

    /// Read and parse a manifest file.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<AgentManifest, ManifestError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            detail: format!("failed to read file: {e}"),
        })?;
        Self::parse_str(&content, ManifestFormat::from_path(path), path)
    }

    /// Serialize a manifest back to YAML.
    pub fn to_yaml(manifest: &AgentManifest) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(manifest)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::McpTransportKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_minimal_yaml() {
        let file = write_temp(".yaml", "name: writer\n");
        let manifest = AgentManifestParser::parse_file(file.path()).unwrap();

        assert_eq!(manifest.name, "writer");
        assert_eq!(manifest.version, "1.0");
        assert_eq!(manifest.system_prompt_template, "You are $name.");
        assert_eq!(manifest.model_requirements.min_context_window, 4096);
        assert!(manifest.mcp_servers.is_empty());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
name: researcher
version: "2.1"
description: Finds sources
system_prompt_template: "You are ${name}, a careful researcher."
model_requirements:
  min_context_window: 8192
  capabilities: [tools]
  preferred_model: anthropic/claude-3-5-sonnet
mcp_servers:
  - name: search
    transport: websocket
    url: ws://localhost:9000
  - name: fs
    command: npx server-fs /tmp
    env:
      ROOT: /tmp
metadata:
  team: research
"#;
        let file = write_temp(".yml", yaml);
        let manifest = AgentManifestParser::parse_file(file.path()).unwrap();

        assert_eq!(manifest.version, "2.1");
        assert_eq!(manifest.model_requirements.preferred_model.as_deref(), Some("anthropic/claude-3-5-sonnet"));
        assert_eq!(manifest.mcp_servers.len(), 2);
        assert_eq!(manifest.mcp_servers[0].transport, McpTransportKind::Websocket);
        assert_eq!(manifest.mcp_servers[1].transport, McpTransportKind::Stdio);
        assert_eq!(manifest.mcp_servers[1].env.get("ROOT").map(String::as_str), Some("/tmp"));
        assert_eq!(manifest.metadata["team"], "research");
    }

    #[test]
    fn test_parse_json_by_extension() {
        let file = write_temp(".json", r#"{"name": "critic", "description": "Reviews drafts"}"#);
        let manifest = AgentManifestParser::parse_file(file.path()).unwrap();
        assert_eq!(manifest.name, "critic");
        assert_eq!(manifest.description, "Reviews drafts");
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ManifestFormat::from_path(Path::new("a.JSON")), ManifestFormat::Json);
        assert_eq!(ManifestFormat::from_path(Path::new("a.yaml")), ManifestFormat::Yaml);
        assert_eq!(ManifestFormat::from_path(Path::new("manifest")), ManifestFormat::Yaml);
    }

    #[test]
    fn test_empty_name_is_invalid() {
        let file = write_temp(".yaml", "name: \"  \"\n");
        assert!(matches!(
            AgentManifestParser::parse_file(file.path()),
            Err(ManifestError::Invalid { .. })
        ));
    }

    #[test]
    fn test_parse_errors() {
        let file = write_temp(".yaml", "description: no name here\n");
        assert!(matches!(
            AgentManifestParser::parse_file(file.path()),
            Err(ManifestError::Parse { .. })
        ));

        let file = write_temp(".json", "{not json");
        assert!(matches!(
            AgentManifestParser::parse_file(file.path()),
            Err(ManifestError::Parse { .. })
        ));

        let err = AgentManifestParser::parse_file("/nonexistent/agent.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/agent.yaml"));
    }

    #[test]
    fn test_yaml_round_trip() {
        let file = write_temp(".yaml", "name: writer\ndescription: Drafts text\n");
        let manifest = AgentManifestParser::parse_file(file.path()).unwrap();
        let yaml = AgentManifestParser::to_yaml(&manifest).unwrap();
        let reparsed = AgentManifestParser::parse_str(&yaml, ManifestFormat::Yaml, Path::new("inline")).unwrap();
        assert_eq!(reparsed, manifest);
    }
}
