// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use conclave_core::domain::agent::AgentManifest;
use conclave_core::infrastructure::agent_manifest_parser::AgentManifestParser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::output::{agents_table, OutputFormat};

const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

#[derive(Subcommand, Debug)]
pub enum AgentsCommand {
    /// List the agent manifests in a directory
    List {
        /// Directory containing agent manifests
        #[arg(long = "dir", value_name = "DIR", default_value = "agents")]
        directory: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

pub fn handle_command(command: AgentsCommand) -> Result<()> {
    match command {
        AgentsCommand::List { directory, format } => list_agents(&directory, format),
    }
}

/// Every manifest directly under `dir`, keyed by manifest name.
pub fn load_manifests(dir: &Path) -> Result<BTreeMap<String, AgentManifest>> {
    let mut manifests = BTreeMap::new();
    for extension in MANIFEST_EXTENSIONS {
        let pattern = dir.join(format!("*.{extension}"));
        let paths = glob::glob(&pattern.to_string_lossy())
            .with_context(|| format!("Invalid manifest directory: {}", dir.display()))?;
        for path in paths {
            let path = path?;
            let manifest = AgentManifestParser::parse_file(&path)?;
            manifests.insert(manifest.name.clone(), manifest);
        }
    }
    Ok(manifests)
}

fn list_agents(directory: &Path, format: OutputFormat) -> Result<()> {
    if !directory.is_dir() {
        println!("{}", format!("Directory not found: {}", directory.display()).yellow());
        return Ok(());
    }

    let manifests = load_manifests(directory)?;
    if manifests.is_empty() {
        println!("{}", "No agent manifests found.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&manifests)?),
        OutputFormat::Table => print!("{}", agents_table(&manifests)),
    }
    Ok(())
}
