// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use conclave_core::domain::board::Board;
use conclave_sdk::{WorkflowLoader, WorkflowRunner, WorkflowSpec};
use std::path::{Path, PathBuf};
use tracing::info;

use super::inspect::load_snapshot;
use crate::output::board_summary;

const FALLBACK_GOAL: &str = "Execute workflow";

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Workflow YAML file
    #[arg(value_name = "WORKFLOW")]
    pub workflow: PathBuf,

    /// Goal for this run (defaults to the workflow name)
    #[arg(short, long)]
    pub goal: Option<String>,

    /// Force telemetry on (JSON logs) regardless of the workflow setting
    #[arg(long)]
    pub telemetry: bool,

    /// Validate the workflow without executing it
    #[arg(long)]
    pub dry_run: bool,

    /// Print the final board as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the final board snapshot to this file
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Start from a previously written board snapshot
    #[arg(long, value_name = "FILE")]
    pub resume: Option<PathBuf>,
}

impl RunArgs {
    /// Whether this run asks for telemetry, either by flag or in the workflow.
    /// A workflow that fails to load counts as no; the run reports the error.
    pub fn telemetry_requested(&self) -> bool {
        self.telemetry
            || WorkflowLoader::new(&self.workflow)
                .load()
                .map(|spec| spec.telemetry_enabled())
                .unwrap_or(false)
    }
}

pub fn effective_goal(goal: Option<&str>, spec: &WorkflowSpec) -> String {
    goal.filter(|g| !g.trim().is_empty())
        .or_else(|| Some(spec.name.as_str()).filter(|n| !n.trim().is_empty()))
        .unwrap_or(FALLBACK_GOAL)
        .to_string()
}

pub async fn handle_command(args: RunArgs) -> Result<()> {
    let spec = WorkflowLoader::new(&args.workflow)
        .load()
        .with_context(|| format!("Validation error in {}", args.workflow.display()))?;

    if args.dry_run {
        println!("{}", "✓ Workflow validated successfully".green());
        println!("  Name: {}", spec.name.bold());
        println!("  Topology: {}", spec.topology.kind);
        println!("  Agents: {}", spec.agents.keys().cloned().collect::<Vec<_>>().join(", "));
        return Ok(());
    }

    let goal = effective_goal(args.goal.as_deref(), &spec);
    let board = match &args.resume {
        Some(path) => load_snapshot(path)?,
        None => Board::new(),
    };

    info!(workflow = %spec.name, goal = %goal, "Running workflow");
    let base_dir = args.workflow.parent().map(Path::to_path_buf).unwrap_or_default();
    let board = WorkflowRunner::new(spec, base_dir)
        .run_with(board, &goal)
        .await
        .context("Execution error")?;

    if let Some(path) = &args.snapshot {
        std::fs::write(path, board.snapshot()?)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        info!(path = %path.display(), "Board snapshot written");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&board)?);
    } else {
        print!("{}", board_summary(&board));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> WorkflowSpec {
        WorkflowLoader::parse(&format!(
            "name: \"{name}\"\ntopology: {{type: pipeline, order: [a]}}\nagents:\n  a: {{manifest: a.yaml}}\n"
        ))
        .unwrap()
    }

    #[test]
    fn test_effective_goal() {
        assert_eq!(effective_goal(Some("Write a haiku"), &spec("poetry")), "Write a haiku");
        assert_eq!(effective_goal(None, &spec("poetry")), "poetry");
        assert_eq!(effective_goal(Some("  "), &spec("poetry")), "poetry");
    }

    #[test]
    fn test_telemetry_from_workflow_file() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::fs::write(
            file.path(),
            "name: t\ntelemetry: {enabled: true}\ntopology: {type: pipeline, order: [a]}\nagents:\n  a: {manifest: a.yaml}\n",
        )
        .unwrap();
        let args = RunArgs {
            workflow: file.path().to_path_buf(),
            goal: None,
            telemetry: false,
            dry_run: false,
            json: false,
            snapshot: None,
            resume: None,
        };
        assert!(args.telemetry_requested());

        let missing = RunArgs { workflow: PathBuf::from("/nonexistent.yaml"), ..args };
        assert!(!missing.telemetry_requested());
    }
}
