// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Terminal formatting shared by the subcommands.
//!
//! Every formatter returns a `String` so commands decide where it goes.

use clap::ValueEnum;
use colored::Colorize;
use conclave_core::domain::agent::AgentManifest;
use conclave_core::domain::board::Board;
use conclave_core::domain::message::ToolSchema;
use serde_json::Value;
use std::collections::BTreeMap;

/// Cells longer than this are cut with `...`.
pub const MAX_CELL_WIDTH: usize = 80;

/// Trace entries shown in a board summary.
pub const RECENT_TRACE_ENTRIES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BoardSection {
    Belief,
    Trace,
    Artifacts,
    Tasks,
}

pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Strings print bare; everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn board_summary(board: &Board) -> String {
    let belief = if board.belief_state.is_empty() { "(empty)" } else { board.belief_state.as_str() };
    let mut out = format!("\n{}\n", "Board Summary".bold());
    out.push_str(&format!("  Belief state: {belief}\n"));
    out.push_str(&format!("  Trace entries: {}\n", board.execution_trace.len()));
    out.push_str(&format!("  Artifacts: {} key(s)\n", board.artifacts.len()));
    out.push_str(&format!("  Pending tasks: {}\n", board.pending_tasks.len()));

    if !board.artifacts.is_empty() {
        out.push_str(&format!("\n{}\n", "Artifacts:".bold()));
        for (key, value) in &board.artifacts {
            out.push_str(&format!("  {key}: {}\n", truncate(&display_value(value), MAX_CELL_WIDTH)));
        }
    }

    if !board.execution_trace.is_empty() {
        out.push_str(&format!("\n{}\n", "Recent Trace:".bold()));
        let skip = board.execution_trace.len().saturating_sub(RECENT_TRACE_ENTRIES);
        for entry in &board.execution_trace[skip..] {
            out.push_str(&format!("  [{}] {}\n", entry.agent_id, entry.action));
        }
    }
    out
}

/// One part of the board as JSON.
pub fn board_section(board: &Board, section: BoardSection) -> Result<Value, serde_json::Error> {
    Ok(match section {
        BoardSection::Belief => Value::String(board.belief_state.clone()),
        BoardSection::Trace => serde_json::to_value(&board.execution_trace)?,
        BoardSection::Artifacts => Value::Object(board.artifacts.clone()),
        BoardSection::Tasks => serde_json::to_value(&board.pending_tasks)?,
    })
}

/// Plain rendering of a section: bare text for strings, pretty JSON otherwise.
pub fn render_section(value: &Value) -> Result<String, serde_json::Error> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => serde_json::to_string_pretty(other),
    }
}

fn column_width<'a>(header: &str, cells: impl Iterator<Item = &'a str>) -> usize {
    cells.map(|c| c.chars().count()).chain(std::iter::once(header.len())).max().unwrap_or(0)
}

pub fn tools_table(tools: &[ToolSchema]) -> String {
    let name_width = column_width("NAME", tools.iter().map(|t| t.name()));
    let mut out = format!("{}\n", "Discovered Tools".bold());
    out.push_str(&format!("{:<name_width$}  {}\n", "NAME", "DESCRIPTION"));
    for tool in tools {
        let name = format!("{:<name_width$}", tool.name());
        out.push_str(&format!(
            "{}  {}\n",
            name.cyan(),
            truncate(&tool.function.description, MAX_CELL_WIDTH)
        ));
    }
    out
}

pub fn agents_table(manifests: &BTreeMap<String, AgentManifest>) -> String {
    let name_width = column_width("NAME", manifests.values().map(|m| m.name.as_str()));
    let version_width = column_width("VERSION", manifests.values().map(|m| m.version.as_str()));
    let mut out = format!("{}\n", "Agent Manifests".bold());
    out.push_str(&format!(
        "{:<name_width$}  {:<version_width$}  {:<40}  {}\n",
        "NAME", "VERSION", "DESCRIPTION", "MCP SERVERS"
    ));
    for manifest in manifests.values() {
        let servers: Vec<&str> = manifest.mcp_servers.iter().map(|s| s.name.as_str()).collect();
        let servers = if servers.is_empty() { "-".to_string() } else { servers.join(", ") };
        let name = format!("{:<name_width$}", manifest.name);
        out.push_str(&format!(
            "{}  {:<version_width$}  {:<40}  {}\n",
            name.cyan(),
            manifest.version,
            truncate(&manifest.description, 40),
            servers
        ));
    }
    out
}
