// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Args;
use conclave_core::domain::board::Board;
use std::path::{Path, PathBuf};

use crate::output::{board_section, board_summary, render_section, BoardSection};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Board snapshot written by `conclave run --snapshot`
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Show only one section of the board
    #[arg(long, value_enum)]
    pub section: Option<BoardSection>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn load_snapshot(path: &Path) -> Result<Board> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    Board::restore(&data).with_context(|| format!("Error loading snapshot: {}", path.display()))
}

pub fn render(board: &Board, section: Option<BoardSection>, json: bool) -> Result<String> {
    let rendered = match (section, json) {
        (Some(section), true) => serde_json::to_string_pretty(&board_section(board, section)?)?,
        (Some(section), false) => render_section(&board_section(board, section)?)?,
        (None, true) => serde_json::to_string_pretty(board)?,
        (None, false) => board_summary(board),
    };
    Ok(rendered)
}

pub fn handle_command(args: InspectArgs) -> Result<()> {
    let board = load_snapshot(&args.snapshot)?;
    println!("{}", render(&board, args.section, args.json)?);
    Ok(())
}
