// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Conclave CLI
//!
//! The `conclave` binary runs multi-agent workflows described in YAML.
//!
//! ## Commands
//!
//! - `conclave run <workflow>` - validate and execute a workflow
//! - `conclave inspect <snapshot>` - print a saved board
//! - `conclave agents list` - list the agent manifests in a directory
//! - `conclave tools discover <server>` - list the tools an MCP server offers
//!
//! Logs go to stderr so `--json` output on stdout stays machine readable.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use conclave_cli::commands::{self, AgentsCommand, InspectArgs, RunArgs, ToolsCommand};

/// Conclave - run teams of LLM agents over a shared board
#[derive(Parser)]
#[command(name = "conclave")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, env = "CONCLAVE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, env = "CONCLAVE_LOG_FORMAT", default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Compact,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow
    #[command(name = "run")]
    Run(RunArgs),

    /// Inspect a board snapshot
    #[command(name = "inspect")]
    Inspect(InspectArgs),

    /// Agent manifests
    #[command(name = "agents")]
    Agents {
        #[command(subcommand)]
        command: AgentsCommand,
    },

    /// MCP tools
    #[command(name = "tools")]
    Tools {
        #[command(subcommand)]
        command: ToolsCommand,
    },
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    let result = runtime.block_on(async_main());
    // a timed-out approval prompt can leave a stdin read blocked; do not wait for it
    runtime.shutdown_background();
    result
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();

    let telemetry = matches!(&cli.command, Some(Commands::Run(args)) if args.telemetry_requested());
    let format = if telemetry { LogFormat::Json } else { cli.log_format };
    init_logging(&cli.log_level, format)?;

    match cli.command {
        Some(Commands::Run(args)) => commands::run::handle_command(args).await,
        Some(Commands::Inspect(args)) => commands::inspect::handle_command(args),
        Some(Commands::Agents { command }) => commands::agents::handle_command(command),
        Some(Commands::Tools { command }) => commands::tools::handle_command(command).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }

    Ok(())
}
