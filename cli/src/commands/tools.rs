// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use conclave_core::domain::agent::{McpServerRef, McpTransportKind};
use conclave_core::domain::message::ToolSchema;
use conclave_core::domain::tool::ToolProvider;
use conclave_core::infrastructure::mcp::McpClient;
use std::collections::HashMap;
use tracing::warn;

use crate::output::{tools_table, OutputFormat};

const DISCOVER_SERVER_NAME: &str = "cli-discover";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    Stdio,
    Websocket,
}

#[derive(Subcommand, Debug)]
pub enum ToolsCommand {
    /// Discover the tools an MCP server offers
    Discover {
        /// Command line (stdio) or URL (websocket) of the server
        #[arg(value_name = "SERVER")]
        server: String,

        /// MCP server transport
        #[arg(long, value_enum, default_value_t = TransportArg::Stdio)]
        transport: TransportArg,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

pub async fn handle_command(command: ToolsCommand) -> Result<()> {
    match command {
        ToolsCommand::Discover { server, transport, format } => {
            let tools = discover(&server_ref(&server, transport))
                .await
                .with_context(|| format!("Discovery error for {server}"))?;
            print_tools(&tools, format)
        }
    }
}

pub fn server_ref(server: &str, transport: TransportArg) -> McpServerRef {
    let (transport, command, url) = match transport {
        TransportArg::Stdio => (McpTransportKind::Stdio, Some(server.to_string()), None),
        TransportArg::Websocket => (McpTransportKind::Websocket, None, Some(server.to_string())),
    };
    McpServerRef {
        name: DISCOVER_SERVER_NAME.to_string(),
        transport,
        command,
        url,
        env: HashMap::new(),
    }
}

async fn discover(server: &McpServerRef) -> Result<Vec<ToolSchema>> {
    let client = McpClient::new(server)?;
    client.connect().await?;
    let tools = client.discover_tools().await;
    if let Err(e) = client.close().await {
        warn!(server = %server.name, error = %e, "Failed to close MCP server");
    }
    Ok(tools?)
}

fn print_tools(tools: &[ToolSchema], format: OutputFormat) -> Result<()> {
    if tools.is_empty() {
        println!("{}", "No tools discovered.".yellow());
        return Ok(());
    }
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(tools)?),
        OutputFormat::Table => print!("{}", tools_table(tools)),
    }
    Ok(())
}
