//! Puca MCP Server
//!
//! A Model Context Protocol (MCP) server answering location questions from
//! OpenStreetMap data over the SSE (default) or stdio transport.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use osm_mcp_puca::config::Config;
use osm_mcp_puca::logging::init_logging;
use osm_mcp_puca::mcp::server::McpServer;
use osm_mcp_puca::mcp::sse;
use osm_mcp_puca::osm::client::OsmClient;

/// Puca MCP Server
#[derive(Parser)]
#[command(name = "osm-mcp-puca")]
#[command(author, version, about = "Puca - A Model Context Protocol server for OpenStreetMap")]
struct Cli {
    /// Transport to serve MCP on
    #[arg(long, value_enum, env = "MCP_TRANSPORT", default_value_t = Transport::Sse)]
    transport: Transport,

    /// Address to bind the SSE server to
    #[arg(long)]
    host: Option<String>,

    /// Port for the SSE server
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// Server-sent events over HTTP
    Sse,
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one tool locally and print its output
    Local {
        /// Address to search around
        #[arg(long)]
        address: String,

        /// Search radius in metres
        #[arg(long)]
        distance: Option<u32>,

        /// Tool to run
        #[arg(long, default_value = "get_vacant_buildings")]
        tool: String,
    },
    /// List the available tools
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    // stdout carries protocol messages or command output
    let keep_stdout_clean = cli.transport == Transport::Stdio || cli.command.is_some();
    init_logging(&config.log, keep_stdout_clean).context("failed to initialize logging")?;

    let osm_client = Arc::new(OsmClient::new(&config).context("failed to build HTTP client")?);
    let server = Arc::new(McpServer::new(osm_client, config.default_distance));

    match cli.command {
        Some(Commands::Local {
            address,
            distance,
            tool,
        }) => {
            let mut args = json!({ "address": address });
            if let Some(distance) = distance {
                args["distance"] = json!(distance);
            }
            let result = server.tools().call_tool(&tool, args).await;
            println!("{}", result.text_content());
            if result.is_error {
                std::process::exit(1);
            }
        }
        Some(Commands::Tools) => {
            for tool in server.tools().list_tools() {
                println!("{:<32} {}", tool.name, tool.description.unwrap_or_default());
            }
        }
        None => match cli.transport {
            Transport::Sse => sse::serve(server, &config.bind_address()).await?,
            Transport::Stdio => server.run_stdio().await?,
        },
    }

    Ok(())
}
