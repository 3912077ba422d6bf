//! MCP Server implementation
//!
//! Dispatches JSON-RPC messages to protocol handlers and tools. The server
//! is transport-agnostic and shared by the SSE and stdio transports.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::Result;
use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;
use crate::osm::client::OsmClient;

/// MCP Server info
pub const SERVER_NAME: &str = "puca";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const INSTRUCTIONS: &str = "Answers questions about places using OpenStreetMap data. \
    Addresses are geocoded with Nominatim, distances are road distances from OSRM, and \
    nearby features come from the Overpass API. Search radii are in metres.";

/// MCP Server for OpenStreetMap tools
pub struct McpServer {
    /// Tool handler
    tool_handler: ToolHandler,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(osm_client: Arc<OsmClient>, default_distance: u32) -> Self {
        Self {
            tool_handler: ToolHandler::new(osm_client, default_distance),
        }
    }

    /// Tool handler, for running tools outside a protocol session
    pub fn tools(&self) -> &ToolHandler {
        &self.tool_handler
    }

    /// Run the server on stdio
    pub async fn run_stdio(&self) -> Result<()> {
        self.serve_lines(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await?;
        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    /// Answer newline-delimited JSON-RPC messages until `reader` is exhausted
    pub async fn serve_lines<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(&line).await {
                let mut response_str = serde_json::to_string(&response)?;
                response_str.push('\n');
                writer.write_all(response_str.as_bytes()).await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }

    /// Handle an incoming JSON-RPC message. Returns `None` for notifications.
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(message) {
            Ok(v) => v,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };
        self.handle_value(value).await
    }

    /// Handle an already-parsed JSON-RPC message
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let id = value
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(e.to_string()),
                ));
            }
        };

        tracing::debug!(method = %request.method, id = ?request.id, "Handling request");

        if request.is_notification() {
            self.handle_notification(&request);
            return None;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(&request),
            methods::PING => Ok(serde_json::json!({})),
            methods::LIST_TOOLS => self.handle_list_tools(),
            methods::CALL_TOOL => self.handle_call_tool(&request).await,
            _ => {
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::method_not_found(&request.method),
                ))
            }
        };

        Some(match response {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            methods::INITIALIZED => tracing::info!("Client initialized"),
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, request: &JsonRpcRequest) -> std::result::Result<Value, JsonRpcError> {
        if let Some(params) = request
            .params
            .clone()
            .and_then(|p| serde_json::from_value::<InitializeParams>(p).ok())
        {
            tracing::info!(
                client = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
                protocol_version = %params.protocol_version,
                "Client connecting"
            );
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        };

        to_result(result)
    }

    /// Handle list tools request
    fn handle_list_tools(&self) -> std::result::Result<Value, JsonRpcError> {
        to_result(ListToolsResult {
            tools: self.tool_handler.list_tools(),
        })
    }

    /// Handle call tool request
    async fn handle_call_tool(&self, request: &JsonRpcRequest) -> std::result::Result<Value, JsonRpcError> {
        let params: CallToolParams = match request.params.clone() {
            Some(p) => serde_json::from_value(p).map_err(|e| {
                JsonRpcError::invalid_params(format!("Invalid tool parameters: {}", e))
            })?,
            None => return Err(JsonRpcError::invalid_params("Missing tool parameters")),
        };

        tracing::info!(tool = %params.name, "Calling tool");
        let result = self
            .tool_handler
            .call_tool(&params.name, params.arguments)
            .await;
        to_result(result)
    }
}

fn to_result<T: serde::Serialize>(value: T) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}
