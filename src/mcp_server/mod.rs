/// <module>
///   <name>mcp_server</name>
///   <purpose>Model Context Protocol server for exchange documentation</purpose>
///   <description>
///     Exposes two tools per exchange adapter over line-delimited JSON-RPC
///     on stdin/stdout: the method list with the SDK README, and the stored
///     documentation of one method.
///   </description>
/// </module>

mod server;
mod tools;
mod types;

pub use server::{McpServer, SERVER_DESCRIPTION, SERVER_NAME};
pub use tools::{
    call_tool, input_schema, method_detail_tool_name, methods_tool_name, ExchangeTool, MethodDetailArgs,
    MethodsArgs, ToolKind, ToolTable,
};
pub use types::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolContent, ToolDefinition, ToolResult,
    DEFAULT_PROTOCOL_VERSION, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    PARSE_ERROR,
};

use std::sync::Arc;
use tokio::io::BufReader;

use crate::adapter::AdapterRegistry;
use crate::core::Result;

/// Serves the registry on the process stdin/stdout until stdin closes.
pub async fn run_stdio(registry: AdapterRegistry) -> Result<()> {
    let server = McpServer::new(Arc::new(registry));
    tracing::info!("Cryptocurrency Exchange SDK Documentation MCP service connected via stdio.");
    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}
