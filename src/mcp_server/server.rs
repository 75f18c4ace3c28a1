/// <module>
///   <name>server</name>
///   <purpose>Line-delimited JSON-RPC loop of the MCP server</purpose>
///   <description>
///     One JSON message per line on the reader, one response per line on
///     the writer. Notifications get no response. Logging goes through
///     `tracing`, which the binaries point at stderr.
///   </description>
/// </module>
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::tools::{call_tool, ToolTable};
use super::types::{
    CallToolParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, DEFAULT_PROTOCOL_VERSION,
    INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::adapter::AdapterRegistry;
use crate::core::{DocsError, Result};

pub const SERVER_NAME: &str = "crypto-exchange-mcp";
pub const SERVER_DESCRIPTION: &str =
    "Cryptocurrency Exchange Documentation Service, providing API methods and documentation";

pub struct McpServer {
    registry: Arc<AdapterRegistry>,
    tools: ToolTable,
}

impl McpServer {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        let tools = ToolTable::from_registry(&registry);
        info!("{} tools registered for {} exchanges", tools.len(), registry.len());
        Self { registry, tools }
    }

    pub fn tools(&self) -> &ToolTable {
        &self.tools
    }

    /// Serves until the reader reaches EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.map_err(|e| DocsError::io("<stdin>", e))? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!("Received: {}", line);

            if let Some(response) = self.handle_line(line) {
                let response_str = serde_json::to_string(&response)?;
                debug!("Sent: {}", response_str);
                write_line(&mut writer, &response_str).await?;
            }
        }

        info!("Input closed, MCP server stopping");
        Ok(())
    }

    /// Response for one input line; `None` for notifications.
    pub fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse request: {}", e);
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::new(PARSE_ERROR, "Parse error"),
                ));
            }
        };

        let is_notification = value.get("id").is_none();
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                warn!("Invalid request: {}", e);
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::new(INVALID_REQUEST, "Invalid Request"),
                ));
            }
        };

        if is_notification {
            debug!("Notification: {}", request.method);
            return None;
        }
        Some(self.handle_request(request))
    }

    pub fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize(request.params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.definitions() })),
            "tools/call" => self.call(request.params),
            other => Err(JsonRpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", other))),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        }
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let protocol_version = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": SERVER_DESCRIPTION
        })
    }

    fn call(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing tools/call params"))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid tools/call params: {}", e)))
            })?;

        let tool = self
            .tools
            .find(&params.name)
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, format!("Unknown tool: {}", params.name)))?;
        let adapter = self
            .registry
            .get(tool.exchange)
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, format!("Unknown tool: {}", params.name)))?;

        debug!("Calling {}", params.name);
        let result = call_tool(adapter, tool.kind, params.arguments).map_err(|e| JsonRpcError::from(&e))?;
        serde_json::to_value(result).map_err(|e| JsonRpcError::from(&DocsError::from(e)))
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<()> {
    let io = |e: std::io::Error| DocsError::io("<stdout>", e);
    writer.write_all(line.as_bytes()).await.map_err(io)?;
    writer.write_all(b"\n").await.map_err(io)?;
    writer.flush().await.map_err(io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ExchangeProfile, OfflineAdapter};
    use crate::exchange::ExchangeId;
    use crate::offline_data::{MethodEntry, OfflineData};
    use pretty_assertions::assert_eq;

    fn server() -> McpServer {
        let mut registry = AdapterRegistry::new();
        let mut data = OfflineData::default();
        data.methods
            .insert("getTickers".to_string(), MethodEntry::new("GET /api/v5/market/tickers", None));
        registry.register(Box::new(OfflineAdapter::new(
            ExchangeProfile::for_exchange(ExchangeId::Okx),
            data,
        )));
        registry.register(Box::new(OfflineAdapter::empty(ExchangeId::OkxDex)));
        McpServer::new(Arc::new(registry))
    }

    fn request(line: &str) -> JsonRpcResponse {
        server().handle_line(line).unwrap()
    }

    #[test]
    fn test_initialize() {
        let response = request(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26"}}"#);
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], "crypto-exchange-mcp");

        let response = request(r#"{"jsonrpc":"2.0","id":2,"method":"initialize"}"#);
        assert_eq!(response.result.unwrap()["protocolVersion"], DEFAULT_PROTOCOL_VERSION);
    }

    #[test]
    fn test_tools_list_order() {
        let response = request(r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#);
        assert_eq!(response.id, json!("a"));
        let names: Vec<String> = response.result.unwrap()["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "okx_methods",
                "okx_method_detail",
                "okx_dex_api_methods",
                "okx_dex_api_method_detail"
            ]
        );
    }

    #[test]
    fn test_protocol_errors() {
        let server = server();
        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .is_none());

        let parse = server.handle_line("{oops").unwrap();
        assert_eq!(parse.id, Value::Null);
        assert_eq!(parse.error.unwrap().code, PARSE_ERROR);

        let unknown = server.handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#).unwrap();
        assert_eq!(unknown.error.unwrap().code, METHOD_NOT_FOUND);

        let bad_tool = server
            .handle_line(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"kraken_methods"}}"#)
            .unwrap();
        assert_eq!(bad_tool.error.unwrap().code, INVALID_PARAMS);

        let bad_args = server
            .handle_line(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"okx_method_detail","arguments":{}}}"#)
            .unwrap();
        assert_eq!(bad_args.error.unwrap().code, INVALID_PARAMS);
    }

    #[test]
    fn test_tools_call() {
        let response = request(
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"okx_method_detail","arguments":{"method":"getTickers"}}}"#,
        );
        assert_eq!(
            response.result.unwrap(),
            json!({"content": [{"type": "text", "text": "{\"doc\":\"GET /api/v5/market/tickers\"}"}]})
        );

        let response = request(
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"okx_method_detail","arguments":{"method":"getTicker"}}}"#,
        );
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("getTickers"));
    }

    #[tokio::test]
    async fn test_serve_over_buffers() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );
        let mut output = Vec::new();
        server().serve(input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<JsonRpcResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].result, Some(json!({})));
        assert_eq!(lines[1].id, json!(2));
    }
}
