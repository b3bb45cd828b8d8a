//! JSON-RPC 2.0 MCP server over stdio.
//!
//! One request per line on stdin, one response per line on stdout, logs on
//! stderr. Notifications (no id) are never answered. Tool-call failures are
//! reported in-band as tool content with `isError`, so only malformed JSON
//! or unknown methods produce JSON-RPC error objects.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::error::{McpError, Result};
use crate::tools::ToolRegistry;

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

const PROTOCOL_VERSION: &str = "2024-11-05";

const INSTRUCTIONS: &str = "doc2md converts PDF, DOCX, and PPTX files to clean Markdown on \
     disk. Each tool accepts either a file_path or base64_content plus file_name. If a \
     file-not-found error comes back (common in Docker or sandboxed environments), retry \
     with base64_content instead of file_path. Without an output_dir, output lands next to \
     the source file (file_path mode) or in the current working directory (base64 mode).";

/// JSON-RPC request, or notification when `id` is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol marker, "2.0".
    #[serde(default)]
    pub jsonrpc: String,
    /// Request id; notifications carry none.
    #[serde(default)]
    pub id: Option<JsonValue>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Option<JsonValue>,
}

/// JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol marker, "2.0".
    pub jsonrpc: String,
    /// Echoed request id.
    pub id: JsonValue,
    /// Result payload, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    /// Error payload, present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

impl JsonRpcResponse {
    fn success(id: JsonValue, result: JsonValue) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: JsonValue, code: i64, message: String) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message }),
        }
    }
}

/// MCP server: owns the tool registry and speaks JSON-RPC over stdio.
pub struct McpServer {
    registry: ToolRegistry,
}

impl McpServer {
    /// Create a server with the default tool registry.
    pub fn new() -> Self {
        McpServer {
            registry: ToolRegistry::new(),
        }
    }

    /// Serve JSON-RPC over stdin/stdout until stdin closes.
    pub async fn run(&mut self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(stdin).lines();

        info!("doc2md MCP server listening on stdio");
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(line) {
                Ok(request) => self.handle_request(request),
                Err(e) => {
                    error!("Parse error: {e}");
                    Some(JsonRpcResponse::error(
                        JsonValue::Null,
                        PARSE_ERROR,
                        format!("Parse error: {e}"),
                    ))
                }
            };

            if let Some(response) = response {
                let mut out = serde_json::to_string(&response)
                    .map_err(|e| McpError::Internal(e.to_string()))?;
                out.push('\n');
                stdout.write_all(out.as_bytes()).await?;
                stdout.flush().await?;
            }
        }
        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle one request. Returns `None` for notifications.
    pub fn handle_request(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = match req.id {
            Some(id) => id,
            None => {
                debug!("Notification: {}", req.method);
                return None;
            }
        };

        let response = match req.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                JsonRpcResponse::success(id, json!({ "tools": self.registry.tools() }))
            }
            "tools/call" => self.handle_tool_call(id, req.params),
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };
        Some(response)
    }

    fn initialize_result(&self) -> JsonValue {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "instructions": INSTRUCTIONS,
        })
    }

    fn handle_tool_call(&self, id: JsonValue, params: Option<JsonValue>) -> JsonRpcResponse {
        let params = params.unwrap_or_else(|| json!({}));
        let name = match params.get("name").and_then(|v| v.as_str()) {
            Some(name) => name.to_string(),
            None => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing tool name".to_string())
            }
        };
        let args: Map<String, JsonValue> = params
            .get("arguments")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        info!("Tool call: {name}");
        match self.registry.dispatch(&name, args) {
            Ok(value) => JsonRpcResponse::success(id, tool_content(&value, false)),
            Err(e) => {
                error!("Tool {name} failed: {e}");
                let payload = json!({ "success": false, "error": e.to_string() });
                JsonRpcResponse::success(id, tool_content(&payload, true))
            }
        }
    }
}

impl Default for McpServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a tool result in the MCP content envelope.
fn tool_content(value: &JsonValue, is_error: bool) -> JsonValue {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error
    })
}
