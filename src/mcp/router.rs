//! Routing of list/call requests to in-process servers
//!
//! The router answers the JSON-RPC messages the CLI forwards in `mcp_message`
//! control requests. Handler failures become structured results; nothing a
//! tool does can take the router down.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use super::server::{SdkMcpServer, ToolResult};
use crate::error::ClaudeError;
use crate::types::mcp::McpServers;
use crate::types::options::DEFAULT_MAX_BUFFER_SIZE;

/// MCP protocol version reported by `initialize`
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// Why a list or call could not produce a result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolRouteError {
    /// No server under that routing key
    #[error("Server '{0}' not found")]
    ServerNotFound(String),

    /// The server has no such tool
    #[error("Tool '{tool}' not found on server '{server}'")]
    NotFound {
        /// Server name
        server: String,
        /// Requested tool
        tool: String,
    },

    /// The handler returned an error or panicked
    #[error("Tool handler failed: {0}")]
    HandlerError(String),

    /// Input or output above the configured ceiling
    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Serialized size
        size: usize,
        /// Configured ceiling
        limit: usize,
    },
}

impl ToolRouteError {
    /// Stable machine-readable kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ServerNotFound(_) => "server_not_found",
            Self::NotFound { .. } => "not_found",
            Self::HandlerError(_) => "handler_error",
            Self::PayloadTooLarge { .. } => "payload_too_large",
        }
    }
}

impl From<ToolRouteError> for ClaudeError {
    fn from(err: ToolRouteError) -> Self {
        Self::mcp(err.to_string())
    }
}

/// Router over the in-process servers of one session
#[derive(Clone, Debug)]
pub struct ToolRouter {
    servers: HashMap<String, SdkMcpServer>,
    max_payload: usize,
}

impl ToolRouter {
    /// Create an empty router
    #[must_use]
    pub fn new(max_payload: usize) -> Self {
        Self {
            servers: HashMap::new(),
            max_payload,
        }
    }

    /// Router over the `Sdk` entries of `servers`
    #[must_use]
    pub fn from_servers(servers: &McpServers, max_payload: usize) -> Self {
        let mut router = Self::new(max_payload);
        for (name, server) in servers.sdk_servers() {
            router.register(name, server.clone());
        }
        router
    }

    /// Make `server` addressable as `name`
    pub fn register(&mut self, name: impl Into<String>, server: SdkMcpServer) {
        self.servers.insert(name.into(), server);
    }

    /// Whether no server is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Registered routing keys
    pub fn server_names(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    fn server(&self, name: &str) -> Result<&SdkMcpServer, ToolRouteError> {
        self.servers
            .get(name)
            .ok_or_else(|| ToolRouteError::ServerNotFound(name.to_string()))
    }

    fn check_size(&self, value: &impl serde::Serialize) -> Result<(), ToolRouteError> {
        let size = serde_json::to_vec(value).map_or(0, |bytes| bytes.len());
        if size > self.max_payload {
            return Err(ToolRouteError::PayloadTooLarge {
                size,
                limit: self.max_payload,
            });
        }
        Ok(())
    }

    /// Tool descriptors of `server`, in registration order
    ///
    /// # Errors
    /// Returns `ServerNotFound` for an unknown server
    pub fn list(&self, server: &str) -> Result<Vec<Value>, ToolRouteError> {
        Ok(self
            .server(server)?
            .tools()
            .iter()
            .map(super::SdkMcpTool::descriptor)
            .collect())
    }

    /// Run `tool` on `server` with `input`
    ///
    /// # Errors
    /// Returns `ServerNotFound`, `NotFound`, `HandlerError` (error or panic in
    /// the handler), or `PayloadTooLarge` (input or output above the ceiling)
    pub async fn call(
        &self,
        server: &str,
        tool: &str,
        input: Value,
    ) -> Result<ToolResult, ToolRouteError> {
        let descriptor = self
            .server(server)?
            .get(tool)
            .ok_or_else(|| ToolRouteError::NotFound {
                server: server.to_string(),
                tool: tool.to_string(),
            })?;
        self.check_size(&input)?;

        let handler = std::sync::Arc::clone(&descriptor.handler);
        let result = tokio::spawn(async move { handler(input).await })
            .await
            .map_err(|join| {
                if join.is_panic() {
                    ToolRouteError::HandlerError(format!("tool '{tool}' panicked"))
                } else {
                    ToolRouteError::HandlerError(format!("tool '{tool}' was cancelled"))
                }
            })?
            .map_err(|e| ToolRouteError::HandlerError(e.to_string()))?;

        self.check_size(&result)?;
        Ok(result)
    }

    /// Answer one JSON-RPC message addressed to `server`
    ///
    /// Always returns a JSON-RPC response object; routing failures are
    /// reported inside it.
    pub async fn handle_message(&self, server: &str, message: &Value) -> Value {
        let id = message.get("id").cloned().unwrap_or(Value::Null);
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");
        let params = message.get("params").cloned().unwrap_or(Value::Null);

        let instance = match self.server(server) {
            Ok(instance) => instance,
            Err(err) => return rpc_error(id, METHOD_NOT_FOUND, &err),
        };

        match method {
            "initialize" => rpc_result(
                id,
                serde_json::json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": instance.name(),
                        "version": instance.server_version(),
                    },
                }),
            ),
            "notifications/initialized" => rpc_result(id, serde_json::json!({})),
            "tools/list" => match self.list(server) {
                Ok(tools) => rpc_result(id, serde_json::json!({ "tools": tools })),
                Err(err) => rpc_error(id, METHOD_NOT_FOUND, &err),
            },
            "tools/call" => {
                let Some(name) = params.get("name").and_then(Value::as_str) else {
                    return serde_json::json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": {
                            "code": INVALID_PARAMS,
                            "message": "tools/call requires params.name",
                        },
                    });
                };
                let arguments = params
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| serde_json::json!({}));

                match self.call(server, name, arguments).await {
                    Ok(result) => match serde_json::to_value(&result) {
                        Ok(value) => rpc_result(id, value),
                        Err(e) => rpc_result(
                            id,
                            tool_error_value(&format!("Failed to encode tool result: {e}")),
                        ),
                    },
                    Err(err @ ToolRouteError::HandlerError(_)) => {
                        log::warn!("Tool {server}/{name} failed: {err}");
                        rpc_result(id, tool_error_value(&err.to_string()))
                    }
                    Err(err) => rpc_error(id, INVALID_PARAMS, &err),
                }
            }
            other => serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {
                    "code": METHOD_NOT_FOUND,
                    "message": format!("Method '{other}' not found"),
                },
            }),
        }
    }
}

impl Default for ToolRouter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER_SIZE)
    }
}

fn tool_error_value(message: &str) -> Value {
    serde_json::to_value(ToolResult::error(message)).unwrap_or_else(|_| {
        serde_json::json!({
            "content": [{ "type": "text", "text": message }],
            "isError": true,
        })
    })
}

fn rpc_result(id: Value, result: Value) -> Value {
    serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn rpc_error(id: Value, code: i64, err: &ToolRouteError) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": err.to_string(),
            "data": { "kind": err.kind() },
        },
    })
}
