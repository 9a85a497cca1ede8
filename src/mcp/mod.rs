//! In-process tool servers
//!
//! An [`SdkMcpServer`] is a named table of tools that run inside this client.
//! The CLI sees each one as an MCP server and reaches it through
//! `mcp_message` control requests, which the [`ToolRouter`] answers.
//!
//! ```rust
//! use kodegen_claude_control::mcp::{SdkMcpServer, SdkMcpTool, ToolResult};
//! use serde_json::json;
//!
//! let server = SdkMcpServer::new("calc").tool(SdkMcpTool::new(
//!     "add",
//!     "Add two numbers",
//!     json!({"type": "object", "properties": {"a": {"type": "number"}, "b": {"type": "number"}}}),
//!     |args| async move {
//!         let sum = args["a"].as_f64().unwrap_or(0.0) + args["b"].as_f64().unwrap_or(0.0);
//!         Ok(ToolResult::text(sum.to_string()))
//!     },
//! ));
//! assert_eq!(server.tools().len(), 1);
//! ```

mod router;
mod server;

pub use router::{MCP_PROTOCOL_VERSION, ToolRouteError, ToolRouter};
pub use server::{SdkMcpServer, SdkMcpTool, ToolContent, ToolHandler, ToolResult, schema_of};
