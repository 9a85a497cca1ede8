//! MCP (Model Context Protocol) server configuration types
//!
//! This module contains types for configuring external MCP servers (stdio,
//! StreamableHTTP, HTTP) and in-process SDK servers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::mcp::SdkMcpServer;

// ============================================================================
// MCP Server Types
// ============================================================================

/// MCP stdio server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpStdioServerConfig {
    /// Server type (stdio)
    #[serde(skip_serializing_if = "Option::is_none", rename = "type")]
    pub server_type: Option<String>,
    /// Command to execute
    pub command: String,
    /// Command arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Environment variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
}

/// MCP StreamableHTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpStreamableHttpConfig {
    /// Server type (streamable_http)
    #[serde(rename = "type")]
    pub server_type: String,
    /// Server URL
    pub url: String,
    /// HTTP headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

/// MCP HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpHttpServerConfig {
    /// Server type (http)
    #[serde(rename = "type")]
    pub server_type: String,
    /// Server URL
    pub url: String,
    /// HTTP headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

/// MCP server configuration enum
#[derive(Debug, Clone)]
pub enum McpServerConfig {
    /// Stdio-based MCP server
    Stdio(McpStdioServerConfig),
    /// StreamableHTTP-based MCP server
    StreamableHttp(McpStreamableHttpConfig),
    /// HTTP-based MCP server
    Http(McpHttpServerConfig),
    /// In-process server whose tools run inside this client
    Sdk(SdkMcpServer),
}

impl McpServerConfig {
    /// Whether this server runs in-process
    #[must_use]
    pub const fn is_sdk(&self) -> bool {
        matches!(self, Self::Sdk(_))
    }

    /// Entry for the CLI's `--mcp-config` document
    ///
    /// In-process servers are announced as `{"type":"sdk","name":...}`; the
    /// CLI then reaches them through `mcp_message` control requests.
    pub fn to_launch_value(&self, name: &str) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::Stdio(config) => serde_json::to_value(config),
            Self::StreamableHttp(config) => serde_json::to_value(config),
            Self::Http(config) => serde_json::to_value(config),
            Self::Sdk(_) => Ok(serde_json::json!({ "type": "sdk", "name": name })),
        }
    }
}

/// MCP servers container
#[derive(Debug, Clone, Default)]
pub enum McpServers {
    /// No MCP servers
    #[default]
    None,
    /// Dictionary of MCP servers
    Dict(HashMap<String, McpServerConfig>),
    /// Path to MCP servers configuration file
    Path(PathBuf),
}

impl McpServers {
    /// In-process servers, keyed by the name the CLI will route with
    pub fn sdk_servers(&self) -> impl Iterator<Item = (&str, &SdkMcpServer)> {
        let dict = match self {
            Self::Dict(dict) => Some(dict),
            Self::None | Self::Path(_) => None,
        };
        dict.into_iter().flat_map(|dict| {
            dict.iter().filter_map(|(name, config)| match config {
                McpServerConfig::Sdk(server) => Some((name.as_str(), server)),
                _ => None,
            })
        })
    }

    /// Whether no server is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Dict(dict) => dict.is_empty(),
            Self::Path(_) => false,
        }
    }
}
