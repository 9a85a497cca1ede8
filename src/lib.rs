#![recursion_limit = "256"]

//! # Claude Code control-protocol client for Rust
//!
//! Drives the Claude Code CLI as a long-lived child process over its
//! line-delimited JSON control protocol. The crate offers a one-shot
//! [`query()`] function and a stateful [`ClaudeSDKClient`] with runtime
//! control: model switching, permission-mode changes, interrupts, file
//! rewind, tool permission callbacks, lifecycle hooks, and in-process tools
//! exposed to the CLI as MCP servers.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kodegen_claude_control::{ClaudeAgentOptions, Message, query};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = query("What is 2 + 2?", ClaudeAgentOptions::default()).await?;
//!     let mut stream = Box::pin(stream);
//!
//!     while let Some(message) = stream.next().await {
//!         if let Message::Assistant { message, .. } = message? {
//!             log::info!("Claude: {}", message.text());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Sessions with [`ClaudeSDKClient`]
//!
//! ```no_run
//! # use kodegen_claude_control::{ClaudeAgentOptions, ClaudeSDKClient};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ClaudeAgentOptions::builder().max_turns(10).build();
//! let mut client = ClaudeSDKClient::connect(options).await?;
//!
//! let mut turn = client.query("Hello, Claude!").await?;
//! while let Some(event) = turn.recv().await {
//!     log::info!("{:?}", event?);
//! }
//!
//! client.set_model("claude-sonnet-4-5").await?;
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Hooks
//!
//! ```no_run
//! # use kodegen_claude_control::{ClaudeAgentOptions, HookEvent, HookManager, HookOutput};
//! # use kodegen_claude_control::hooks::HookMatcherBuilder;
//! let guard = HookManager::callback(|input, _tool_use_id, _context| async move {
//!     if input["tool_input"]["command"].as_str() == Some("rm -rf /") {
//!         return Ok(HookOutput::deny("Refusing to wipe the disk"));
//!     }
//!     Ok(HookOutput::default())
//! });
//!
//! let options = ClaudeAgentOptions::builder()
//!     .add_hook(
//!         HookEvent::PreToolUse,
//!         HookMatcherBuilder::new(Some("Bash")).add_hook(guard).build(),
//!     )
//!     .build();
//! ```
//!
//! ## Permission Control
//!
//! ```no_run
//! # use kodegen_claude_control::{ClaudeAgentOptions, PermissionManager, PermissionResult};
//! let permission_callback = PermissionManager::callback(|context| async move {
//!     match context.tool_name.as_str() {
//!         "Read" | "Glob" => Ok(PermissionResult::allow()),
//!         _ => Ok(PermissionResult::deny("Tool not allowed")),
//!     }
//! });
//!
//! let options = ClaudeAgentOptions::builder()
//!     .can_use_tool(permission_callback)
//!     .build();
//! ```
//!
//! ## Architecture
//!
//! - [`types`]: Core type definitions, newtypes, and builders
//! - [`query()`]: Simple one-shot query function
//! - [`client`]: Session client and its actor
//! - [`control`]: Frame codec, request correlation, mode selection
//! - [`mcp`]: In-process tool servers and their router
//! - [`hooks`]: Hook registrations and dispatch
//! - [`permissions`]: Permission callback dispatch
//! - [`message`]: Message parsing and the streaming event parser
//! - [`transport`]: Subprocess and in-memory transports
//! - [`supervise`]: Bounded-time execution of user callbacks
//! - [`error`]: Error types and handling
//!
//! ## Requirements
//!
//! - Node.js (for Claude Code CLI)
//! - Claude Code: `npm install -g @anthropic-ai/claude-code`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod control;
pub mod error;
pub mod hooks;
pub mod mcp;
pub mod message;
pub mod permissions;
pub mod query;
pub mod supervise;
pub mod transport;
pub mod types;

// Re-export commonly used types for external API
pub use client::{ClaudeSDKClient, Delivery, SessionEvent, Subscription};
pub use control::{TransportMode, select_mode, select_mode_from_value};
pub use error::{ClaudeError, ErrorKind, Result};
pub use hooks::{HookManager, HookMatcherBuilder};
pub use mcp::{SdkMcpServer, SdkMcpTool, ToolResult, ToolRouter};
pub use message::{StreamDelta, StreamEventParser, parse_message};
pub use permissions::PermissionManager;
pub use query::{query, query_with_transport};
pub use transport::{
    LaunchSpec, MemoryTransport, MemoryTransportHandle, PromptInput, SubprocessTransport, Transport,
    TransportEvent, TransportStatus,
};

// Re-export type submodules for flat public API
pub use types::agent::{AgentDefinition, SystemPrompt, SystemPromptPreset};
pub use types::hooks::{
    HookCallback, HookContext, HookDecision, HookEvent, HookMatcher, HookOutput,
    HookPermissionDecision, HookSpecificOutput,
};
pub use types::identifiers::{RequestId, SessionId, SubscriberId, ToolName};
pub use types::mcp::{
    McpHttpServerConfig, McpServerConfig, McpServers, McpStdioServerConfig, McpStreamableHttpConfig,
};
pub use types::messages::{AssistantMessageContent, ContentBlock, ContentValue, Message, UserContent};
pub use types::options::{ClaudeAgentOptions, ClaudeAgentOptionsBuilder};
pub use types::permissions::{
    CanUseToolCallback, PermissionBehavior, PermissionMode, PermissionResult,
    PermissionResultAllow, PermissionResultDeny, PermissionRuleValue, PermissionUpdate,
    PermissionUpdateDestination, SettingSource, ToolPermissionContext,
};

/// Version of the SDK
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
