//! Type definitions shared across the client
//!
//! - [`identifiers`] - Type-safe ID wrappers (`SessionId`, `ToolName`, `RequestId`, `SubscriberId`)
//! - [`permissions`] - Permission modes, rules, results, and the permission callback
//! - [`hooks`] - Hook events, outputs, matchers, and callbacks
//! - [`mcp`] - MCP server configuration
//! - [`messages`] - Message and content block types
//! - [`agent`] - Agent definitions and system prompts
//! - [`options`] - Session options and their builder

pub mod agent;
pub mod hooks;
pub mod identifiers;
pub mod mcp;
pub mod messages;
pub mod options;
pub mod permissions;

// Re-export commonly used types
pub use agent::{AgentDefinition, SystemPrompt, SystemPromptPreset};
pub use hooks::{
    HookCallback, HookContext, HookDecision, HookEvent, HookMatcher, HookOutput,
    HookPermissionDecision, HookSpecificOutput,
};
pub use identifiers::{RequestId, SessionId, SubscriberId, ToolName};
pub use mcp::{
    McpHttpServerConfig, McpServerConfig, McpServers, McpStdioServerConfig,
    McpStreamableHttpConfig,
};
pub use messages::{
    AssistantMessageContent, ContentBlock, ContentValue, Message, UserContent, UserMessageContent,
};
pub use options::{ClaudeAgentOptions, ClaudeAgentOptionsBuilder, StderrCallback};
pub use permissions::{
    CanUseToolCallback, PermissionBehavior, PermissionMode, PermissionResult,
    PermissionResultAllow, PermissionResultDeny, PermissionRuleValue, PermissionUpdate,
    PermissionUpdateDestination, SettingSource, ToolPermissionContext,
};
