//! Claude Agent options and configuration
//!
//! This module contains the options a client is started from, including a
//! builder. Control-plane settings (hooks, permission callback, in-process
//! servers, agents, permission mode, mode override, timeouts) drive the client
//! itself; the rest are handed to the launch-spec builder as CLI flags.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::agent::{AgentDefinition, SystemPrompt};
use super::hooks::{HookEvent, HookMatcher};
use super::identifiers::{SessionId, ToolName};
use super::mcp::{McpServerConfig, McpServers};
use super::permissions::{CanUseToolCallback, PermissionMode, SettingSource};
use crate::control::mode::TransportMode;

/// Default time budget for one hook callback
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(60);
/// Default time budget for the permission callback
pub const DEFAULT_PERMISSION_TIMEOUT: Duration = Duration::from_secs(60);
/// Default deadline for correlated control requests
pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_secs(60);
/// Default (and minimum env-derived) deadline for the initialize handshake
pub const DEFAULT_INITIALIZE_TIMEOUT: Duration = Duration::from_secs(60);
/// Default ceiling for one stdout line and one tool payload (1 MiB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Environment variable (milliseconds) consulted for the initialize deadline
pub const STREAM_CLOSE_TIMEOUT_ENV: &str = "CLAUDE_CODE_STREAM_CLOSE_TIMEOUT";

/// Callback receiving each line the CLI writes to stderr
pub type StderrCallback = Arc<dyn Fn(String) + Send + Sync>;

// ============================================================================
// Claude Agent Options
// ============================================================================

/// Main options for a Claude session
#[derive(Clone, Default)]
pub struct ClaudeAgentOptions {
    /// List of tools that Claude is allowed to use
    pub allowed_tools: Vec<ToolName>,
    /// System prompt configuration
    pub system_prompt: Option<SystemPrompt>,
    /// MCP server configurations
    pub mcp_servers: McpServers,
    /// Permission mode for tool execution
    pub permission_mode: Option<PermissionMode>,
    /// Whether to continue from the previous conversation
    pub continue_conversation: bool,
    /// Session ID to resume from
    pub resume: Option<SessionId>,
    /// Maximum number of turns before stopping
    pub max_turns: Option<u32>,
    /// List of tools that Claude is not allowed to use
    pub disallowed_tools: Vec<ToolName>,
    /// AI model to use
    pub model: Option<String>,
    /// Tool name to use for permission prompts
    pub permission_prompt_tool_name: Option<String>,
    /// Working directory for the CLI process
    pub cwd: Option<PathBuf>,
    /// Path to settings file
    pub settings: Option<PathBuf>,
    /// Additional directories to add to the context
    pub add_dirs: Vec<PathBuf>,
    /// Environment variables for the CLI process
    pub env: HashMap<String, String>,
    /// Extra CLI arguments to pass (allow-listed flags only)
    pub extra_args: HashMap<String, Option<String>>,
    /// Maximum size of one stdout line and of one tool payload
    pub max_buffer_size: Option<usize>,
    /// Callback for tool permission checks
    pub can_use_tool: Option<CanUseToolCallback>,
    /// Hook configurations
    pub hooks: Option<HashMap<HookEvent, Vec<HookMatcher>>>,
    /// Whether to include partial messages in stream
    pub include_partial_messages: bool,
    /// Whether to fork the session when resuming
    pub fork_session: bool,
    /// Custom agent definitions
    pub agents: Option<HashMap<String, AgentDefinition>>,
    /// Setting sources to load
    pub setting_sources: Option<Vec<SettingSource>>,
    /// Explicit transport mode; wins over feature detection
    pub transport_mode: Option<TransportMode>,
    /// Default time budget for hook callbacks without their own timeout
    pub hook_timeout: Option<Duration>,
    /// Time budget for the permission callback
    pub permission_timeout: Option<Duration>,
    /// Deadline for correlated control requests
    pub control_timeout: Option<Duration>,
    /// Deadline for the initialize handshake
    pub initialize_timeout: Option<Duration>,
    /// Path to the CLI executable; discovered when unset
    pub cli_path: Option<PathBuf>,
    /// Receiver for the CLI's stderr lines
    pub stderr: Option<StderrCallback>,
}

impl ClaudeAgentOptions {
    /// Create a new builder for `ClaudeAgentOptions`
    #[must_use]
    pub fn builder() -> ClaudeAgentOptionsBuilder {
        ClaudeAgentOptionsBuilder::default()
    }

    /// Hook budget applied when a matcher sets none
    #[must_use]
    pub fn hook_timeout_or_default(&self) -> Duration {
        self.hook_timeout.unwrap_or(DEFAULT_HOOK_TIMEOUT)
    }

    /// Permission callback budget
    #[must_use]
    pub fn permission_timeout_or_default(&self) -> Duration {
        self.permission_timeout.unwrap_or(DEFAULT_PERMISSION_TIMEOUT)
    }

    /// Control request deadline
    #[must_use]
    pub fn control_timeout_or_default(&self) -> Duration {
        self.control_timeout.unwrap_or(DEFAULT_CONTROL_TIMEOUT)
    }

    /// Initialize deadline
    ///
    /// When unset, `CLAUDE_CODE_STREAM_CLOSE_TIMEOUT` (milliseconds) is read,
    /// never going below [`DEFAULT_INITIALIZE_TIMEOUT`].
    #[must_use]
    pub fn initialize_timeout_or_default(&self) -> Duration {
        if let Some(timeout) = self.initialize_timeout {
            return timeout;
        }
        std::env::var(STREAM_CLOSE_TIMEOUT_ENV)
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .map_or(DEFAULT_INITIALIZE_TIMEOUT, |env| {
                env.max(DEFAULT_INITIALIZE_TIMEOUT)
            })
    }

    /// Line and payload ceiling
    #[must_use]
    pub fn max_buffer_size_or_default(&self) -> usize {
        self.max_buffer_size.unwrap_or(DEFAULT_MAX_BUFFER_SIZE)
    }
}

impl std::fmt::Debug for ClaudeAgentOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeAgentOptions")
            .field("allowed_tools", &self.allowed_tools)
            .field("system_prompt", &self.system_prompt)
            .field("mcp_servers", &self.mcp_servers)
            .field("permission_mode", &self.permission_mode)
            .field("continue_conversation", &self.continue_conversation)
            .field("resume", &self.resume)
            .field("max_turns", &self.max_turns)
            .field("disallowed_tools", &self.disallowed_tools)
            .field("model", &self.model)
            .field(
                "permission_prompt_tool_name",
                &self.permission_prompt_tool_name,
            )
            .field("cwd", &self.cwd)
            .field("settings", &self.settings)
            .field("add_dirs", &self.add_dirs)
            .field("env", &self.env)
            .field("extra_args", &self.extra_args)
            .field("max_buffer_size", &self.max_buffer_size)
            .field(
                "can_use_tool",
                &self.can_use_tool.as_ref().map(|_| "<callback>"),
            )
            .field(
                "hooks",
                &self
                    .hooks
                    .as_ref()
                    .map(|h| format!("[{} hook types]", h.len())),
            )
            .field("include_partial_messages", &self.include_partial_messages)
            .field("fork_session", &self.fork_session)
            .field("agents", &self.agents)
            .field("setting_sources", &self.setting_sources)
            .field("transport_mode", &self.transport_mode)
            .field("hook_timeout", &self.hook_timeout)
            .field("permission_timeout", &self.permission_timeout)
            .field("control_timeout", &self.control_timeout)
            .field("initialize_timeout", &self.initialize_timeout)
            .field("cli_path", &self.cli_path)
            .field("stderr", &self.stderr.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

// ============================================================================
// Builder for ClaudeAgentOptions
// ============================================================================

/// Builder for `ClaudeAgentOptions`
#[derive(Debug, Default)]
pub struct ClaudeAgentOptionsBuilder {
    options: ClaudeAgentOptions,
}

impl ClaudeAgentOptionsBuilder {
    /// Set allowed tools
    #[must_use]
    pub fn allowed_tools(mut self, tools: Vec<impl Into<ToolName>>) -> Self {
        self.options.allowed_tools = tools.into_iter().map(std::convert::Into::into).collect();
        self
    }

    /// Add an allowed tool
    #[must_use]
    pub fn add_allowed_tool(mut self, tool: impl Into<ToolName>) -> Self {
        self.options.allowed_tools.push(tool.into());
        self
    }

    /// Set disallowed tools
    #[must_use]
    pub fn disallowed_tools(mut self, tools: Vec<impl Into<ToolName>>) -> Self {
        self.options.disallowed_tools = tools.into_iter().map(std::convert::Into::into).collect();
        self
    }

    /// Set system prompt
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<SystemPrompt>) -> Self {
        self.options.system_prompt = Some(prompt.into());
        self
    }

    /// Set MCP servers
    #[must_use]
    pub fn mcp_servers(mut self, servers: HashMap<String, McpServerConfig>) -> Self {
        self.options.mcp_servers = McpServers::Dict(servers);
        self
    }

    /// Add one MCP server under `name`
    #[must_use]
    pub fn add_mcp_server(mut self, name: impl Into<String>, config: McpServerConfig) -> Self {
        match &mut self.options.mcp_servers {
            McpServers::Dict(servers) => {
                servers.insert(name.into(), config);
            }
            other @ (McpServers::None | McpServers::Path(_)) => {
                *other = McpServers::Dict(HashMap::from([(name.into(), config)]));
            }
        }
        self
    }

    /// Set permission mode
    #[must_use]
    pub const fn permission_mode(mut self, mode: PermissionMode) -> Self {
        self.options.permission_mode = Some(mode);
        self
    }

    /// Set max turns
    ///
    /// # Panics
    /// Panics if turns exceeds 1000
    #[must_use]
    pub fn max_turns(mut self, turns: u32) -> Self {
        const MAX_ALLOWED_TURNS: u32 = 1000;
        assert!(
            turns <= MAX_ALLOWED_TURNS,
            "max_turns {turns} exceeds maximum allowed: {MAX_ALLOWED_TURNS}"
        );
        self.options.max_turns = Some(turns);
        self
    }

    /// Set model
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = Some(model.into());
        self
    }

    /// Set working directory
    #[must_use]
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.cwd = Some(path.into());
        self
    }

    /// Add an environment variable for the CLI process
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.env.insert(key.into(), value.into());
        self
    }

    /// Resume a previous session
    #[must_use]
    pub fn resume(mut self, session: impl Into<SessionId>) -> Self {
        self.options.resume = Some(session.into());
        self
    }

    /// Stream partial messages as stream events
    #[must_use]
    pub const fn include_partial_messages(mut self, include: bool) -> Self {
        self.options.include_partial_messages = include;
        self
    }

    /// Set `can_use_tool` callback
    #[must_use]
    pub fn can_use_tool(mut self, callback: CanUseToolCallback) -> Self {
        self.options.can_use_tool = Some(callback);
        self
    }

    /// Set hooks
    #[must_use]
    pub fn hooks(mut self, hooks: HashMap<HookEvent, Vec<HookMatcher>>) -> Self {
        self.options.hooks = Some(hooks);
        self
    }

    /// Add one hook matcher for `event`
    #[must_use]
    pub fn add_hook(mut self, event: HookEvent, matcher: HookMatcher) -> Self {
        self.options
            .hooks
            .get_or_insert_with(HashMap::new)
            .entry(event)
            .or_default()
            .push(matcher);
        self
    }

    /// Add a named agent definition
    #[must_use]
    pub fn add_agent(mut self, name: impl Into<String>, agent: AgentDefinition) -> Self {
        self.options
            .agents
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), agent);
        self
    }

    /// Force a transport mode
    #[must_use]
    pub const fn transport_mode(mut self, mode: TransportMode) -> Self {
        self.options.transport_mode = Some(mode);
        self
    }

    /// Default hook time budget
    #[must_use]
    pub const fn hook_timeout(mut self, timeout: Duration) -> Self {
        self.options.hook_timeout = Some(timeout);
        self
    }

    /// Permission callback time budget
    #[must_use]
    pub const fn permission_timeout(mut self, timeout: Duration) -> Self {
        self.options.permission_timeout = Some(timeout);
        self
    }

    /// Control request deadline
    #[must_use]
    pub const fn control_timeout(mut self, timeout: Duration) -> Self {
        self.options.control_timeout = Some(timeout);
        self
    }

    /// Initialize deadline
    #[must_use]
    pub const fn initialize_timeout(mut self, timeout: Duration) -> Self {
        self.options.initialize_timeout = Some(timeout);
        self
    }

    /// Line and payload ceiling
    #[must_use]
    pub const fn max_buffer_size(mut self, size: usize) -> Self {
        self.options.max_buffer_size = Some(size);
        self
    }

    /// Path to the CLI executable
    #[must_use]
    pub fn cli_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.cli_path = Some(path.into());
        self
    }

    /// Receive the CLI's stderr lines
    #[must_use]
    pub fn stderr(mut self, callback: StderrCallback) -> Self {
        self.options.stderr = Some(callback);
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> ClaudeAgentOptions {
        self.options
    }
}
