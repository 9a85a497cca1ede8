//! Error types for the Claude control-protocol client

use thiserror::Error;

/// Main error type for the control-protocol client
#[derive(Error, Debug)]
pub enum ClaudeError {
    /// Claude Code CLI not found or not installed
    #[error("Claude Code CLI not found: {0}")]
    CliNotFound(String),

    /// The external process could not be started
    #[error("Connection error: {0}")]
    Connection(String),

    /// Process exited abnormally
    #[error("Process error (exit code {exit_code}): {message}")]
    Process {
        /// Error message
        message: String,
        /// Process exit code
        exit_code: i32,
        /// Standard error output
        stderr: Option<String>,
    },

    /// JSON decode error when parsing CLI output
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// A frame or message did not have the expected shape
    #[error("Message parse error: {message}")]
    MessageParse {
        /// Error message
        message: String,
        /// Raw message data that failed to parse
        data: Option<serde_json::Value>,
    },

    /// Transport is down, closed, or refused a write
    #[error("Transport error: {0}")]
    Transport(String),

    /// Control protocol misuse (unknown subtype, control op without a control channel, ...)
    #[error("Control protocol error: {0}")]
    ControlProtocol(String),

    /// The remote agent answered a control request with an error
    #[error("Remote error: {0}")]
    Remote(String),

    /// A correlated request was released before it was answered
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Hook execution error
    #[error("Hook error: {0}")]
    Hook(String),

    /// In-process tool server error
    #[error("MCP error: {0}")]
    Mcp(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClaudeError>;

/// Coarse classification of a [`ClaudeError`] for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The operation ran out of time
    Timeout,
    /// The transport (or the process behind it) is gone
    TransportDown,
    /// The remote agent reported an error
    Remote,
    /// A response could not be decoded
    Malformed,
    /// Anything else (configuration, callbacks, local I/O)
    Other,
}

impl ClaudeError {
    /// Create a CLI not found error
    #[must_use]
    pub fn cli_not_found() -> Self {
        Self::CliNotFound(
            "Claude Code not found. Install with:\n\
             npm install -g @anthropic-ai/claude-code\n\
             \n\
             Or set `cli_path` in the options"
                .to_string(),
        )
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a process error
    pub fn process(msg: impl Into<String>, exit_code: i32, stderr: Option<String>) -> Self {
        Self::Process {
            message: msg.into(),
            exit_code,
            stderr,
        }
    }

    /// Create a message parse error
    pub fn message_parse(msg: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::MessageParse {
            message: msg.into(),
            data,
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a control protocol error
    pub fn control_protocol(msg: impl Into<String>) -> Self {
        Self::ControlProtocol(msg.into())
    }

    /// Create a remote error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create a hook error
    pub fn hook(msg: impl Into<String>) -> Self {
        Self::Hook(msg.into())
    }

    /// Create an MCP error
    pub fn mcp(msg: impl Into<String>) -> Self {
        Self::Mcp(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::CliNotFound(_)
            | Self::Connection(_)
            | Self::Process { .. }
            | Self::Transport(_)
            | Self::Cancelled(_) => ErrorKind::TransportDown,
            Self::Remote(_) => ErrorKind::Remote,
            Self::JsonDecode(_) | Self::MessageParse { .. } => ErrorKind::Malformed,
            Self::ControlProtocol(_)
            | Self::Hook(_)
            | Self::Mcp(_)
            | Self::Io(_)
            | Self::InvalidConfig(_) => ErrorKind::Other,
        }
    }

    /// Whether retrying the same operation may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Timeout)
    }
}
