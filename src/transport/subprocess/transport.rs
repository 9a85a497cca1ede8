//! Subprocess transport implementation using Claude Code CLI

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ClaudeError, Result};
use crate::transport::{Fanout, Transport, TransportEvent, TransportStatus, terminated};
use crate::types::options::{ClaudeAgentOptions, DEFAULT_MAX_BUFFER_SIZE, StderrCallback};

use super::command::{CommandBuilder, LaunchSpec};
use super::config::PromptInput;

/// Subprocess transport for Claude Code CLI
pub struct SubprocessTransport {
    pub(super) spec: LaunchSpec,
    pub(super) max_buffer_size: usize,
    pub(super) stderr_callback: Option<StderrCallback>,
    pub(super) process: Arc<tokio::sync::Mutex<Option<Child>>>,
    pub(super) stdin: Option<ChildStdin>,
    pub(super) status: Arc<Mutex<TransportStatus>>,
    pub(super) fanout: Arc<Fanout>,
    pub(super) reader_task: Option<JoinHandle<()>>,
    pub(super) stderr_task: Option<JoinHandle<()>>,
    pub(super) started: bool,
    pub(super) closed: bool,
}

impl SubprocessTransport {
    /// Create a transport that will run `spec`
    #[must_use]
    pub fn new(spec: LaunchSpec) -> Self {
        Self {
            spec,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            stderr_callback: None,
            process: Arc::new(tokio::sync::Mutex::new(None)),
            stdin: None,
            status: Arc::new(Mutex::new(TransportStatus::Disconnected)),
            fanout: Arc::new(Fanout::new()),
            reader_task: None,
            stderr_task: None,
            started: false,
            closed: false,
        }
    }

    /// Build the launch spec from options and create the transport
    ///
    /// # Arguments
    /// * `prompt` - The prompt input (string or stream)
    /// * `options` - Configuration options; `cli_path` is searched when unset
    ///
    /// # Errors
    /// Returns error if CLI cannot be found or the options are inconsistent
    pub fn from_options(prompt: &PromptInput, options: &ClaudeAgentOptions) -> Result<Self> {
        let cli_path = match options.cli_path {
            Some(ref path) => path.clone(),
            None => Self::find_cli()?,
        };
        let spec = CommandBuilder::new(&cli_path, prompt, options).build()?;
        let mut transport = Self::new(spec).with_max_buffer_size(options.max_buffer_size_or_default());
        transport.stderr_callback = options.stderr.clone();
        Ok(transport)
    }

    /// Longest stdout line accepted; longer lines are dropped
    #[must_use]
    pub const fn with_max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    /// Receive stderr lines instead of logging them
    #[must_use]
    pub fn with_stderr(mut self, callback: StderrCallback) -> Self {
        self.stderr_callback = Some(callback);
        self
    }

    /// Launch spec this transport runs
    #[must_use]
    pub const fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Find Claude Code CLI binary
    ///
    /// # Errors
    /// Returns error if CLI cannot be found in PATH or common locations
    pub fn find_cli() -> Result<PathBuf> {
        if let Ok(path) = which::which("claude") {
            return Ok(path);
        }

        let home = env::var("HOME").unwrap_or_else(|_| String::from("/root"));
        let locations = [
            PathBuf::from(&home).join(".npm-global/bin/claude"),
            PathBuf::from("/usr/local/bin/claude"),
            PathBuf::from(&home).join(".local/bin/claude"),
            PathBuf::from(&home).join("node_modules/.bin/claude"),
            PathBuf::from(&home).join(".yarn/bin/claude"),
            PathBuf::from(&home).join(".claude/local/claude"),
        ];

        locations
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(ClaudeError::cli_not_found)
    }
}

impl Transport for SubprocessTransport {
    async fn connect(&mut self) -> Result<()> {
        self.connect_impl().await
    }

    async fn write(&mut self, line: &str) -> Result<()> {
        if !self.is_ready() {
            return Err(ClaudeError::transport("Transport is not ready for writing"));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ClaudeError::transport("stdin not available"))?;

        stdin
            .write_all(terminated(line).as_bytes())
            .await
            .map_err(|e| ClaudeError::transport(format!("Failed to write to stdin: {e}")))?;

        stdin
            .flush()
            .await
            .map_err(|e| ClaudeError::transport(format!("Failed to flush stdin: {e}")))?;

        Ok(())
    }

    async fn end_input(&mut self) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .shutdown()
                .await
                .map_err(|e| ClaudeError::transport(format!("Failed to close stdin: {e}")))?;
        }
        Ok(())
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TransportEvent> {
        self.fanout.subscribe()
    }

    fn status(&self) -> TransportStatus {
        *self.status.lock()
    }

    async fn close(&mut self) -> Result<()> {
        self.close_impl().await
    }
}

impl Drop for SubprocessTransport {
    fn drop(&mut self) {
        self.drop_impl();
    }
}
