//! Subprocess transport implementation using Claude Code CLI
//!
//! This module spawns the Claude Code CLI from a [`LaunchSpec`] and exchanges
//! lines with it over stdin/stdout. Stderr is a side channel: it goes to the
//! configured callback or to the `claude_cli::stderr` log target.

mod command;
mod config;
mod lifecycle;
mod reader;
mod transport;

// Re-export public types
pub use command::{CommandBuilder, LaunchSpec};
pub use config::{ALLOWED_EXTRA_FLAGS, DANGEROUS_ENV_VARS, PromptInput};
pub use transport::SubprocessTransport;
