//! Transport layer for communicating with Claude Code CLI
//!
//! A transport owns a bidirectional line channel to the CLI. Outbound lines go
//! through [`Transport::write`]; every complete inbound line is pushed to each
//! receiver handed out by [`Transport::subscribe`] as soon as it is delimited.
//!
//! Two implementations exist: [`SubprocessTransport`] supervises a real child
//! process, and [`MemoryTransport`] lets tests play the CLI's part.

mod fanout;
pub mod memory;
pub mod subprocess;

use tokio::sync::mpsc;

use crate::error::Result;

pub(crate) use fanout::Fanout;
pub use memory::{MemoryTransport, MemoryTransportHandle};
pub use subprocess::{CommandBuilder, LaunchSpec, PromptInput, SubprocessTransport};

/// Connection status reported by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    /// Ready for writes
    Connected,
    /// Not started yet, or closed cleanly
    Disconnected,
    /// The other side went away abnormally
    Error,
}

/// Item delivered to transport subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One complete inbound line, without its terminator
    Line(String),
    /// The other side finished; carries the exit code when one is known
    Exited(Option<i32>),
    /// Reading failed; no more lines will follow
    Failed(String),
}

/// Transport trait for communicating with Claude Code
///
/// Implementations serialize [`write`](Self::write) calls so that two lines
/// never interleave, and make [`close`](Self::close) safe to call repeatedly.
pub trait Transport: Send + Sync {
    /// Connect to the transport
    ///
    /// # Errors
    /// Returns error if the CLI cannot be found or started
    fn connect(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Write one line to the transport
    ///
    /// A trailing newline is added when `line` does not end with one.
    ///
    /// # Errors
    /// Returns error if write fails or transport is not connected
    fn write(&mut self, line: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// End the input stream (close stdin)
    ///
    /// # Errors
    /// Returns error if closing fails
    fn end_input(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Register a consumer of inbound lines
    ///
    /// Lines that arrived before the first subscriber are replayed to it. The
    /// receiver closes after the final [`TransportEvent::Exited`] or
    /// [`TransportEvent::Failed`], or when the transport is closed.
    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TransportEvent>;

    /// Current connection status
    fn status(&self) -> TransportStatus;

    /// Check if transport is ready for communication
    fn is_ready(&self) -> bool {
        self.status() == TransportStatus::Connected
    }

    /// Close the transport and clean up resources
    ///
    /// Idempotent: later calls return `Ok(())` without releasing anything twice.
    ///
    /// # Errors
    /// Returns error if cleanup fails
    fn close(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Append the line terminator when missing
pub(crate) fn terminated(line: &str) -> std::borrow::Cow<'_, str> {
    if line.ends_with('\n') {
        std::borrow::Cow::Borrowed(line)
    } else {
        std::borrow::Cow::Owned(format!("{line}\n"))
    }
}
