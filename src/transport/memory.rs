//! In-memory transport for tests
//!
//! [`MemoryTransport`] plays the transport's part inside the client while the
//! paired [`MemoryTransportHandle`] plays the CLI: it observes every line the
//! client writes and pushes arbitrary lines back to the client's subscribers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Fanout, Transport, TransportEvent, TransportStatus};
use crate::error::{ClaudeError, Result};

struct Shared {
    fanout: Fanout,
    status: Mutex<TransportStatus>,
    input_ended: Mutex<bool>,
    releases: AtomicUsize,
}

/// Transport half owned by the client
pub struct MemoryTransport {
    shared: Arc<Shared>,
    written: mpsc::UnboundedSender<String>,
    latency: Option<Duration>,
}

/// Test half that stands in for the CLI
pub struct MemoryTransportHandle {
    shared: Arc<Shared>,
    written: mpsc::UnboundedReceiver<String>,
}

impl MemoryTransport {
    /// Create a connected pair
    #[must_use]
    pub fn new() -> (Self, MemoryTransportHandle) {
        let shared = Arc::new(Shared {
            fanout: Fanout::new(),
            status: Mutex::new(TransportStatus::Disconnected),
            input_ended: Mutex::new(false),
            releases: AtomicUsize::new(0),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                shared: Arc::clone(&shared),
                written: tx,
                latency: None,
            },
            MemoryTransportHandle {
                shared,
                written: rx,
            },
        )
    }

    /// Delay every write by `latency` before the observer sees it
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

impl Transport for MemoryTransport {
    async fn connect(&mut self) -> Result<()> {
        let mut status = self.shared.status.lock();
        if *status == TransportStatus::Disconnected && self.shared.releases.load(Ordering::SeqCst) == 0 {
            *status = TransportStatus::Connected;
        }
        Ok(())
    }

    async fn write(&mut self, line: &str) -> Result<()> {
        if !self.is_ready() {
            return Err(ClaudeError::transport("Transport is not ready for writing"));
        }
        if *self.shared.input_ended.lock() {
            return Err(ClaudeError::transport("Input stream already ended"));
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.written
            .send(line.trim_end_matches('\n').to_string())
            .map_err(|_| ClaudeError::transport("Observer dropped"))
    }

    async fn end_input(&mut self) -> Result<()> {
        *self.shared.input_ended.lock() = true;
        Ok(())
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TransportEvent> {
        self.shared.fanout.subscribe()
    }

    fn status(&self) -> TransportStatus {
        *self.shared.status.lock()
    }

    async fn close(&mut self) -> Result<()> {
        let mut status = self.shared.status.lock();
        if self.shared.releases.load(Ordering::SeqCst) > 0 {
            return Ok(());
        }
        self.shared.releases.fetch_add(1, Ordering::SeqCst);
        if *status == TransportStatus::Connected {
            *status = TransportStatus::Disconnected;
        }
        drop(status);
        self.shared.fanout.close();
        Ok(())
    }
}

impl MemoryTransportHandle {
    /// Deliver one line to the client's subscribers
    pub fn push_line(&self, line: impl Into<String>) {
        self.shared.fanout.publish(TransportEvent::Line(line.into()));
    }

    /// Deliver one JSON value as a line
    pub fn push_json(&self, value: &serde_json::Value) {
        self.push_line(value.to_string());
    }

    /// Next line the client wrote, waiting for it
    ///
    /// Returns `None` once the client side has been dropped and every written
    /// line was consumed.
    pub async fn next_written(&mut self) -> Option<String> {
        self.written.recv().await
    }

    /// Next line the client wrote, decoded as JSON
    pub async fn next_written_json(&mut self) -> Option<serde_json::Value> {
        let line = self.next_written().await?;
        serde_json::from_str(&line).ok()
    }

    /// A line the client already wrote, without waiting
    pub fn try_written(&mut self) -> Option<String> {
        self.written.try_recv().ok()
    }

    /// Simulate the CLI exiting with `code`
    pub fn close_remote(&self, code: Option<i32>) {
        {
            let mut status = self.shared.status.lock();
            *status = if code.unwrap_or(0) == 0 {
                TransportStatus::Disconnected
            } else {
                TransportStatus::Error
            };
        }
        self.shared.fanout.finish(TransportEvent::Exited(code));
    }

    /// Whether the client ended its input stream
    #[must_use]
    pub fn input_ended(&self) -> bool {
        *self.shared.input_ended.lock()
    }

    /// How many times the client side actually released its resources
    #[must_use]
    pub fn release_count(&self) -> usize {
        self.shared.releases.load(Ordering::SeqCst)
    }

    /// Status as seen by the client
    #[must_use]
    pub fn status(&self) -> TransportStatus {
        *self.shared.status.lock()
    }
}
