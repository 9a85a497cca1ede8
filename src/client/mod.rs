//! `ClaudeSDKClient` for stateful sessions
//!
//! A client owns one session with the CLI. Behind it a single actor task owns
//! every piece of session state; the client and its [`Subscription`]s only
//! talk to that task through its mailbox.
//!
//! ```text
//!  ClaudeSDKClient ──┐                ┌── hook / permission / tool tasks
//!  Subscription ─────┼──► mailbox ──► actor ◄──┘
//!  Subscription ─────┘                │ ▲
//!                                     ▼ │
//!                                   Transport
//! ```
//!
//! Exactly one subscription is active at a time and receives the messages and
//! stream deltas of the current turn. Other subscriptions wait in FIFO order;
//! a prompt sent from a waiting subscription is held and written when its
//! turn starts, which is after the active turn's `message_stop` or `result`.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_claude_control::{ClaudeAgentOptions, ClaudeSDKClient, Message, SessionEvent};
//!
//! # async fn example() -> kodegen_claude_control::Result<()> {
//! let mut client = ClaudeSDKClient::connect(ClaudeAgentOptions::default()).await?;
//! let mut turn = client.query("Hello, Claude!").await?;
//!
//! while let Some(event) = turn.recv().await {
//!     if let SessionEvent::Message(Message::Assistant { message, .. }) = event? {
//!         log::info!("{}", message.text());
//!     }
//! }
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

mod actor;
mod client_impl;
mod commands;
pub mod subscribers;

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::control::{ProtocolHandler, TransportMode};
use crate::error::{ClaudeError, Result};
use crate::message::StreamDelta;
use crate::types::identifiers::SubscriberId;
use crate::types::messages::Message;

use actor::SessionState;
use commands::Command;

/// Item delivered to the active subscription
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Typed conversation message
    Message(Message),
    /// Parsed partial-message delta
    Stream(StreamDelta),
    /// Message that did not match a known type, untouched
    Raw(Value),
}

/// What happened to a prompt sent through a [`Subscription`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the CLI
    Written,
    /// Held until the subscription becomes active
    Held,
}

/// Client for bidirectional communication with Claude Code
pub struct ClaudeSDKClient {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
    actor: Option<JoinHandle<()>>,
    mode: TransportMode,
    control_timeout: Duration,
    server_info: Option<Value>,
}

/// One consumer of the session's stream
///
/// Dropping a subscription unsubscribes it.
pub struct Subscription {
    id: SubscriberId,
    events: mpsc::UnboundedReceiver<Result<SessionEvent>>,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
}

impl Subscription {
    /// Reference of this subscription
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event of this subscription's turn
    ///
    /// Returns `None` once the turn ended (after its `result` or
    /// `message_stop`), or when the session closed.
    pub async fn recv(&mut self) -> Option<Result<SessionEvent>> {
        self.events.recv().await
    }

    /// Send a text prompt
    ///
    /// # Errors
    /// Returns `Transport` when the session is down, `ControlProtocol` when
    /// this subscription no longer exists in the session
    pub async fn send(&self, prompt: impl Into<String>) -> Result<Delivery> {
        self.send_content(Value::String(prompt.into())).await
    }

    /// Send a prompt with structured content blocks
    ///
    /// # Errors
    /// Same as [`send`](Self::send)
    pub async fn send_content(&self, content: Value) -> Result<Delivery> {
        let session_id = self.state.borrow().session_id.clone();
        let line = ProtocolHandler::user_message(&content, session_id.as_ref())?;
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Send {
                id: self.id,
                line,
                reply,
            })
            .map_err(|_| ClaudeError::transport("Session is closed"))?;
        response
            .await
            .map_err(|_| ClaudeError::cancelled("Session stopped before the prompt was routed"))?
    }
}

impl futures::Stream for Subscription {
    type Item = Result<SessionEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Unsubscribe { id: self.id });
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}
