//! `ClaudeSDKClient` implementation
//!
//! This module contains the constructors and public API methods for
//! `ClaudeSDKClient`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};

use super::actor::{Actor, Dispatchers, SessionState};
use super::commands::Command;
use super::{ClaudeSDKClient, Subscription};
use crate::control::{ControlFeatures, ControlRequest, TransportMode, select_mode};
use crate::error::{ClaudeError, Result};
use crate::hooks::HookManager;
use crate::mcp::ToolRouter;
use crate::permissions::PermissionManager;
use crate::transport::{PromptInput, SubprocessTransport, Transport, TransportStatus};
use crate::types::identifiers::{SessionId, SubscriberId};
use crate::types::options::ClaudeAgentOptions;
use crate::types::permissions::PermissionMode;

impl ClaudeSDKClient {
    /// Start the CLI in streaming mode and open a session
    ///
    /// # Errors
    /// Returns error if the CLI cannot be found or started, or if the
    /// initialize handshake fails or times out
    pub async fn connect(options: ClaudeAgentOptions) -> Result<Self> {
        let transport = SubprocessTransport::from_options(&PromptInput::Stream, &options)?;
        Self::connect_with_transport(transport, options).await
    }

    /// Open a session over an already built transport
    ///
    /// In full-control mode this waits for the initialize response (bounded by
    /// the initialize timeout); a failed handshake closes the transport.
    ///
    /// # Errors
    /// Returns error if connecting or the initialize handshake fails
    pub async fn connect_with_transport<T>(mut transport: T, options: ClaudeAgentOptions) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let mode = select_mode(&options);
        log::debug!(
            "Opening {mode:?} session (control features {:?})",
            ControlFeatures::detect(&options)
        );
        transport.connect().await?;

        let hooks = HookManager::from_config(options.hooks.as_ref(), options.hook_timeout_or_default());
        let initialize = ControlRequest::Initialize {
            hooks: hooks.initialize_payload(),
            agents: options
                .agents
                .as_ref()
                .filter(|agents| !agents.is_empty())
                .map(serde_json::to_value)
                .transpose()?,
        };
        let dispatchers = Dispatchers {
            hooks: Arc::new(hooks),
            permissions: PermissionManager::new(
                options.can_use_tool.clone(),
                options.permission_timeout_or_default(),
            ),
            router: Arc::new(ToolRouter::from_servers(
                &options.mcp_servers,
                options.max_buffer_size_or_default(),
            )),
        };

        let (state_tx, state_rx) = watch::channel(SessionState {
            session_id: None,
            status: transport.status(),
        });
        let (commands, mailbox) = mpsc::unbounded_channel();
        let actor = Actor::new(transport, mode, mailbox, dispatchers, state_tx);
        let handle = tokio::spawn(actor.run());

        let mut client = Self {
            commands,
            state: state_rx,
            actor: Some(handle),
            mode,
            control_timeout: options.control_timeout_or_default(),
            server_info: None,
        };

        if mode == TransportMode::FullControl {
            log::debug!("Initializing control session");
            match client
                .control(initialize, options.initialize_timeout_or_default())
                .await
            {
                Ok(info) => client.server_info = Some(info),
                Err(e) => {
                    log::error!("Initialize failed: {e}");
                    if let Err(close_error) = client.close().await {
                        log::warn!("Failed to close after initialize failure: {close_error}");
                    }
                    return Err(e);
                }
            }
        } else {
            log::debug!("Lightweight session: no control channel");
        }

        Ok(client)
    }

    async fn control(&self, request: ControlRequest, timeout: Duration) -> Result<Value> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Control {
                request,
                timeout,
                reply,
            })
            .map_err(|_| ClaudeError::transport("Session is closed"))?;
        response
            .await
            .map_err(|_| ClaudeError::cancelled("Session stopped before the request completed"))?
    }

    /// Switch the model
    ///
    /// Returns the model the CLI reports, or the requested one when the
    /// response does not name it.
    ///
    /// # Errors
    /// Returns `Timeout`, `Remote`, `Transport`, or `ControlProtocol` (in
    /// lightweight mode)
    pub async fn set_model(&self, model: impl Into<String>) -> Result<String> {
        let model = model.into();
        let response = self
            .control(
                ControlRequest::SetModel {
                    model: Some(model.clone()),
                },
                self.control_timeout,
            )
            .await?;
        Ok(response
            .get("model")
            .and_then(Value::as_str)
            .map_or(model, str::to_string))
    }

    /// Switch the permission mode
    ///
    /// # Errors
    /// Same as [`set_model`](Self::set_model)
    pub async fn set_permission_mode(&self, mode: PermissionMode) -> Result<()> {
        self.control(ControlRequest::SetPermissionMode { mode }, self.control_timeout)
            .await
            .map(drop)
    }

    /// Interrupt the running turn
    ///
    /// Completes when the CLI acknowledges the interrupt.
    ///
    /// # Errors
    /// Same as [`set_model`](Self::set_model)
    pub async fn interrupt(&self) -> Result<()> {
        self.control(ControlRequest::Interrupt, self.control_timeout)
            .await
            .map(drop)
    }

    /// Restore files to their state at `user_message_id`
    ///
    /// # Errors
    /// Same as [`set_model`](Self::set_model)
    pub async fn rewind_files(&self, user_message_id: impl Into<String>) -> Result<()> {
        self.control(
            ControlRequest::RewindFiles {
                user_message_id: user_message_id.into(),
            },
            self.control_timeout,
        )
        .await
        .map(drop)
    }

    /// Register a new subscription
    ///
    /// The first subscription becomes active; later ones queue behind it.
    ///
    /// # Errors
    /// Returns `Transport` if the session is closed
    pub fn subscribe(&self) -> Result<Subscription> {
        let id = SubscriberId::new();
        let (sink, events) = mpsc::unbounded_channel();
        self.commands
            .send(Command::Subscribe { id, sink })
            .map_err(|_| ClaudeError::transport("Session is closed"))?;
        Ok(Subscription {
            id,
            events,
            commands: self.commands.clone(),
            state: self.state.clone(),
        })
    }

    /// Subscribe and send `prompt` in one step
    ///
    /// The prompt is held until the subscription's turn starts.
    ///
    /// # Errors
    /// Returns error if the session is closed or the write fails
    pub async fn query(&self, prompt: impl Into<String>) -> Result<Subscription> {
        let subscription = self.subscribe()?;
        subscription.send(prompt).await?;
        Ok(subscription)
    }

    /// Close the CLI's input
    ///
    /// # Errors
    /// Returns error if the transport refuses
    pub async fn end_input(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::EndInput { reply })
            .map_err(|_| ClaudeError::transport("Session is closed"))?;
        response
            .await
            .map_err(|_| ClaudeError::cancelled("Session stopped"))?
    }

    /// Initialize response of the CLI; `None` in lightweight mode
    #[must_use]
    pub const fn server_info(&self) -> Option<&Value> {
        self.server_info.as_ref()
    }

    /// Session id reported by the CLI, once known
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.state.borrow().session_id.clone()
    }

    /// Mode this session runs in
    #[must_use]
    pub const fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Transport status as last seen by the session
    #[must_use]
    pub fn status(&self) -> TransportStatus {
        self.state.borrow().status
    }

    /// Close the session
    ///
    /// Pending requests fail with `Cancelled`. Calling this again is a no-op.
    ///
    /// # Errors
    /// Returns error if the transport fails to clean up
    pub async fn close(&mut self) -> Result<()> {
        let Some(handle) = self.actor.take() else {
            return Ok(());
        };
        let (reply, response) = oneshot::channel();
        let outcome = if self.commands.send(Command::Close { reply }).is_ok() {
            response.await.unwrap_or(Ok(()))
        } else {
            Ok(())
        };
        if let Err(e) = handle.await {
            log::warn!("Session actor ended abnormally: {e}");
        }
        outcome
    }
}

impl std::fmt::Debug for ClaudeSDKClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeSDKClient")
            .field("mode", &self.mode)
            .field("session_id", &self.session_id())
            .field("closed", &self.actor.is_none())
            .finish_non_exhaustive()
    }
}
