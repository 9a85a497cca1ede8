//! Session actor
//!
//! One task owns the transport, the pending-request table, the subscriber
//! table, and the stream accumulator. It reacts to four sources in arrival
//! order: commands from client handles, lines from the transport, finished
//! callback tasks, and request deadlines.
//!
//! Hook, permission, and tool calls run in their own tasks so a slow callback
//! never stops frame processing; their responses come back through the join
//! set and are written by the actor like every other frame.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;

use super::{Delivery, SessionEvent};
use super::commands::Command;
use super::subscribers::{Dispatch, Promotion, SubscriberTable};
use crate::control::protocol::{self, ControlFrame, ControlOutcome, ControlRequest};
use crate::control::{PendingRequests, ProtocolHandler, TransportMode};
use crate::error::{ClaudeError, Result};
use crate::hooks::HookManager;
use crate::mcp::ToolRouter;
use crate::message::{StreamEventParser, parse_message};
use crate::permissions::PermissionManager;
use crate::transport::{Transport, TransportEvent, TransportStatus};
use crate::types::identifiers::{RequestId, SessionId, SubscriberId};
use crate::types::messages::Message;
use crate::types::permissions::ToolPermissionContext;

/// State published to client handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionState {
    pub(crate) session_id: Option<SessionId>,
    pub(crate) status: TransportStatus,
}

/// Subsystems the actor dispatches inbound requests to
pub(crate) struct Dispatchers {
    pub(crate) hooks: Arc<HookManager>,
    pub(crate) permissions: PermissionManager,
    pub(crate) router: Arc<ToolRouter>,
}

enum Flow {
    Continue,
    Stop,
}

pub(crate) struct Actor<T: Transport> {
    transport: T,
    mode: TransportMode,
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    inbound_open: bool,
    commands: mpsc::UnboundedReceiver<Command>,
    protocol: ProtocolHandler,
    pending: PendingRequests,
    subscribers: SubscriberTable,
    parser: StreamEventParser,
    dispatchers: Dispatchers,
    callbacks: JoinSet<ControlFrame>,
    state: watch::Sender<SessionState>,
    // Set once the transport is gone; commands fail fast with it
    down: Option<String>,
}

impl<T: Transport + 'static> Actor<T> {
    pub(crate) fn new(
        mut transport: T,
        mode: TransportMode,
        commands: mpsc::UnboundedReceiver<Command>,
        dispatchers: Dispatchers,
        state: watch::Sender<SessionState>,
    ) -> Self {
        let inbound = transport.subscribe();
        Self {
            transport,
            mode,
            inbound,
            inbound_open: true,
            commands,
            protocol: ProtocolHandler::new(),
            pending: PendingRequests::new(),
            subscribers: SubscriberTable::new(),
            parser: StreamEventParser::new(),
            dispatchers,
            callbacks: JoinSet::new(),
            state,
            down: None,
        }
    }

    pub(crate) async fn run(mut self) {
        log::debug!("Session actor started in {:?} mode", self.mode);
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        log::debug!("All client handles dropped, shutting down");
                        if let Err(e) = self.shutdown().await {
                            log::warn!("Failed to close transport: {e}");
                        }
                        break;
                    };
                    if let Flow::Stop = self.handle_command(command).await {
                        break;
                    }
                }
                event = self.inbound.recv(), if self.inbound_open => {
                    match event {
                        Some(event) => self.handle_transport_event(event).await,
                        None => {
                            self.inbound_open = false;
                            self.transport_down("Transport closed its output".to_string(), None);
                        }
                    }
                }
                Some(joined) = self.callbacks.join_next(), if !self.callbacks.is_empty() => {
                    match joined {
                        Ok(frame) => self.write_frame(&frame).await,
                        Err(e) => log::error!("Callback task ended without a response: {e}"),
                    }
                }
                Some(expired) = self.pending.expire_next(), if !self.pending.is_empty() => {
                    log::debug!("Request {expired} expired");
                }
            }
        }
        log::debug!("Session actor stopped");
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn handle_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Control {
                request,
                timeout,
                reply,
            } => self.start_request(request, timeout, reply).await,
            Command::Subscribe { id, sink } => {
                if let Some(ref reason) = self.down {
                    let _ = sink.send(Err(ClaudeError::transport(reason.clone())));
                } else {
                    self.subscribers.subscribe(id, sink);
                }
            }
            Command::Send { id, line, reply } => {
                let outcome = self.route_send(id, line).await;
                let _ = reply.send(outcome);
            }
            Command::Unsubscribe { id } => {
                let promotion = self.subscribers.unsubscribe(id);
                self.promote(promotion).await;
            }
            Command::EndInput { reply } => {
                let _ = reply.send(self.transport.end_input().await);
            }
            Command::Close { reply } => {
                let outcome = self.shutdown().await;
                let _ = reply.send(outcome);
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    async fn start_request(
        &mut self,
        request: ControlRequest,
        timeout: std::time::Duration,
        reply: oneshot::Sender<Result<Value>>,
    ) {
        if self.mode == TransportMode::Lightweight {
            let _ = reply.send(Err(ClaudeError::control_protocol(format!(
                "{} requires a control channel; this session runs in lightweight mode",
                request.subtype()
            ))));
            return;
        }
        if let Some(ref reason) = self.down {
            let _ = reply.send(Err(ClaudeError::transport(reason.clone())));
            return;
        }

        let subtype = request.subtype().to_string();
        let (request_id, frame) = self.protocol.request(request);
        let line = match protocol::encode(&frame) {
            Ok(line) => line,
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };
        if let Err(e) = self.pending.insert(request_id.clone(), subtype.as_str(), timeout, reply) {
            log::error!("{e}");
            return;
        }
        log::debug!("Sending {subtype} request {request_id}");
        if let Err(e) = self.transport.write(&line).await {
            self.pending.resolve(&request_id, Err(e));
        }
    }

    async fn route_send(
        &mut self,
        id: SubscriberId,
        line: String,
    ) -> Result<Delivery> {
        if let Some(ref reason) = self.down {
            return Err(ClaudeError::transport(reason.clone()));
        }
        match self.subscribers.send(id, line)? {
            Dispatch::Write(line) => {
                self.transport.write(&line).await?;
                Ok(Delivery::Written)
            }
            Dispatch::Held => Ok(Delivery::Held),
        }
    }

    async fn promote(&mut self, promotion: Option<Promotion>) {
        let Some(Promotion { id, flush }) = promotion else {
            return;
        };
        let Some(line) = flush else {
            return;
        };
        if let Err(e) = self.transport.write(&line).await {
            log::warn!("Failed to flush held message of subscriber {id}: {e}");
            self.subscribers.deliver(Err(e));
        }
    }

    async fn shutdown(&mut self) -> Result<()> {
        let cancelled = self.pending.cancel_all();
        if cancelled > 0 {
            log::debug!("Cancelled {cancelled} pending requests");
        }
        self.callbacks.abort_all();
        self.subscribers.clear();
        self.down.get_or_insert_with(|| "Session closed".to_string());
        let outcome = self.transport.close().await;
        self.publish_status(TransportStatus::Disconnected);
        outcome
    }

    // ========================================================================
    // Transport events
    // ========================================================================

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Line(line) => match protocol::decode(&line) {
                Ok(frame) => self.handle_frame(frame).await,
                Err(e) => log::warn!("Dropping malformed line from CLI: {e}"),
            },
            TransportEvent::Exited(code) => {
                let reason = match code {
                    Some(code) => format!("CLI exited with code {code}"),
                    None => "CLI exited".to_string(),
                };
                log::info!("{reason}");
                self.transport_down(reason, code.filter(|code| *code != 0));
            }
            TransportEvent::Failed(reason) => {
                log::error!("Transport failed: {reason}");
                self.transport_down(reason, None);
            }
        }
    }

    fn transport_down(&mut self, reason: String, exit_code: Option<i32>) {
        if self.down.is_some() {
            return;
        }
        let released = self
            .pending
            .release_all(|id, subtype| ClaudeError::transport(format!("{subtype} request {id} lost: {reason}")));
        if released > 0 {
            log::warn!("Released {released} pending requests: {reason}");
        }
        self.subscribers.fail_all(|| match exit_code {
            Some(code) => ClaudeError::process(reason.clone(), code, None),
            None => ClaudeError::transport(reason.clone()),
        });
        let status = if exit_code.is_some() {
            TransportStatus::Error
        } else {
            self.transport.status()
        };
        self.publish_status(status);
        self.down = Some(reason);
    }

    async fn handle_frame(&mut self, frame: ControlFrame) {
        match frame {
            ControlFrame::ControlResponse {
                request_id,
                outcome,
            } => {
                let outcome = match outcome {
                    ControlOutcome::Success { payload, .. } => Ok(payload),
                    ControlOutcome::Error(message) => Err(ClaudeError::remote(message)),
                };
                if !self.pending.resolve(&request_id, outcome) {
                    log::warn!("Response for unknown or expired request {request_id}");
                }
            }
            ControlFrame::ControlRequest {
                request_id,
                request,
            } => self.dispatch_inbound(request_id, request),
            ControlFrame::SdkMessage(payload) => self.handle_message(payload).await,
            ControlFrame::StreamEvent(envelope) => {
                let deltas = self.parser.parse(&envelope.event);
                let mut terminal = false;
                for delta in deltas {
                    terminal |= delta.is_terminal();
                    self.subscribers.deliver(Ok(SessionEvent::Stream(delta)));
                }
                if terminal {
                    self.end_turn().await;
                }
            }
        }
    }

    async fn handle_message(&mut self, payload: Value) {
        match parse_message(payload.clone()) {
            Ok(message) => {
                self.capture_session(&message);
                let terminal = message.is_result();
                self.subscribers.deliver(Ok(SessionEvent::Message(message)));
                if terminal {
                    self.end_turn().await;
                }
            }
            Err(e) => {
                log::debug!("Forwarding untyped message: {e}");
                self.subscribers.deliver(Ok(SessionEvent::Raw(payload)));
            }
        }
    }

    fn capture_session(&self, message: &Message) {
        let captures = match message {
            Message::System { subtype, .. } => subtype == "init",
            Message::Result { .. } => true,
            _ => false,
        };
        if !captures {
            return;
        }
        if let Some(session_id) = message.session_id() {
            self.state.send_if_modified(|state| {
                if state.session_id.as_ref() == Some(&session_id) {
                    return false;
                }
                log::debug!("Session id {session_id}");
                state.session_id = Some(session_id);
                true
            });
        }
    }

    async fn end_turn(&mut self) {
        let promotion = self.subscribers.retire_active();
        self.promote(promotion).await;
    }

    fn publish_status(&self, status: TransportStatus) {
        self.state.send_if_modified(|state| {
            if state.status == status {
                return false;
            }
            state.status = status;
            true
        });
    }

    // ========================================================================
    // Inbound control requests
    // ========================================================================

    fn dispatch_inbound(&mut self, request_id: RequestId, request: ControlRequest) {
        if self.mode == TransportMode::Lightweight {
            log::warn!(
                "Refusing {} request {request_id}: session runs in lightweight mode",
                request.subtype()
            );
            self.respond_later(ProtocolHandler::error_response(
                request_id,
                "Control protocol is not active for this session",
            ));
            return;
        }

        let session_id = self.state.borrow().session_id.clone();
        match request {
            ControlRequest::HookCallback {
                callback_id,
                input,
                tool_use_id,
            } => {
                let hooks = Arc::clone(&self.dispatchers.hooks);
                self.callbacks.spawn(async move {
                    match hooks.invoke_by_id(&callback_id, input, tool_use_id, session_id).await {
                        Ok(output) => ProtocolHandler::create_hook_response(request_id.clone(), &output)
                            .unwrap_or_else(|e| ProtocolHandler::error_response(request_id, e.to_string())),
                        Err(e) => ProtocolHandler::error_response(request_id, e.to_string()),
                    }
                });
            }
            ControlRequest::CanUseTool {
                tool_name,
                input,
                permission_suggestions,
                blocked_path,
            } => {
                let permissions = self.dispatchers.permissions.clone();
                self.callbacks.spawn(async move {
                    let context = ToolPermissionContext {
                        tool_name,
                        tool_input: input.clone(),
                        session_id,
                        suggestions: permission_suggestions.unwrap_or_default(),
                        blocked_path,
                    };
                    match permissions.decide(context).await {
                        Ok(result) => {
                            ProtocolHandler::create_permission_response(request_id.clone(), &result, &input)
                                .unwrap_or_else(|e| ProtocolHandler::error_response(request_id, e.to_string()))
                        }
                        Err(e) => ProtocolHandler::error_response(request_id, e.to_string()),
                    }
                });
            }
            ControlRequest::McpMessage {
                server_name,
                message,
            } => {
                let router = Arc::clone(&self.dispatchers.router);
                self.callbacks.spawn(async move {
                    let response = router.handle_message(&server_name, &message).await;
                    ProtocolHandler::create_mcp_response(request_id, response)
                });
            }
            ControlRequest::Unsupported {
                subtype, reason, ..
            } => {
                log::warn!("Unsupported control request {subtype} ({request_id}): {reason}");
                self.respond_later(ProtocolHandler::error_response(
                    request_id,
                    format!("Unsupported control request subtype: {subtype}"),
                ));
            }
            other => {
                log::warn!("Unexpected inbound {} request {request_id}", other.subtype());
                self.respond_later(ProtocolHandler::error_response(
                    request_id,
                    format!("{} is not handled by the SDK side", other.subtype()),
                ));
            }
        }
    }

    fn respond_later(&mut self, frame: ControlFrame) {
        self.callbacks.spawn(async move { frame });
    }

    async fn write_frame(&mut self, frame: &ControlFrame) {
        if self.down.is_some() {
            log::debug!("Dropping outbound frame: transport is down");
            return;
        }
        match protocol::encode(frame) {
            Ok(line) => {
                if let Err(e) = self.transport.write(&line).await {
                    log::warn!("Failed to write control response: {e}");
                }
            }
            Err(e) => log::error!("Failed to encode control frame: {e}"),
        }
    }
}
