//! Wire frames of the control protocol
//!
//! Every line exchanged with the CLI decodes into exactly one [`ControlFrame`].
//! Downstream code matches on the variant; nothing re-inspects raw JSON to
//! find out what kind of line it got.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClaudeError, Result};
use crate::types::identifiers::{RequestId, SessionId, ToolName};
use crate::types::permissions::{PermissionMode, PermissionUpdate};

use super::casing;

/// One line of the protocol
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFrame {
    /// Correlated request, in either direction
    ControlRequest {
        /// Correlation id
        request_id: RequestId,
        /// Subtype and payload
        request: ControlRequest,
    },
    /// Answer to a correlated request
    ControlResponse {
        /// Id of the request being answered
        request_id: RequestId,
        /// Success payload or error message
        outcome: ControlOutcome,
    },
    /// Conversation message, passed through untouched
    SdkMessage(Value),
    /// Partial-message streaming event
    StreamEvent(StreamEventEnvelope),
}

/// Result carried by a `control_response`
#[derive(Debug, Clone, PartialEq)]
pub enum ControlOutcome {
    /// Success with its (internally cased) payload; `Null` when absent
    Success {
        /// The payload
        payload: Value,
        /// Key the payload travels under
        key: PayloadKey,
    },
    /// Error message from the other side
    Error(String),
}

impl ControlOutcome {
    /// Success under the usual `response` key
    #[must_use]
    pub const fn success(payload: Value) -> Self {
        Self::Success {
            payload,
            key: PayloadKey::Response,
        }
    }
}

/// Key of a success payload inside the response object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PayloadKey {
    /// `response`, as the CLI sends it
    #[default]
    Response,
    /// `result`
    Result,
}

impl PayloadKey {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Response => "response",
            Self::Result => "result",
        }
    }
}

/// Control request subtypes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Start the control session, describing hooks and agents
    Initialize {
        /// Hook registrations keyed by event name
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hooks: Option<Value>,
        /// Named agent definitions
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agents: Option<Value>,
    },
    /// Switch the model
    SetModel {
        /// Model name; `None` restores the default
        #[serde(default)]
        model: Option<String>,
    },
    /// Switch the permission mode
    SetPermissionMode {
        /// New mode
        mode: PermissionMode,
    },
    /// Interrupt the running turn
    Interrupt,
    /// Restore files to their state at a user message
    RewindFiles {
        /// Message whose checkpoint to restore
        user_message_id: String,
    },
    /// The CLI asks whether a tool may run
    CanUseTool {
        /// Tool the agent wants to use
        tool_name: ToolName,
        /// Tool input
        #[serde(default)]
        input: Value,
        /// Permission updates the CLI suggests
        #[serde(default, skip_serializing_if = "Option::is_none")]
        permission_suggestions: Option<Vec<PermissionUpdate>>,
        /// Path that triggered the prompt
        #[serde(default, skip_serializing_if = "Option::is_none")]
        blocked_path: Option<String>,
    },
    /// The CLI fires a registered hook
    HookCallback {
        /// Registration id handed out at initialize
        callback_id: String,
        /// Hook input
        #[serde(default)]
        input: Value,
        /// Tool use the hook fired for
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_use_id: Option<String>,
    },
    /// The CLI routes a JSON-RPC message to an in-process server
    McpMessage {
        /// Routing key of the server
        server_name: String,
        /// JSON-RPC message
        message: Value,
    },
    /// Subtype this client does not know, or a payload it could not read
    #[serde(skip)]
    Unsupported {
        /// Subtype as received
        subtype: String,
        /// Full request object as received
        payload: Value,
        /// Why it could not be read
        reason: String,
    },
}

impl ControlRequest {
    /// Wire subtype
    #[must_use]
    pub fn subtype(&self) -> &str {
        match self {
            Self::Initialize { .. } => "initialize",
            Self::SetModel { .. } => "set_model",
            Self::SetPermissionMode { .. } => "set_permission_mode",
            Self::Interrupt => "interrupt",
            Self::RewindFiles { .. } => "rewind_files",
            Self::CanUseTool { .. } => "can_use_tool",
            Self::HookCallback { .. } => "hook_callback",
            Self::McpMessage { .. } => "mcp_message",
            Self::Unsupported { subtype, .. } => subtype,
        }
    }
}

/// Envelope of a `stream_event` line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEventEnvelope {
    /// Event UUID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Session the event belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Nested streaming payload (`message_start`, `content_block_delta`, ...)
    pub event: Value,
    /// Parent tool use for subagent streams
    ///
    /// The outer `Option` records whether the field was on the line at all.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<Option<String>>,
    /// Envelope fields not listed above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Decode one line
///
/// # Errors
/// Returns `JsonDecode` for invalid JSON and `MessageParse` for JSON that is
/// not a frame
pub fn decode(line: &str) -> Result<ControlFrame> {
    let value: Value = serde_json::from_str(line.trim())?;
    decode_value(value)
}

/// Decode an already parsed line
///
/// # Errors
/// Returns `MessageParse` when the value is not a frame
pub fn decode_value(value: Value) -> Result<ControlFrame> {
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err(ClaudeError::message_parse(
            "Frame has no string \"type\" field",
            Some(value),
        ));
    };

    match kind {
        "control_request" => decode_request(value),
        "control_response" => decode_response(value),
        "stream_event" => {
            let mut envelope: StreamEventEnvelope = serde_json::from_value(value.clone())
                .map_err(|e| {
                    ClaudeError::message_parse(format!("Invalid stream_event: {e}"), Some(value))
                })?;
            envelope.extra.remove("type");
            Ok(ControlFrame::StreamEvent(envelope))
        }
        _ => Ok(ControlFrame::SdkMessage(value)),
    }
}

fn request_id_of(value: &Value, field: &str) -> Option<RequestId> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(RequestId::from)
}

fn decode_request(value: Value) -> Result<ControlFrame> {
    let Some(request_id) = request_id_of(&value, "request_id") else {
        return Err(ClaudeError::message_parse(
            "control_request without request_id",
            Some(value),
        ));
    };
    let Some(body) = value.get("request").filter(|body| body.is_object()) else {
        return Err(ClaudeError::message_parse(
            "control_request without request object",
            Some(value),
        ));
    };
    let Some(subtype) = body.get("subtype").and_then(Value::as_str) else {
        return Err(ClaudeError::message_parse(
            "control_request without subtype",
            Some(value),
        ));
    };
    let subtype = subtype.to_string();
    let body = casing::from_wire(body.clone());

    let request = match serde_json::from_value::<ControlRequest>(body.clone()) {
        Ok(request) => request,
        Err(e) => ControlRequest::Unsupported {
            subtype,
            payload: body,
            reason: e.to_string(),
        },
    };
    Ok(ControlFrame::ControlRequest {
        request_id,
        request,
    })
}

fn decode_response(value: Value) -> Result<ControlFrame> {
    let Some(body) = value.get("response").filter(|body| body.is_object()) else {
        return Err(ClaudeError::message_parse(
            "control_response without response object",
            Some(value),
        ));
    };
    let Some(request_id) = request_id_of(body, "request_id") else {
        return Err(ClaudeError::message_parse(
            "control_response without request_id",
            Some(value),
        ));
    };

    let is_error = match body.get("subtype").and_then(Value::as_str) {
        Some(subtype) => subtype == "error",
        None => body.get("error").is_some(),
    };
    let outcome = if is_error {
        let message = body
            .get("error")
            .or_else(|| body.get("message"))
            .map_or_else(
                || "unknown error".to_string(),
                |error| match error {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                },
            );
        ControlOutcome::Error(message)
    } else {
        let (key, payload) = match (body.get("response"), body.get("result")) {
            (Some(payload), _) => (PayloadKey::Response, payload.clone()),
            (None, Some(payload)) => (PayloadKey::Result, payload.clone()),
            (None, None) => (PayloadKey::Response, Value::Null),
        };
        ControlOutcome::Success {
            payload: casing::from_wire(payload),
            key,
        }
    };

    Ok(ControlFrame::ControlResponse {
        request_id,
        outcome,
    })
}

/// Encode a frame as one line, without the terminator
///
/// # Errors
/// Returns `JsonDecode` if a payload cannot be serialized
pub fn encode(frame: &ControlFrame) -> Result<String> {
    let value = match frame {
        ControlFrame::ControlRequest {
            request_id,
            request,
        } => {
            let body = match request {
                ControlRequest::Unsupported { payload, .. } => payload.clone(),
                known => serde_json::to_value(known)?,
            };
            serde_json::json!({
                "type": "control_request",
                "request_id": request_id,
                "request": casing::to_wire(body),
            })
        }
        ControlFrame::ControlResponse {
            request_id,
            outcome,
        } => {
            let mut body = Map::new();
            match outcome {
                ControlOutcome::Success { payload, key } => {
                    body.insert("subtype".into(), Value::from("success"));
                    body.insert("request_id".into(), Value::from(request_id.as_str()));
                    if !payload.is_null() {
                        body.insert(key.as_str().into(), casing::to_wire(payload.clone()));
                    }
                }
                ControlOutcome::Error(message) => {
                    body.insert("subtype".into(), Value::from("error"));
                    body.insert("request_id".into(), Value::from(request_id.as_str()));
                    body.insert("error".into(), Value::from(message.as_str()));
                }
            }
            serde_json::json!({
                "type": "control_response",
                "response": body,
            })
        }
        ControlFrame::SdkMessage(value) => value.clone(),
        ControlFrame::StreamEvent(envelope) => {
            let mut value = serde_json::to_value(envelope)?;
            if let Value::Object(ref mut map) = value {
                map.insert("type".into(), Value::from("stream_event"));
            }
            value
        }
    };
    Ok(serde_json::to_string(&value)?)
}
