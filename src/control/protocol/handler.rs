//! Protocol handler: request ids and frame construction

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::error::Result;
use crate::types::hooks::HookOutput;
use crate::types::identifiers::{RequestId, SessionId};
use crate::types::permissions::PermissionResult;

use super::frames::{ControlFrame, ControlOutcome, ControlRequest};

/// Builds control frames for one session
///
/// Request ids combine a per-session counter with a random suffix, so an id
/// is never handed out twice by the same handler.
pub struct ProtocolHandler {
    /// Request ID counter
    next_request_id: AtomicU64,
}

impl ProtocolHandler {
    /// Create a new protocol handler
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_request_id: AtomicU64::new(1),
        }
    }

    /// Generate next request ID
    #[must_use]
    pub fn next_id(&self) -> RequestId {
        let id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        RequestId::new(format!("req_{id}_{}", &suffix[..8]))
    }

    /// Wrap `request` in a frame with a fresh id
    #[must_use]
    pub fn request(&self, request: ControlRequest) -> (RequestId, ControlFrame) {
        let request_id = self.next_id();
        (
            request_id.clone(),
            ControlFrame::ControlRequest {
                request_id,
                request,
            },
        )
    }

    /// Success response carrying `payload`
    #[must_use]
    pub fn success_response(request_id: RequestId, payload: Value) -> ControlFrame {
        ControlFrame::ControlResponse {
            request_id,
            outcome: ControlOutcome::success(payload),
        }
    }

    /// Error response carrying `message`
    #[must_use]
    pub fn error_response(request_id: RequestId, message: impl Into<String>) -> ControlFrame {
        ControlFrame::ControlResponse {
            request_id,
            outcome: ControlOutcome::Error(message.into()),
        }
    }

    /// Response to a `hook_callback` request
    ///
    /// # Errors
    /// Returns error if the output cannot be serialized
    pub fn create_hook_response(request_id: RequestId, output: &HookOutput) -> Result<ControlFrame> {
        Ok(Self::success_response(request_id, serde_json::to_value(output)?))
    }

    /// Response to a `can_use_tool` request
    ///
    /// An allow without a replacement input echoes `original_input`, so the
    /// CLI always receives the input to run with.
    ///
    /// # Errors
    /// Returns error if the result cannot be serialized
    pub fn create_permission_response(
        request_id: RequestId,
        result: &PermissionResult,
        original_input: &Value,
    ) -> Result<ControlFrame> {
        let mut payload = serde_json::to_value(result)?;
        if result.is_allow()
            && let Value::Object(ref mut map) = payload
            && !map.contains_key("updated_input")
        {
            map.insert("updated_input".into(), original_input.clone());
        }
        Ok(Self::success_response(request_id, payload))
    }

    /// Response to an `mcp_message` request
    #[must_use]
    pub fn create_mcp_response(request_id: RequestId, message: Value) -> ControlFrame {
        Self::success_response(request_id, serde_json::json!({ "mcp_response": message }))
    }

    /// Line carrying a user prompt in stream-json input format
    ///
    /// # Errors
    /// Returns error if the content cannot be serialized
    pub fn user_message(content: &Value, session_id: Option<&SessionId>) -> Result<String> {
        let session = session_id.map_or("default", SessionId::as_str);
        Ok(serde_json::to_string(&serde_json::json!({
            "type": "user",
            "message": { "role": "user", "content": content },
            "parent_tool_use_id": null,
            "session_id": session,
        }))?)
    }
}

impl Default for ProtocolHandler {
    fn default() -> Self {
        Self::new()
    }
}
