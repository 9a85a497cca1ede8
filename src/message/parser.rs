//! Message parser for Claude Code CLI output

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClaudeError, Result};
use crate::types::messages::Message;

/// Parse a JSON value into a typed [`Message`]
///
/// # Errors
/// Returns `ClaudeError::MessageParse` carrying the raw value if it does not
/// have the shape of a known message type
pub fn parse_message(data: Value) -> Result<Message> {
    Message::deserialize(&data).map_err(|e| {
        ClaudeError::message_parse(format!("Failed to parse message: {e}"), Some(data.clone()))
    })
}

/// Parse one line of CLI output into a typed [`Message`]
///
/// # Errors
/// `JsonDecode` for invalid JSON, `MessageParse` for unknown shapes
pub fn parse_line(line: &str) -> Result<Message> {
    let value: Value = serde_json::from_str(line.trim())?;
    parse_message(value)
}
