//! Message-related type definitions
//!
//! This module contains types for representing messages, content blocks,
//! and various message formats used in conversations with Claude.

use super::identifiers::SessionId;
use serde::{Deserialize, Serialize};

// ============================================================================
// Message Types
// ============================================================================

/// Content value for tool results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentValue {
    /// String content
    String(String),
    /// Structured content blocks
    Blocks(Vec<serde_json::Value>),
}

/// Content block types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content block
    Text {
        /// Text content
        text: String,
    },
    /// Thinking content block (extended thinking)
    Thinking {
        /// Thinking content
        thinking: String,
        /// Signature for verification
        #[serde(default)]
        signature: String,
    },
    /// Tool use request
    ToolUse {
        /// Tool use ID
        id: String,
        /// Tool name
        name: String,
        /// Tool input parameters
        input: serde_json::Value,
    },
    /// Tool execution result
    ToolResult {
        /// ID of the tool use this is a result for
        tool_use_id: String,
        /// Result content
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<ContentValue>,
        /// Whether this is an error result
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// User message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessageContent {
    /// Message role (always "user")
    pub role: String,
    /// Message content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<UserContent>,
}

/// User content can be string or blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    /// Plain string content
    String(String),
    /// Structured content blocks
    Blocks(Vec<ContentBlock>),
}

/// Assistant message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessageContent {
    /// Model that generated the message
    #[serde(default)]
    pub model: String,
    /// Message content blocks
    pub content: Vec<ContentBlock>,
}

impl AssistantMessageContent {
    /// Concatenated text of all text blocks
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Typed messages the CLI emits between control frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// User message
    User {
        /// Parent tool use ID for nested conversations
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_tool_use_id: Option<String>,
        /// Message content
        message: UserMessageContent,
        /// Session ID
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
    /// Assistant message
    Assistant {
        /// Parent tool use ID for nested conversations
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_tool_use_id: Option<String>,
        /// Message content
        message: AssistantMessageContent,
        /// Session ID
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
    /// System message
    System {
        /// System message subtype
        subtype: String,
        /// Additional system message data
        #[serde(flatten)]
        data: serde_json::Value,
    },
    /// Result message with metrics; terminal for the current turn
    Result {
        /// Result subtype
        subtype: String,
        /// Total duration in milliseconds
        #[serde(default)]
        duration_ms: u64,
        /// API call duration in milliseconds
        #[serde(default)]
        duration_api_ms: u64,
        /// Whether this is an error result
        #[serde(default)]
        is_error: bool,
        /// Number of conversation turns
        #[serde(default)]
        num_turns: u32,
        /// Session ID
        #[serde(default)]
        session_id: SessionId,
        /// Total cost in USD
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_cost_usd: Option<f64>,
        /// Token usage statistics
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<serde_json::Value>,
        /// Result message
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
}

impl Message {
    /// Whether this message ends the current turn
    #[must_use]
    pub const fn is_result(&self) -> bool {
        matches!(self, Self::Result { .. })
    }

    /// Session id carried by the message, if any
    ///
    /// `system/init` messages carry it in their data.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Self::User { session_id, .. } | Self::Assistant { session_id, .. } => {
                session_id.clone()
            }
            Self::Result { session_id, .. } => Some(session_id.clone()),
            Self::System { data, .. } => data
                .get("session_id")
                .and_then(serde_json::Value::as_str)
                .map(SessionId::from),
        }
    }
}
