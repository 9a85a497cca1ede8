//! Hook-related type definitions
//!
//! This module contains types for managing hooks, including hook events,
//! hook decisions, hook outputs, and hook callbacks.
//!
//! Field names here are the internal (snake case) spelling. The codec renames
//! them to the CLI's wire spelling (`hookSpecificOutput`, `systemMessage`,
//! `continue`, ...) when a hook response is sent.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::identifiers::SessionId;
use crate::error::Result;

// ============================================================================
// Hook Types
// ============================================================================

/// Hook event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookEvent {
    /// Before a tool is used
    PreToolUse,
    /// After a tool is used
    PostToolUse,
    /// When the CLI emits a notification
    Notification,
    /// When user submits a prompt
    UserPromptSubmit,
    /// When a session starts or resumes
    SessionStart,
    /// When a session ends
    SessionEnd,
    /// When conversation stops
    Stop,
    /// When a subagent stops
    SubagentStop,
    /// Before compacting the conversation
    PreCompact,
}

impl HookEvent {
    /// All hook events, in dispatch-table order
    pub const ALL: [Self; 9] = [
        Self::PreToolUse,
        Self::PostToolUse,
        Self::Notification,
        Self::UserPromptSubmit,
        Self::SessionStart,
        Self::SessionEnd,
        Self::Stop,
        Self::SubagentStop,
        Self::PreCompact,
    ];

    /// Wire name of the event
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::Notification => "Notification",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::SessionStart => "SessionStart",
            Self::SessionEnd => "SessionEnd",
            Self::Stop => "Stop",
            Self::SubagentStop => "SubagentStop",
            Self::PreCompact => "PreCompact",
        }
    }

    /// Parse a wire name, accepting snake case as well (`pre_tool_use`)
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let folded: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|event| event.as_str().to_ascii_lowercase() == folded)
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level hook decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookDecision {
    /// Block the action
    Block,
}

/// Permission decision carried in `PreToolUse` hook output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPermissionDecision {
    /// Let the tool run
    Allow,
    /// Refuse the tool call
    Deny,
    /// Defer to the user
    Ask,
}

/// Event-specific part of a hook output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSpecificOutput {
    /// Event this output answers
    pub hook_event_name: HookEvent,
    /// Allow/deny/ask for `PreToolUse`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_decision: Option<HookPermissionDecision>,
    /// Reason shown alongside the permission decision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,
    /// Extra context injected into the conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    /// Replacement tool input for `PreToolUse`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<serde_json::Value>,
}

impl HookSpecificOutput {
    /// Empty event-specific output for `event`
    #[must_use]
    pub const fn new(event: HookEvent) -> Self {
        Self {
            hook_event_name: event,
            permission_decision: None,
            permission_decision_reason: None,
            additional_context: None,
            updated_input: None,
        }
    }
}

/// Hook output
///
/// `HookOutput::default()` is the neutral output: it neither blocks nor
/// modifies anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookOutput {
    /// `Some(false)` asks the agent to stop after this hook
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_: Option<bool>,
    /// Hide the tool output from the transcript
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress_output: Option<bool>,
    /// Message shown when `continue_` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    /// Decision to block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<HookDecision>,
    /// System message to add
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    /// Reason for the decision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Hook-specific output data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

impl HookOutput {
    /// Allow a `PreToolUse` tool call
    #[must_use]
    pub fn allow() -> Self {
        Self::permission(HookPermissionDecision::Allow, None)
    }

    /// Deny a `PreToolUse` tool call
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::permission(HookPermissionDecision::Deny, Some(reason.into()))
    }

    /// Ask the user about a `PreToolUse` tool call
    #[must_use]
    pub fn ask(reason: impl Into<String>) -> Self {
        Self::permission(HookPermissionDecision::Ask, Some(reason.into()))
    }

    fn permission(decision: HookPermissionDecision, reason: Option<String>) -> Self {
        let mut specific = HookSpecificOutput::new(HookEvent::PreToolUse);
        specific.permission_decision = Some(decision);
        specific.permission_decision_reason = reason;
        Self {
            hook_specific_output: Some(specific),
            ..Self::default()
        }
    }

    /// Add context text for `event`
    #[must_use]
    pub fn context(event: HookEvent, text: impl Into<String>) -> Self {
        let mut specific = HookSpecificOutput::new(event);
        specific.additional_context = Some(text.into());
        Self {
            hook_specific_output: Some(specific),
            ..Self::default()
        }
    }

    /// Ask the agent to stop
    #[must_use]
    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            continue_: Some(false),
            stop_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Block the action with a reason
    #[must_use]
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: Some(HookDecision::Block),
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Attach a system message
    #[must_use]
    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    /// Hide the tool output
    #[must_use]
    pub const fn suppressing_output(mut self) -> Self {
        self.suppress_output = Some(true);
        self
    }

    /// Whether this output is the neutral output
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

/// Context for hook callbacks
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    /// Session the hook fired in, once known
    pub session_id: Option<SessionId>,
    /// Cancelled when the callback's time budget runs out
    pub cancellation: CancellationToken,
}

/// Hook callback type
///
/// Invoked with the hook input sent by the CLI, the tool use id (for tool
/// events), and a [`HookContext`].
pub type HookCallback = Arc<
    dyn Fn(
            serde_json::Value,
            Option<String>,
            HookContext,
        ) -> Pin<Box<dyn Future<Output = Result<HookOutput>> + Send>>
        + Send
        + Sync,
>;

/// Hook matcher configuration
#[derive(Clone)]
pub struct HookMatcher {
    /// Matcher pattern: `None` fires for everything, `"*"` for any tool,
    /// otherwise a tool name (or `"Write|Edit"` alternatives)
    pub matcher: Option<String>,
    /// List of hook callbacks
    pub hooks: Vec<HookCallback>,
    /// Time budget for each callback; the client default applies when unset
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for HookMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookMatcher")
            .field("matcher", &self.matcher)
            .field("hooks", &format!("[{} callbacks]", self.hooks.len()))
            .field("timeout", &self.timeout)
            .finish()
    }
}
