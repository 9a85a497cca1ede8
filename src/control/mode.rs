//! Transport-mode selection
//!
//! A session runs either without the control protocol (lightweight) or with
//! it (full control). The choice is a pure function of configuration:
//!
//! 1. an explicit override always wins;
//! 2. otherwise full control is chosen iff some configured feature needs the
//!    control channel (see [`ControlFeatures`]);
//! 3. otherwise lightweight.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::protocol::ControlFeatures;
use crate::types::hooks::HookEvent;
use crate::types::options::ClaudeAgentOptions;
use crate::types::permissions::PermissionMode;

/// Operating mode of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Plain streaming, no control protocol
    Lightweight,
    /// Control protocol active
    FullControl,
}

impl TransportMode {
    /// Parse an override value; unknown spellings give `None`
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "lightweight" | "light" | "simple" => Some(Self::Lightweight),
            "full_control" | "full" | "control" => Some(Self::FullControl),
            _ => None,
        }
    }
}

/// Mode for typed options
#[must_use]
pub fn select_mode(options: &ClaudeAgentOptions) -> TransportMode {
    if let Some(mode) = options.transport_mode {
        return mode;
    }
    mode_for(ControlFeatures::detect(options))
}

/// Mode for features already detected
#[must_use]
pub fn mode_for(features: ControlFeatures) -> TransportMode {
    if features.is_empty() {
        TransportMode::Lightweight
    } else {
        TransportMode::FullControl
    }
}

/// Mode for an untyped configuration value
///
/// Accepts snake or camel case keys. Anything unrecognized, including a
/// non-object value, counts as "not configured".
#[must_use]
pub fn select_mode_from_value(config: &Value) -> TransportMode {
    if let Some(mode) = field(config, &["transport_mode", "transportMode"])
        .and_then(Value::as_str)
        .and_then(TransportMode::parse)
    {
        return mode;
    }
    mode_for(features_from_value(config))
}

/// Features configured in an untyped configuration value
#[must_use]
pub fn features_from_value(config: &Value) -> ControlFeatures {
    let mut features = ControlFeatures::empty();

    if field(config, &["hooks"]).is_some_and(has_hook_registrations) {
        features |= ControlFeatures::HOOKS;
    }
    if field(config, &["mcp_servers", "mcpServers"]).is_some_and(has_sdk_server) {
        features |= ControlFeatures::SDK_MCP;
    }
    if field(config, &["can_use_tool", "canUseTool", "permission_callback"])
        .is_some_and(|callback| matches!(callback, Value::Bool(true) | Value::Object(_)))
    {
        features |= ControlFeatures::PERMISSION_CALLBACK;
    }
    if field(config, &["agents"]).is_some_and(is_non_empty) {
        features |= ControlFeatures::AGENTS;
    }
    if field(config, &["permission_mode", "permissionMode"])
        .and_then(Value::as_str)
        .and_then(parse_permission_mode)
        .is_some_and(|mode| mode != PermissionMode::Default)
    {
        features |= ControlFeatures::PERMISSION_MODE;
    }
    features
}

fn field<'a>(config: &'a Value, names: &[&str]) -> Option<&'a Value> {
    let map = config.as_object()?;
    names.iter().find_map(|name| map.get(*name))
}

/// Only registrations under a known event name count
fn has_hook_registrations(hooks: &Value) -> bool {
    hooks.as_object().is_some_and(|events| {
        events
            .iter()
            .any(|(event, matchers)| HookEvent::parse(event).is_some() && is_non_empty(matchers))
    })
}

/// Wire spelling (`acceptEdits`) or snake case (`accept_edits`)
fn parse_permission_mode(raw: &str) -> Option<PermissionMode> {
    let mut camel = String::with_capacity(raw.len());
    let mut upper = false;
    for c in raw.trim().chars() {
        if c == '_' || c == '-' {
            upper = true;
        } else if upper {
            camel.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            camel.push(c);
        }
    }
    serde_json::from_value(Value::String(camel)).ok()
}

fn has_sdk_server(servers: &Value) -> bool {
    let is_sdk = |server: &Value| {
        server.get("type").and_then(Value::as_str) == Some("sdk")
            || server.get("instance").is_some_and(is_set)
    };
    match servers {
        Value::Object(named) => named.values().any(is_sdk),
        Value::Array(list) => list.iter().any(is_sdk),
        _ => false,
    }
}

fn is_set(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}
