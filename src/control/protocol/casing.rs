//! Field-name casing between the wire and the internal representation
//!
//! Internal payloads use snake case. A fixed set of response fields travels in
//! the CLI's mixed-case spelling, so payloads are rewritten at the codec
//! boundary in both directions. Values under opaque keys (tool inputs, MCP
//! messages) belong to someone else and are never rewritten.

use serde_json::{Map, Value};

/// Internal name and wire name of every renamed field
pub const FIELD_RENAMES: &[(&str, &str)] = &[
    ("updated_input", "updatedInput"),
    ("updated_permissions", "updatedPermissions"),
    ("hook_specific_output", "hookSpecificOutput"),
    ("hook_event_name", "hookEventName"),
    ("permission_decision", "permissionDecision"),
    ("permission_decision_reason", "permissionDecisionReason"),
    ("additional_context", "additionalContext"),
    ("system_message", "systemMessage"),
    ("suppress_output", "suppressOutput"),
    ("stop_reason", "stopReason"),
    ("continue_", "continue"),
    ("async_", "async"),
];

/// Renames that only apply inside permission rule values
pub const RULE_RENAMES: &[(&str, &str)] = &[
    ("tool_name", "toolName"),
    ("rule_content", "ruleContent"),
];

/// Keys whose values pass through untouched
const OPAQUE_KEYS: &[&str] = &[
    "input",
    "tool_input",
    "updated_input",
    "updatedInput",
    "message",
    "mcp_response",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    ToWire,
    FromWire,
}

/// Rewrite internal field names to their wire spelling
#[must_use]
pub fn to_wire(value: Value) -> Value {
    rename(value, Direction::ToWire, false)
}

/// Rewrite wire field names to their internal spelling
#[must_use]
pub fn from_wire(value: Value) -> Value {
    rename(value, Direction::FromWire, false)
}

fn lookup(table: &[(&'static str, &'static str)], key: &str, direction: Direction) -> Option<&'static str> {
    table.iter().find_map(|(internal, wire)| match direction {
        Direction::ToWire if *internal == key => Some(*wire),
        Direction::FromWire if *wire == key => Some(*internal),
        _ => None,
    })
}

fn rename(value: Value, direction: Direction, in_rule: bool) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                let renamed = in_rule
                    .then(|| lookup(RULE_RENAMES, &key, direction))
                    .flatten()
                    .or_else(|| lookup(FIELD_RENAMES, &key, direction))
                    .map_or(key, str::to_string);

                let child = if OPAQUE_KEYS.contains(&renamed.as_str()) {
                    child
                } else if renamed == "rules" {
                    rename_rules(child, direction)
                } else {
                    rename(child, direction, false)
                };
                out.insert(renamed, child);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rename(item, direction, in_rule))
                .collect(),
        ),
        other => other,
    }
}

fn rename_rules(value: Value, direction: Direction) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rename(item, direction, true))
                .collect(),
        ),
        other => rename(other, direction, false),
    }
}
