//! Tests for transport-mode selection

use kodegen_claude_control::control::mode::{features_from_value, mode_for};
use kodegen_claude_control::control::protocol::ControlFeatures;
use kodegen_claude_control::hooks::HookMatcherBuilder;
use kodegen_claude_control::{
    AgentDefinition, ClaudeAgentOptions, HookEvent, HookManager, HookOutput, McpServerConfig,
    PermissionManager, PermissionMode, PermissionResult, SdkMcpServer, TransportMode, select_mode,
    select_mode_from_value,
};
use serde_json::json;

#[test]
fn test_empty_config_is_lightweight() {
    assert_eq!(select_mode_from_value(&json!({})), TransportMode::Lightweight);
    assert_eq!(select_mode(&ClaudeAgentOptions::default()), TransportMode::Lightweight);
}

#[test]
fn test_hooks_need_full_control() {
    let config = json!({"hooks": {"pre_tool_use": [{"matcher": "Bash"}]}});
    assert_eq!(select_mode_from_value(&config), TransportMode::FullControl);
    assert_eq!(
        select_mode_from_value(&json!({"hooks": {"pre_tool_use": []}})),
        TransportMode::Lightweight
    );
}

#[test]
fn test_each_feature_needs_full_control() {
    let configs = [
        json!({"mcp_servers": {"calc": {"type": "sdk", "name": "calc"}}}),
        json!({"mcpServers": {"calc": {"instance": {"name": "calc"}}}}),
        json!({"can_use_tool": true}),
        json!({"agents": {"reviewer": {"description": "d", "prompt": "p"}}}),
        json!({"permission_mode": "acceptEdits"}),
    ];
    for config in &configs {
        assert_eq!(select_mode_from_value(config), TransportMode::FullControl, "{config}");
    }
}

#[test]
fn test_non_control_settings_stay_lightweight() {
    let config = json!({
        "mcp_servers": {"remote": {"type": "stdio", "command": "server"}},
        "permission_mode": "default",
        "can_use_tool": null,
        "agents": {},
        "model": "opus"
    });
    assert_eq!(select_mode_from_value(&config), TransportMode::Lightweight);
}

#[test]
fn test_garbage_defaults_to_lightweight() {
    for config in [
        json!(null),
        json!(42),
        json!("hooks"),
        json!([1, 2, 3]),
        json!({"hooks": "yes please", "agents": 7, "transport_mode": "warp"}),
        json!({"permission_mode": "banana"}),
        json!({"permissionMode": 3}),
        json!({"hooks": {"not_an_event": ["x"]}}),
        json!({"hooks": [{"matcher": "Bash"}]}),
        json!({"can_use_tool": "nope"}),
        json!({"canUseTool": 1}),
    ] {
        assert_eq!(select_mode_from_value(&config), TransportMode::Lightweight, "{config}");
    }
}

#[test]
fn test_override_wins() {
    let config = json!({"hooks": {"PreToolUse": [{}]}, "transport_mode": "lightweight"});
    assert_eq!(select_mode_from_value(&config), TransportMode::Lightweight);
    assert_eq!(
        select_mode_from_value(&json!({"transportMode": "full_control"})),
        TransportMode::FullControl
    );

    let options = ClaudeAgentOptions::builder()
        .permission_mode(PermissionMode::BypassPermissions)
        .transport_mode(TransportMode::Lightweight)
        .build();
    assert_eq!(select_mode(&options), TransportMode::Lightweight);
}

#[test]
fn test_typed_options_detection() {
    let hook = HookManager::callback(|_, _, _| async { Ok(HookOutput::default()) });
    let options = ClaudeAgentOptions::builder()
        .add_hook(
            HookEvent::PreToolUse,
            HookMatcherBuilder::new(Some("Bash")).add_hook(hook).build(),
        )
        .build();
    assert_eq!(ControlFeatures::detect(&options), ControlFeatures::HOOKS);
    assert_eq!(select_mode(&options), TransportMode::FullControl);

    let options = ClaudeAgentOptions::builder()
        .add_mcp_server("calc", McpServerConfig::Sdk(SdkMcpServer::new("calc")))
        .can_use_tool(PermissionManager::callback(|_| async { Ok(PermissionResult::allow()) }))
        .add_agent("reviewer", AgentDefinition::new("Reviews code", "You review code"))
        .build();
    assert_eq!(
        ControlFeatures::detect(&options),
        ControlFeatures::SDK_MCP | ControlFeatures::PERMISSION_CALLBACK | ControlFeatures::AGENTS
    );
}

#[test]
fn test_permission_mode_spellings() {
    for mode in ["acceptEdits", "accept_edits", "plan", "bypassPermissions", "bypass_permissions"] {
        assert_eq!(
            select_mode_from_value(&json!({"permission_mode": mode})),
            TransportMode::FullControl,
            "{mode}"
        );
    }
    assert_eq!(
        select_mode_from_value(&json!({"permissionMode": "default"})),
        TransportMode::Lightweight
    );
}

#[test]
fn test_hook_event_names_in_either_case() {
    for event in ["PreToolUse", "pre_tool_use", "Stop", "user_prompt_submit"] {
        let mut hooks = serde_json::Map::new();
        hooks.insert(event.to_string(), json!([{"matcher": null}]));
        assert_eq!(
            select_mode_from_value(&json!({"hooks": hooks})),
            TransportMode::FullControl,
            "{event}"
        );
    }
}

#[test]
fn test_features_map_to_modes() {
    assert_eq!(mode_for(ControlFeatures::empty()), TransportMode::Lightweight);
    assert_eq!(mode_for(ControlFeatures::AGENTS), TransportMode::FullControl);
    assert_eq!(
        features_from_value(&json!({"permissionMode": "plan", "canUseTool": {"fn": 1}})),
        ControlFeatures::PERMISSION_MODE | ControlFeatures::PERMISSION_CALLBACK
    );
}

#[test]
fn test_mode_parse() {
    assert_eq!(TransportMode::parse("Full-Control"), Some(TransportMode::FullControl));
    assert_eq!(TransportMode::parse(" lightweight "), Some(TransportMode::Lightweight));
    assert_eq!(TransportMode::parse("turbo"), None);
}
