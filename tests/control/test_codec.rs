//! Tests for the control frame codec and wire casing

use kodegen_claude_control::control::protocol::{
    ControlFrame, ControlOutcome, ControlRequest, PayloadKey, ProtocolHandler, casing, decode,
    encode,
};
use kodegen_claude_control::{
    ClaudeError, HookEvent, HookOutput, PermissionResult, PermissionResultAllow,
    PermissionRuleValue, PermissionUpdate, RequestId, SessionId,
};
use serde_json::{Value, json};

fn roundtrip(line: &Value) -> Value {
    let frame = decode(&line.to_string()).unwrap();
    serde_json::from_str(&encode(&frame).unwrap()).unwrap()
}

#[test]
fn test_request_id_generation() {
    let handler = ProtocolHandler::new();
    let ids: std::collections::HashSet<RequestId> = (0..1000).map(|_| handler.next_id()).collect();
    assert_eq!(ids.len(), 1000);
    assert!(handler.next_id().as_str().starts_with("req_1001_"));
}

#[test]
fn test_interrupt_request_shape() {
    let handler = ProtocolHandler::new();
    let (id, frame) = handler.request(ControlRequest::Interrupt);
    let line: Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();

    assert_eq!(line["type"], "control_request");
    assert_eq!(line["request_id"], id.as_str());
    assert_eq!(line["request"], json!({"subtype": "interrupt"}));
}

#[test]
fn test_set_model_and_rewind_requests() {
    let handler = ProtocolHandler::new();
    let (_, frame) = handler.request(ControlRequest::SetModel {
        model: Some("opus".into()),
    });
    let line: Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
    assert_eq!(line["request"], json!({"subtype": "set_model", "model": "opus"}));

    let (_, frame) = handler.request(ControlRequest::RewindFiles {
        user_message_id: "msg_1".into(),
    });
    let line: Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
    assert_eq!(
        line["request"],
        json!({"subtype": "rewind_files", "user_message_id": "msg_1"})
    );
}

#[test]
fn test_decode_success_response_renames_to_internal() {
    let line = json!({
        "type": "control_response",
        "response": {
            "subtype": "success",
            "request_id": "req_1",
            "response": {"hookSpecificOutput": {"hookEventName": "PreToolUse"}, "continue": true}
        }
    });
    let frame = decode(&line.to_string()).unwrap();
    assert_eq!(
        frame,
        ControlFrame::ControlResponse {
            request_id: RequestId::new("req_1"),
            outcome: ControlOutcome::success(json!({
                "hook_specific_output": {"hook_event_name": "PreToolUse"},
                "continue_": true
            })),
        }
    );
}

#[test]
fn test_result_keyed_success_keeps_its_key() {
    let line = r#"{"type":"control_response","response":{"subtype":"success","request_id":"r1","result":{"model":"opus"}}}"#;
    let frame = decode(line).unwrap();
    assert_eq!(
        frame,
        ControlFrame::ControlResponse {
            request_id: RequestId::new("r1"),
            outcome: ControlOutcome::Success {
                payload: json!({"model": "opus"}),
                key: PayloadKey::Result,
            },
        }
    );
    let encoded: Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
    assert_eq!(encoded["response"]["result"], json!({"model": "opus"}));
    assert!(encoded["response"].get("response").is_none());
}

#[test]
fn test_stream_envelope_keeps_unknown_fields() {
    let line = r#"{"type":"stream_event","event":{"type":"message_stop"},"ttft_ms":120}"#;
    let ControlFrame::StreamEvent(envelope) = decode(line).unwrap() else {
        panic!("expected a stream event");
    };
    assert_eq!(envelope.parent_tool_use_id, None);
    assert_eq!(envelope.extra.get("ttft_ms"), Some(&json!(120)));
    assert!(!envelope.extra.contains_key("type"));

    let with_parent = r#"{"type":"stream_event","event":{},"parent_tool_use_id":null}"#;
    let ControlFrame::StreamEvent(envelope) = decode(with_parent).unwrap() else {
        panic!("expected a stream event");
    };
    assert_eq!(envelope.parent_tool_use_id, Some(None));
}

#[test]
fn test_decode_error_response() {
    let line = r#"{"type":"control_response","response":{"subtype":"error","request_id":"req_9","error":"no such model"}}"#;
    match decode(line).unwrap() {
        ControlFrame::ControlResponse {
            request_id,
            outcome: ControlOutcome::Error(message),
        } => {
            assert_eq!(request_id.as_str(), "req_9");
            assert_eq!(message, "no such model");
        }
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[test]
fn test_permission_response_uses_wire_casing() {
    let result = PermissionResult::Allow(PermissionResultAllow {
        updated_input: Some(json!({"command": "ls -la", "updated_input": "kept"})),
        updated_permissions: Some(vec![PermissionUpdate::AddRules {
            rules: Some(vec![PermissionRuleValue {
                tool_name: "Bash".into(),
                rule_content: Some("ls".into()),
            }]),
            behavior: None,
            destination: None,
        }]),
    });
    let frame = ProtocolHandler::create_permission_response(
        RequestId::new("req_2"),
        &result,
        &json!({"command": "ls"}),
    )
    .unwrap();
    let line: Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
    let payload = &line["response"]["response"];

    assert_eq!(line["response"]["subtype"], "success");
    assert_eq!(payload["behavior"], "allow");
    // Tool input is opaque: its own keys keep their spelling
    assert_eq!(payload["updatedInput"], json!({"command": "ls -la", "updated_input": "kept"}));
    assert_eq!(
        payload["updatedPermissions"][0]["rules"][0],
        json!({"toolName": "Bash", "ruleContent": "ls"})
    );
    assert!(payload.get("updated_input").is_none());
}

#[test]
fn test_permission_allow_echoes_original_input() {
    let frame = ProtocolHandler::create_permission_response(
        RequestId::new("req_3"),
        &PermissionResult::allow(),
        &json!({"file_path": "/tmp/a"}),
    )
    .unwrap();
    let line: Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
    assert_eq!(line["response"]["response"]["updatedInput"], json!({"file_path": "/tmp/a"}));
}

#[test]
fn test_permission_deny_shape() {
    let frame = ProtocolHandler::create_permission_response(
        RequestId::new("req_4"),
        &PermissionResult::deny_and_interrupt("not allowed"),
        &json!({}),
    )
    .unwrap();
    let line: Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
    let payload = &line["response"]["response"];
    assert_eq!(payload["behavior"], "deny");
    assert_eq!(payload["message"], "not allowed");
    assert_eq!(payload["interrupt"], true);
    assert!(payload.get("updatedInput").is_none());
}

#[test]
fn test_hook_response_uses_wire_casing() {
    let output = HookOutput::deny("dangerous command").with_system_message("blocked");
    let frame = ProtocolHandler::create_hook_response(RequestId::new("req_5"), &output).unwrap();
    let line: Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
    let payload = &line["response"]["response"];

    assert_eq!(payload["systemMessage"], "blocked");
    assert_eq!(payload["hookSpecificOutput"]["hookEventName"], "PreToolUse");
    assert_eq!(payload["hookSpecificOutput"]["permissionDecision"], "deny");
    assert_eq!(
        payload["hookSpecificOutput"]["permissionDecisionReason"],
        "dangerous command"
    );

    let stop = HookOutput::stop("done");
    let frame = ProtocolHandler::create_hook_response(RequestId::new("req_6"), &stop).unwrap();
    let line: Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
    assert_eq!(line["response"]["response"], json!({"continue": false, "stopReason": "done"}));
}

#[test]
fn test_neutral_hook_response_is_empty_object() {
    let frame =
        ProtocolHandler::create_hook_response(RequestId::new("req_7"), &HookOutput::default()).unwrap();
    let line: Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
    assert_eq!(line["response"]["response"], json!({}));
}

#[test]
fn test_casing_is_a_bijection_on_known_fields() {
    let single = |key: &str| {
        let mut map = serde_json::Map::new();
        map.insert(key.to_string(), json!(1));
        Value::Object(map)
    };
    for (internal, wire) in casing::FIELD_RENAMES {
        let value = single(internal);
        let renamed = casing::to_wire(value.clone());
        assert_eq!(renamed, single(wire), "to_wire {internal}");
        assert_eq!(casing::from_wire(renamed), value, "from_wire {wire}");
    }
}

#[test]
fn test_rule_renames_only_inside_rules() {
    let value = json!({
        "tool_name": "Bash",
        "rules": [{"tool_name": "Bash", "rule_content": "ls"}]
    });
    assert_eq!(
        casing::to_wire(value),
        json!({
            "tool_name": "Bash",
            "rules": [{"toolName": "Bash", "ruleContent": "ls"}]
        })
    );
}

#[test]
fn test_opaque_values_are_not_rewritten() {
    let value = json!({
        "input": {"systemMessage": "user data"},
        "mcp_response": {"stopReason": "x"}
    });
    assert_eq!(casing::from_wire(value.clone()), value);
}

#[test]
fn test_roundtrip_every_frame_kind() {
    let frames = [
        json!({
            "type": "control_request",
            "request_id": "cli_1",
            "request": {
                "subtype": "can_use_tool",
                "tool_name": "Bash",
                "input": {"command": "ls"},
                "permission_suggestions": [{
                    "type": "addRules",
                    "rules": [{"toolName": "Bash", "ruleContent": "ls"}],
                    "behavior": "allow",
                    "destination": "session"
                }]
            }
        }),
        json!({
            "type": "control_request",
            "request_id": "cli_2",
            "request": {
                "subtype": "hook_callback",
                "callback_id": "hook_0",
                "input": {"tool_name": "Bash"},
                "tool_use_id": "toolu_1"
            }
        }),
        json!({
            "type": "control_request",
            "request_id": "cli_3",
            "request": {
                "subtype": "mcp_message",
                "server_name": "calc",
                "message": {"jsonrpc": "2.0", "id": 1, "method": "tools/list"}
            }
        }),
        json!({
            "type": "control_response",
            "response": {
                "subtype": "success",
                "request_id": "req_1",
                "response": {"behavior": "allow", "updatedInput": {"command": "ls"}}
            }
        }),
        json!({
            "type": "control_response",
            "response": {"subtype": "error", "request_id": "req_2", "error": "boom"}
        }),
        json!({
            "type": "assistant",
            "message": {"model": "claude", "content": [{"type": "text", "text": "hi"}]},
            "session_id": "s1"
        }),
        json!({
            "type": "stream_event",
            "uuid": "u1",
            "session_id": "s1",
            "event": {"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "hi"}},
            "parent_tool_use_id": null
        }),
        json!({
            "type": "control_response",
            "response": {"subtype": "success", "request_id": "r1", "result": {"model": "opus"}}
        }),
        json!({
            "type": "stream_event",
            "uuid": "u2",
            "event": {"type": "message_stop"},
            "ttft_ms": 120
        }),
    ];
    for frame in &frames {
        assert_eq!(&roundtrip(frame), frame);
    }
}

#[test]
fn test_decode_inbound_requests() {
    let line = json!({
        "type": "control_request",
        "request_id": "cli_1",
        "request": {"subtype": "hook_callback", "callback_id": "hook_3", "input": {"a": 1}}
    });
    match decode(&line.to_string()).unwrap() {
        ControlFrame::ControlRequest { request_id, request } => {
            assert_eq!(request_id.as_str(), "cli_1");
            assert_eq!(
                request,
                ControlRequest::HookCallback {
                    callback_id: "hook_3".into(),
                    input: json!({"a": 1}),
                    tool_use_id: None,
                }
            );
        }
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[test]
fn test_unknown_subtype_is_unsupported() {
    let line = r#"{"type":"control_request","request_id":"cli_4","request":{"subtype":"teleport","where":"mars"}}"#;
    match decode(line).unwrap() {
        ControlFrame::ControlRequest {
            request: ControlRequest::Unsupported { subtype, payload, .. },
            ..
        } => {
            assert_eq!(subtype, "teleport");
            assert_eq!(payload["where"], "mars");
        }
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[test]
fn test_malformed_lines_are_errors() {
    assert!(matches!(decode("{not json"), Err(ClaudeError::JsonDecode(_))));
    assert!(matches!(
        decode(r#"{"no_type": true}"#),
        Err(ClaudeError::MessageParse { .. })
    ));
    assert!(matches!(
        decode(r#"{"type":"control_request","request":{"subtype":"interrupt"}}"#),
        Err(ClaudeError::MessageParse { .. })
    ));
    assert!(matches!(
        decode(r#"{"type":"control_response","response":{"subtype":"success"}}"#),
        Err(ClaudeError::MessageParse { .. })
    ));
}

#[test]
fn test_initialize_request_carries_hooks() {
    let handler = ProtocolHandler::new();
    let hooks = json!({"PreToolUse": [{"matcher": "Bash", "hookCallbackIds": ["hook_0"]}]});
    let (_, frame) = handler.request(ControlRequest::Initialize {
        hooks: Some(hooks.clone()),
        agents: None,
    });
    let line: Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
    assert_eq!(line["request"]["subtype"], "initialize");
    assert_eq!(line["request"]["hooks"], hooks);
    assert!(line["request"].get("agents").is_none());
}

#[test]
fn test_user_message_framing() {
    let line = ProtocolHandler::user_message(&json!("Hello"), Some(&SessionId::new("s9"))).unwrap();
    let value: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(
        value,
        json!({
            "type": "user",
            "message": {"role": "user", "content": "Hello"},
            "parent_tool_use_id": null,
            "session_id": "s9"
        })
    );

    let line = ProtocolHandler::user_message(&json!("Hi"), None).unwrap();
    let value: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["session_id"], "default");
}

#[test]
fn test_hook_event_names() {
    for event in HookEvent::ALL {
        assert_eq!(HookEvent::parse(event.as_str()), Some(event));
    }
    assert_eq!(HookEvent::parse("pre_tool_use"), Some(HookEvent::PreToolUse));
    assert_eq!(HookEvent::parse("nope"), None);
}
