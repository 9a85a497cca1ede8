//! Tests for typed message parsing

use kodegen_claude_control::message::{parse_line, parse_message};
use kodegen_claude_control::{ClaudeError, ContentBlock, Message, SessionId, UserContent};
use serde_json::json;

#[test]
fn test_parse_assistant_message() {
    let message = parse_message(json!({
        "type": "assistant",
        "message": {
            "model": "claude-sonnet-4-5",
            "content": [
                {"type": "text", "text": "Hello "},
                {"type": "tool_use", "id": "toolu_1", "name": "Bash", "input": {"command": "ls"}},
                {"type": "text", "text": "world"}
            ]
        },
        "session_id": "s1"
    }))
    .unwrap();

    let Message::Assistant { message, session_id, .. } = &message else {
        panic!("expected assistant message, got {message:?}");
    };
    assert_eq!(message.text(), "Hello world");
    assert_eq!(message.model, "claude-sonnet-4-5");
    assert!(matches!(&message.content[1], ContentBlock::ToolUse { name, .. } if name == "Bash"));
    assert_eq!(session_id.as_ref(), Some(&SessionId::new("s1")));
}

#[test]
fn test_parse_user_message() {
    let message = parse_message(json!({
        "type": "user",
        "message": {"role": "user", "content": "What is 2 + 2?"}
    }))
    .unwrap();
    match message {
        Message::User { message, .. } => {
            assert_eq!(message.content, Some(UserContent::String("What is 2 + 2?".into())));
        }
        other => panic!("expected user message, got {other:?}"),
    }
}

#[test]
fn test_parse_system_message_keeps_data() {
    let message = parse_message(json!({
        "type": "system",
        "subtype": "init",
        "session_id": "s-init",
        "tools": ["Bash", "Read"]
    }))
    .unwrap();
    assert_eq!(message.session_id(), Some(SessionId::new("s-init")));
    match message {
        Message::System { subtype, data } => {
            assert_eq!(subtype, "init");
            assert_eq!(data["tools"], json!(["Bash", "Read"]));
        }
        other => panic!("expected system message, got {other:?}"),
    }
}

#[test]
fn test_parse_result_message() {
    let message = parse_line(
        r#"{"type":"result","subtype":"success","duration_ms":1200,"duration_api_ms":900,"is_error":false,"num_turns":2,"session_id":"s2","total_cost_usd":0.01,"result":"4"}"#,
    )
    .unwrap();
    assert!(message.is_result());
    assert_eq!(message.session_id(), Some(SessionId::new("s2")));
    match message {
        Message::Result { num_turns, result, total_cost_usd, .. } => {
            assert_eq!(num_turns, 2);
            assert_eq!(result.as_deref(), Some("4"));
            assert_eq!(total_cost_usd, Some(0.01));
        }
        other => panic!("expected result message, got {other:?}"),
    }
}

#[test]
fn test_unknown_type_keeps_raw_data() {
    let raw = json!({"type": "telemetry", "value": 3});
    match parse_message(raw.clone()) {
        Err(ClaudeError::MessageParse { data, .. }) => assert_eq!(data, Some(raw)),
        other => panic!("expected MessageParse, got {other:?}"),
    }
}

#[test]
fn test_invalid_json_line() {
    assert!(matches!(parse_line("{oops"), Err(ClaudeError::JsonDecode(_))));
}
