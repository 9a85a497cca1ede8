//! Unit tests for `PermissionManager`
//!
//! Permission decisions fail closed

use std::time::Duration;

use kodegen_claude_control::{
    ClaudeError, PermissionManager, PermissionResult, PermissionResultDeny, SessionId, ToolName,
    ToolPermissionContext,
};
use serde_json::json;

fn context(tool: &str) -> ToolPermissionContext {
    ToolPermissionContext {
        tool_name: ToolName::new(tool),
        tool_input: json!({"command": "ls"}),
        session_id: Some(SessionId::new("s1")),
        suggestions: Vec::new(),
        blocked_path: None,
    }
}

fn is_deny(result: &PermissionResult) -> bool {
    matches!(result, PermissionResult::Deny(_))
}

fn explode() -> kodegen_claude_control::Result<PermissionResult> {
    panic!("callback bug")
}

#[tokio::test]
async fn test_callback_decides() {
    let callback = PermissionManager::callback(|context| async move {
        match context.tool_name.as_str() {
            "Read" => Ok(PermissionResult::allow()),
            _ => Ok(PermissionResult::deny("write tools are disabled")),
        }
    });
    let manager = PermissionManager::new(Some(callback), Duration::from_secs(60));
    assert!(manager.is_configured());

    assert_eq!(manager.decide(context("Read")).await.unwrap(), PermissionResult::allow());
    assert_eq!(
        manager.decide(context("Write")).await.unwrap(),
        PermissionResult::Deny(PermissionResultDeny {
            message: "write tools are disabled".into(),
            interrupt: false,
        })
    );
}

#[tokio::test]
async fn test_callback_sees_request_details() {
    let callback = PermissionManager::callback(|context| async move {
        assert_eq!(context.tool_input, json!({"command": "ls"}));
        assert_eq!(context.session_id, Some(SessionId::new("s1")));
        Ok(PermissionResult::allow_with_input(json!({"command": "ls -la"})))
    });
    let manager = PermissionManager::new(Some(callback), Duration::from_secs(60));
    let result = manager.decide(context("Bash")).await.unwrap();
    assert_eq!(result, PermissionResult::allow_with_input(json!({"command": "ls -la"})));
}

#[tokio::test]
async fn test_no_callback_is_an_error() {
    let manager = PermissionManager::new(None, Duration::from_secs(60));
    assert!(!manager.is_configured());
    let err = manager.decide(context("Bash")).await.unwrap_err();
    assert!(matches!(err, ClaudeError::ControlProtocol(_)));
}

#[tokio::test]
async fn test_failure_denies() {
    let callback =
        PermissionManager::callback(|_| async { Err(ClaudeError::invalid_config("bad state")) });
    let manager = PermissionManager::new(Some(callback), Duration::from_secs(60));
    assert!(is_deny(&manager.decide(context("Bash")).await.unwrap()));
}

#[tokio::test]
async fn test_panic_denies() {
    let callback = PermissionManager::callback(|_| async { explode() });
    let manager = PermissionManager::new(Some(callback), Duration::from_secs(60));
    assert!(is_deny(&manager.decide(context("Bash")).await.unwrap()));
}

#[tokio::test(start_paused = true)]
async fn test_hang_denies_after_budget() {
    let callback = PermissionManager::callback(|_| async {
        std::future::pending::<()>().await;
        Ok(PermissionResult::allow())
    });
    let manager = PermissionManager::new(Some(callback), Duration::from_millis(500));

    let started = tokio::time::Instant::now();
    let result = manager.decide(context("Bash")).await.unwrap();
    assert!(is_deny(&result));
    assert!(started.elapsed() >= Duration::from_millis(500));
}
