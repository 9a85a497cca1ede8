//! Unit tests for `HookManager`
//!
//! Tests registration ids, matcher semantics, and supervised dispatch

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kodegen_claude_control::hooks::{HookManager, HookMatcherBuilder, ToolMatcher};
use kodegen_claude_control::{ClaudeError, HookEvent, HookMatcher, HookOutput, SessionId};
use serde_json::json;

fn neutral_hook() -> kodegen_claude_control::HookCallback {
    HookManager::callback(|_input, _tool_use_id, _context| async { Ok(HookOutput::default()) })
}

fn explode() -> kodegen_claude_control::Result<HookOutput> {
    panic!("hook panicked")
}

#[test]
fn test_ids_follow_registration_order() {
    let mut manager = HookManager::new(Duration::from_secs(60));
    let first = manager.register(
        HookEvent::PreToolUse,
        HookMatcherBuilder::new(Some("Bash"))
            .add_hook(neutral_hook())
            .add_hook(neutral_hook())
            .build(),
    );
    let second = manager.register(
        HookEvent::PostToolUse,
        HookMatcherBuilder::new(None::<String>).add_hook(neutral_hook()).build(),
    );
    assert_eq!(first, vec!["hook_0", "hook_1"]);
    assert_eq!(second, vec!["hook_2"]);
    assert_eq!(manager.len(), 3);
    assert_eq!(manager.get("hook_1").unwrap().event, HookEvent::PreToolUse);
}

#[test]
fn test_initialize_payload() {
    let mut manager = HookManager::new(Duration::from_secs(60));
    assert!(manager.initialize_payload().is_none());

    manager.register(
        HookEvent::PreToolUse,
        HookMatcherBuilder::new(Some("Bash")).add_hook(neutral_hook()).build(),
    );
    manager.register(
        HookEvent::Stop,
        HookMatcherBuilder::new(None::<String>)
            .add_hook(neutral_hook())
            .timeout(Duration::from_secs(5))
            .build(),
    );
    assert_eq!(
        manager.initialize_payload().unwrap(),
        json!({
            "PreToolUse": [{"matcher": "Bash", "hookCallbackIds": ["hook_0"]}],
            "Stop": [{"matcher": null, "hookCallbackIds": ["hook_1"], "timeout": 5.0}]
        })
    );
}

#[test]
fn test_from_config_is_deterministic() {
    let mut hooks: HashMap<HookEvent, Vec<HookMatcher>> = HashMap::new();
    hooks.insert(
        HookEvent::PostToolUse,
        vec![HookMatcherBuilder::new(Some("*")).add_hook(neutral_hook()).build()],
    );
    hooks.insert(
        HookEvent::PreToolUse,
        vec![HookMatcherBuilder::new(Some("Write|Edit")).add_hook(neutral_hook()).build()],
    );

    for _ in 0..5 {
        let manager = HookManager::from_config(Some(&hooks), Duration::from_secs(60));
        assert_eq!(manager.get("hook_0").unwrap().event, HookEvent::PreToolUse);
        assert_eq!(manager.get("hook_1").unwrap().event, HookEvent::PostToolUse);
    }
    assert!(HookManager::from_config(None, Duration::from_secs(1)).is_empty());
}

#[test]
fn test_matcher_semantics() {
    assert!(ToolMatcher::parse(Some("*")).matches(Some("any_tool")));
    assert!(!ToolMatcher::parse(Some("*")).matches(None));
    assert!(ToolMatcher::parse(None).matches(Some("any_tool")));
    assert!(ToolMatcher::parse(Some("")).matches(None));
    assert!(ToolMatcher::parse(Some("Bash")).matches(Some("Bash")));
    assert!(!ToolMatcher::parse(Some("Bash")).matches(Some("Read")));
    assert!(ToolMatcher::parse(Some("Write | Edit")).matches(Some("Edit")));
    assert_eq!(ToolMatcher::parse(Some("*")).pattern(), Some("*"));
    assert_eq!(ToolMatcher::parse(None).pattern(), None);
}

#[tokio::test]
async fn test_invoke_runs_callback_with_context() {
    let mut manager = HookManager::new(Duration::from_secs(60));
    let hook = HookManager::callback(|input, tool_use_id, context| async move {
        assert_eq!(tool_use_id.as_deref(), Some("toolu_1"));
        assert_eq!(context.session_id, Some(SessionId::new("s1")));
        if input["tool_input"]["command"] == "rm -rf /" {
            return Ok(HookOutput::deny("dangerous"));
        }
        Ok(HookOutput::allow())
    });
    manager.register(
        HookEvent::PreToolUse,
        HookMatcherBuilder::new(Some("Bash")).add_hook(hook).build(),
    );

    let output = manager
        .invoke_by_id(
            "hook_0",
            json!({"tool_name": "Bash", "tool_input": {"command": "rm -rf /"}}),
            Some("toolu_1".into()),
            Some(SessionId::new("s1")),
        )
        .await
        .unwrap();
    assert_eq!(output, HookOutput::deny("dangerous"));
}

#[tokio::test]
async fn test_non_matching_tool_skips_callback() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let hook = HookManager::callback(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(HookOutput::deny("never")) }
    });
    let mut manager = HookManager::new(Duration::from_secs(60));
    manager.register(
        HookEvent::PreToolUse,
        HookMatcherBuilder::new(Some("Bash")).add_hook(hook).build(),
    );

    let output = manager
        .invoke_by_id("hook_0", json!({"tool_name": "Read"}), None, None)
        .await
        .unwrap();
    assert!(output.is_neutral());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wildcard_fires_on_tool_less_event() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let hook = HookManager::callback(move |input, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        assert_eq!(input["hook_event_name"], "Stop");
        async { Ok(HookOutput::allow()) }
    });
    let mut manager = HookManager::new(Duration::from_secs(60));
    manager.register(
        HookEvent::Stop,
        HookMatcherBuilder::new(Some("*")).add_hook(hook).build(),
    );

    let output = manager
        .invoke_by_id("hook_0", json!({"hook_event_name": "Stop"}), None, None)
        .await
        .unwrap();
    assert_eq!(output, HookOutput::allow());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_id_is_an_error() {
    let manager = HookManager::default();
    let err = manager
        .invoke_by_id("hook_42", json!({}), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClaudeError::Hook(_)));
}

#[tokio::test]
async fn test_failing_hook_yields_neutral_output() {
    let failing = HookManager::callback(|_, _, _| async { Err(ClaudeError::hook("boom")) });
    let panicking = HookManager::callback(|_, _, _| async { explode() });
    let mut manager = HookManager::new(Duration::from_secs(60));
    manager.register(
        HookEvent::PostToolUse,
        HookMatcherBuilder::new(None::<String>)
            .add_hook(failing)
            .add_hook(panicking)
            .build(),
    );

    for id in ["hook_0", "hook_1"] {
        let output = manager.invoke_by_id(id, json!({}), None, None).await.unwrap();
        assert!(output.is_neutral(), "{id}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_hanging_hook_times_out() {
    let hanging = HookManager::callback(|_, _, context| async move {
        context.cancellation.cancelled().await;
        Ok(HookOutput::deny("too late"))
    });
    let mut manager = HookManager::new(Duration::from_secs(60));
    manager.register(
        HookEvent::PreToolUse,
        HookMatcherBuilder::new(Some("*"))
            .add_hook(hanging)
            .timeout(Duration::from_millis(100))
            .build(),
    );

    let started = tokio::time::Instant::now();
    let output = manager
        .invoke_by_id("hook_0", json!({"tool_name": "Bash"}), None, None)
        .await
        .unwrap();
    assert!(output.is_neutral());
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(started.elapsed() < Duration::from_secs(60));
}
