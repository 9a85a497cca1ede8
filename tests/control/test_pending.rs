//! Tests for pending request correlation

use std::time::Duration;

use kodegen_claude_control::control::PendingRequests;
use kodegen_claude_control::{ClaudeError, RequestId};
use serde_json::json;
use tokio::sync::oneshot;

#[tokio::test]
async fn test_resolve_exactly_once() {
    let mut pending = PendingRequests::new();
    let (tx, rx) = oneshot::channel();
    let id = RequestId::new("req_1");
    pending.insert(id.clone(), "set_model", Duration::from_secs(60), tx).unwrap();
    assert_eq!(pending.len(), 1);

    assert!(pending.resolve(&id, Ok(json!({"model": "opus"}))));
    assert!(!pending.resolve(&id, Ok(json!({"model": "other"}))));
    assert!(pending.is_empty());
    assert_eq!(rx.await.unwrap().unwrap(), json!({"model": "opus"}));
}

#[tokio::test]
async fn test_responses_reach_their_own_waiters() {
    let mut pending = PendingRequests::new();
    let (tx_a, rx_a) = oneshot::channel();
    let (tx_b, rx_b) = oneshot::channel();
    pending.insert(RequestId::new("a"), "interrupt", Duration::from_secs(60), tx_a).unwrap();
    pending.insert(RequestId::new("b"), "interrupt", Duration::from_secs(60), tx_b).unwrap();

    pending.resolve(&RequestId::new("b"), Ok(json!("b")));
    pending.resolve(&RequestId::new("a"), Ok(json!("a")));
    assert_eq!(rx_a.await.unwrap().unwrap(), json!("a"));
    assert_eq!(rx_b.await.unwrap().unwrap(), json!("b"));
}

#[tokio::test]
async fn test_duplicate_id_rejected() {
    let mut pending = PendingRequests::new();
    let (tx, _rx) = oneshot::channel();
    let (dup, dup_rx) = oneshot::channel();
    pending.insert(RequestId::new("x"), "interrupt", Duration::from_secs(1), tx).unwrap();
    let err = pending
        .insert(RequestId::new("x"), "interrupt", Duration::from_secs(1), dup)
        .unwrap_err();
    assert!(matches!(err, ClaudeError::ControlProtocol(_)));
    assert!(dup_rx.await.is_err());
    assert_eq!(pending.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_expiry() {
    let mut pending = PendingRequests::new();
    let (tx, rx) = oneshot::channel();
    let id = RequestId::new("slow");
    pending.insert(id.clone(), "set_model", Duration::from_millis(250), tx).unwrap();

    let started = tokio::time::Instant::now();
    assert_eq!(pending.expire_next().await, Some(id.clone()));
    assert!(started.elapsed() >= Duration::from_millis(250));

    assert!(matches!(rx.await.unwrap(), Err(ClaudeError::Timeout(_))));
    assert!(!pending.resolve(&id, Ok(json!(null))));
    assert!(pending.expire_next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_resolved_request_never_times_out() {
    let mut pending = PendingRequests::new();
    let (fast_tx, fast_rx) = oneshot::channel();
    let (slow_tx, slow_rx) = oneshot::channel();
    pending.insert(RequestId::new("fast"), "interrupt", Duration::from_millis(10), fast_tx).unwrap();
    pending.insert(RequestId::new("slow"), "interrupt", Duration::from_millis(20), slow_tx).unwrap();

    pending.resolve(&RequestId::new("fast"), Ok(json!("done")));
    assert_eq!(pending.expire_next().await, Some(RequestId::new("slow")));
    assert_eq!(fast_rx.await.unwrap().unwrap(), json!("done"));
    assert!(matches!(slow_rx.await.unwrap(), Err(ClaudeError::Timeout(_))));
}

#[tokio::test]
async fn test_cancel_all() {
    let mut pending = PendingRequests::new();
    let mut receivers = Vec::new();
    for n in 0..3 {
        let (tx, rx) = oneshot::channel();
        pending
            .insert(RequestId::new(format!("r{n}")), "interrupt", Duration::from_secs(60), tx)
            .unwrap();
        receivers.push(rx);
    }
    assert_eq!(pending.cancel_all(), 3);
    assert!(pending.is_empty());
    for rx in receivers {
        assert!(matches!(rx.await.unwrap(), Err(ClaudeError::Cancelled(_))));
    }
    assert_eq!(pending.cancel_all(), 0);
}
