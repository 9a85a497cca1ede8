//! Tests for the in-memory transport

use std::time::Duration;

use kodegen_claude_control::{MemoryTransport, Transport, TransportEvent, TransportStatus};
use serde_json::json;

#[tokio::test]
async fn test_write_reaches_observer() {
    let (mut transport, mut handle) = MemoryTransport::new();
    assert_eq!(transport.status(), TransportStatus::Disconnected);
    transport.connect().await.unwrap();
    assert!(transport.is_ready());

    transport.write(r#"{"type":"user"}"#).await.unwrap();
    transport.write("second\n").await.unwrap();
    assert_eq!(handle.next_written_json().await.unwrap(), json!({"type": "user"}));
    assert_eq!(handle.next_written().await.unwrap(), "second");
    assert!(handle.try_written().is_none());
}

#[tokio::test]
async fn test_write_before_connect_fails() {
    let (mut transport, _handle) = MemoryTransport::new();
    assert!(transport.write("x").await.is_err());
}

#[tokio::test]
async fn test_lines_reach_every_subscriber() {
    let (mut transport, handle) = MemoryTransport::new();
    transport.connect().await.unwrap();
    let mut first = transport.subscribe();
    let mut second = transport.subscribe();

    handle.push_line("hello");
    assert_eq!(first.recv().await, Some(TransportEvent::Line("hello".into())));
    assert_eq!(second.recv().await, Some(TransportEvent::Line("hello".into())));
}

#[tokio::test]
async fn test_backlog_replayed_to_first_subscriber() {
    let (mut transport, handle) = MemoryTransport::new();
    transport.connect().await.unwrap();
    handle.push_line("early");
    let mut events = transport.subscribe();
    assert_eq!(tokio_test::assert_ok!(events.try_recv()), TransportEvent::Line("early".into()));
}

#[tokio::test]
async fn test_lines_after_last_subscriber_leaves_are_dropped() {
    let (mut transport, handle) = MemoryTransport::new();
    transport.connect().await.unwrap();
    let first = transport.subscribe();
    drop(first);

    for n in 0..100 {
        handle.push_line(format!("orphan {n}"));
    }
    let mut late = transport.subscribe();
    assert!(late.try_recv().is_err());

    handle.push_line("fresh");
    assert_eq!(late.recv().await, Some(TransportEvent::Line("fresh".into())));
}

#[tokio::test]
async fn test_remote_exit_ends_subscriptions() {
    let (mut transport, handle) = MemoryTransport::new();
    transport.connect().await.unwrap();
    let mut events = transport.subscribe();

    handle.close_remote(Some(2));
    assert_eq!(events.recv().await, Some(TransportEvent::Exited(Some(2))));
    assert_eq!(events.recv().await, None);
    assert_eq!(transport.status(), TransportStatus::Error);
}

#[tokio::test]
async fn test_end_input_refuses_later_writes() {
    let (mut transport, handle) = MemoryTransport::new();
    transport.connect().await.unwrap();
    transport.end_input().await.unwrap();
    assert!(handle.input_ended());
    assert!(transport.write("late").await.is_err());
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (mut transport, handle) = MemoryTransport::new();
    transport.connect().await.unwrap();
    let mut events = transport.subscribe();

    for _ in 0..3 {
        transport.close().await.unwrap();
    }
    assert_eq!(handle.release_count(), 1);
    assert_eq!(handle.status(), TransportStatus::Disconnected);
    assert_eq!(events.recv().await, None);

    // A closed transport does not come back
    transport.connect().await.unwrap();
    assert!(!transport.is_ready());
}

#[tokio::test(start_paused = true)]
async fn test_latency_delays_writes() {
    let (transport, mut handle) = MemoryTransport::new();
    let mut transport = transport.with_latency(Duration::from_millis(200));
    transport.connect().await.unwrap();

    let started = tokio::time::Instant::now();
    transport.write("slow").await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(handle.next_written().await.unwrap(), "slow");
}
