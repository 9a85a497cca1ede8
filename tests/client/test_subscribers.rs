//! Tests for the single-active subscriber table

use kodegen_claude_control::client::subscribers::{Dispatch, EventSink, Promotion, SubscriberTable};
use kodegen_claude_control::{ClaudeError, SessionEvent, SubscriberId};
use serde_json::json;
use tokio::sync::mpsc;

type Events = mpsc::UnboundedReceiver<kodegen_claude_control::Result<SessionEvent>>;

fn channel() -> (EventSink, Events) {
    mpsc::unbounded_channel()
}

fn raw(n: u64) -> kodegen_claude_control::Result<SessionEvent> {
    Ok(SessionEvent::Raw(json!({"n": n})))
}

#[test]
fn test_first_subscriber_is_active() {
    let mut table = SubscriberTable::new();
    assert!(table.is_empty());
    let (a, b) = (SubscriberId::new(), SubscriberId::new());

    assert!(table.subscribe(a, channel().0));
    assert!(!table.subscribe(b, channel().0));
    assert_eq!(table.active_id(), Some(a));
    assert_eq!(table.queued().collect::<Vec<_>>(), vec![b]);
    assert!(!table.is_empty());
}

#[test]
fn test_send_routes_by_position() {
    let mut table = SubscriberTable::new();
    let (a, b) = (SubscriberId::new(), SubscriberId::new());
    table.subscribe(a, channel().0);
    table.subscribe(b, channel().0);

    assert_eq!(table.send(a, "one".into()).unwrap(), Dispatch::Write("one".into()));
    assert_eq!(table.send(b, "two".into()).unwrap(), Dispatch::Held);
}

#[test]
fn test_send_from_unknown_subscriber() {
    let mut table = SubscriberTable::new();
    let err = table.send(SubscriberId::new(), "line".into()).unwrap_err();
    assert!(matches!(err, ClaudeError::ControlProtocol(_)));
}

#[test]
fn test_held_line_is_replaced_and_flushed_on_promotion() {
    let mut table = SubscriberTable::new();
    let (a, b) = (SubscriberId::new(), SubscriberId::new());
    table.subscribe(a, channel().0);
    table.subscribe(b, channel().0);
    table.send(b, "draft".into()).unwrap();
    table.send(b, "final".into()).unwrap();

    assert_eq!(
        table.retire_active(),
        Some(Promotion {
            id: b,
            flush: Some("final".into()),
        })
    );
    assert_eq!(table.active_id(), Some(b));
    assert_eq!(table.send(b, "next".into()).unwrap(), Dispatch::Write("next".into()));
}

#[test]
fn test_retire_without_queue() {
    let mut table = SubscriberTable::new();
    assert_eq!(table.retire_active(), None);

    let a = SubscriberId::new();
    table.subscribe(a, channel().0);
    assert_eq!(table.retire_active(), None);
    assert!(table.is_empty());
}

#[test]
fn test_promotion_follows_fifo_order() {
    let mut table = SubscriberTable::new();
    let ids: Vec<_> = (0..4).map(|_| SubscriberId::new()).collect();
    for id in &ids {
        table.subscribe(*id, channel().0);
    }
    for expected in &ids[1..] {
        let promotion = table.retire_active().unwrap();
        assert_eq!(promotion.id, *expected);
        assert_eq!(promotion.flush, None);
    }
    assert_eq!(table.retire_active(), None);
}

#[test]
fn test_unsubscribe_active_promotes_next() {
    let mut table = SubscriberTable::new();
    let (a, b, c) = (SubscriberId::new(), SubscriberId::new(), SubscriberId::new());
    table.subscribe(a, channel().0);
    table.subscribe(b, channel().0);
    table.subscribe(c, channel().0);
    table.send(c, "waiting".into()).unwrap();

    // Leaving the queue promotes nobody
    assert_eq!(table.unsubscribe(b), None);
    assert_eq!(table.queued().collect::<Vec<_>>(), vec![c]);

    assert_eq!(
        table.unsubscribe(a),
        Some(Promotion {
            id: c,
            flush: Some("waiting".into()),
        })
    );
    assert_eq!(table.active_id(), Some(c));
}

#[test]
fn test_deliver_reaches_only_the_active_subscriber() {
    let mut table = SubscriberTable::new();
    assert!(!table.deliver(raw(0)));

    let (a, b) = (SubscriberId::new(), SubscriberId::new());
    let (sink_a, mut events_a) = channel();
    let (sink_b, mut events_b) = channel();
    table.subscribe(a, sink_a);
    table.subscribe(b, sink_b);

    assert!(table.deliver(raw(1)));
    assert_eq!(events_a.try_recv().unwrap().unwrap(), SessionEvent::Raw(json!({"n": 1})));
    assert!(events_b.try_recv().is_err());

    table.retire_active();
    // The retired subscriber's channel is closed
    assert!(events_a.try_recv().is_err());
    assert!(table.deliver(raw(2)));
    assert_eq!(events_b.try_recv().unwrap().unwrap(), SessionEvent::Raw(json!({"n": 2})));
}

#[test]
fn test_deliver_to_dropped_receiver() {
    let mut table = SubscriberTable::new();
    let (sink, events) = channel();
    table.subscribe(SubscriberId::new(), sink);
    drop(events);
    assert!(!table.deliver(raw(1)));
}

#[test]
fn test_fail_all_reaches_everyone() {
    let mut table = SubscriberTable::new();
    let mut receivers = Vec::new();
    for _ in 0..3 {
        let (sink, events) = channel();
        table.subscribe(SubscriberId::new(), sink);
        receivers.push(events);
    }

    table.fail_all(|| ClaudeError::transport("CLI exited"));
    assert!(table.is_empty());
    for mut events in receivers {
        assert!(matches!(events.try_recv(), Ok(Err(ClaudeError::Transport(_)))));
        assert!(events.try_recv().is_err());
    }
}

#[test]
fn test_clear_drops_without_events() {
    let mut table = SubscriberTable::new();
    let (sink, mut events) = channel();
    table.subscribe(SubscriberId::new(), sink);
    table.clear();
    assert!(table.is_empty());
    assert!(matches!(
        events.try_recv(),
        Err(mpsc::error::TryRecvError::Disconnected)
    ));
}
