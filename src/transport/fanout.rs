//! Delivery of inbound transport events to every subscriber

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::TransportEvent;

#[derive(Default)]
struct FanoutState {
    subscribers: Vec<mpsc::UnboundedSender<TransportEvent>>,
    // Events published before the first subscriber arrived
    backlog: Vec<TransportEvent>,
    subscribed: bool,
    closed: bool,
}

/// Broadcast point shared between a transport and its read loop
#[derive(Default)]
pub(crate) struct Fanout {
    state: Mutex<FanoutState>,
}

impl Fanout {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber, replaying the backlog to the first one
    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<TransportEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        state.subscribed = true;
        for event in state.backlog.drain(..) {
            let _ = tx.send(event);
        }
        if !state.closed {
            state.subscribers.push(tx);
        }
        rx
    }

    /// Deliver `event` to all live subscribers
    pub(crate) fn publish(&self, event: TransportEvent) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        if !state.subscribed {
            state.backlog.push(event);
            return;
        }
        state
            .subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    /// Deliver a final event, then end every subscription
    pub(crate) fn finish(&self, event: TransportEvent) {
        self.publish(event);
        self.close();
    }

    /// End every subscription; later publishes are dropped
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.subscribers.clear();
    }
}
