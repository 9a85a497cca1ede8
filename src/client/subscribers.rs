//! Single-active subscriber table
//!
//! One subscriber is active and receives everything the CLI streams; the
//! others wait in FIFO order. A queued subscriber's prompt is held until it
//! is promoted, at which point the caller writes it to the transport.

use std::collections::VecDeque;

use tokio::sync::mpsc;

use super::SessionEvent;
use crate::error::{ClaudeError, Result};
use crate::types::identifiers::SubscriberId;

/// Channel feeding one subscriber
pub type EventSink = mpsc::UnboundedSender<Result<SessionEvent>>;

struct Entry {
    id: SubscriberId,
    sink: EventSink,
    held: Option<String>,
}

/// What to do with a line a subscriber sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The sender is active; write the line now
    Write(String),
    /// The sender is queued; the line waits for its promotion
    Held,
}

/// A queued subscriber that just became active
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    /// The new active subscriber
    pub id: SubscriberId,
    /// Its held line, to be written now
    pub flush: Option<String>,
}

/// Active slot plus FIFO queue
#[derive(Default)]
pub struct SubscriberTable {
    active: Option<Entry>,
    queue: VecDeque<Entry>,
}

impl SubscriberTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber; returns `true` when it became active right away
    pub fn subscribe(&mut self, id: SubscriberId, sink: EventSink) -> bool {
        let entry = Entry {
            id,
            sink,
            held: None,
        };
        if self.active.is_none() {
            log::debug!("Subscriber {id} active");
            self.active = Some(entry);
            true
        } else {
            log::debug!("Subscriber {id} queued at position {}", self.queue.len() + 1);
            self.queue.push_back(entry);
            false
        }
    }

    /// Route a line sent by `id`
    ///
    /// A second line from a queued subscriber replaces the one it holds.
    ///
    /// # Errors
    /// Returns `ControlProtocol` if `id` is not subscribed
    pub fn send(&mut self, id: SubscriberId, line: String) -> Result<Dispatch> {
        if self.active_id() == Some(id) {
            return Ok(Dispatch::Write(line));
        }
        let entry = self
            .queue
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| ClaudeError::control_protocol(format!("Subscriber {id} is not subscribed")))?;
        if entry.held.replace(line).is_some() {
            log::warn!("Subscriber {id} sent again while queued; replacing its held message");
        }
        Ok(Dispatch::Held)
    }

    /// Deliver `event` to the active subscriber
    ///
    /// Returns `false` when nobody is active or the active subscriber has
    /// gone away.
    pub fn deliver(&self, event: Result<SessionEvent>) -> bool {
        match self.active {
            Some(ref entry) => entry.sink.send(event).is_ok(),
            None => false,
        }
    }

    /// End the active subscriber's turn and promote the next one
    pub fn retire_active(&mut self) -> Option<Promotion> {
        let retired = self.active.take()?;
        log::debug!("Subscriber {} finished its turn", retired.id);
        self.promote_next()
    }

    /// Remove `id` wherever it is
    ///
    /// Returns the promotion when `id` was the active subscriber.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> Option<Promotion> {
        if self.active_id() == Some(id) {
            self.active = None;
            log::debug!("Active subscriber {id} unsubscribed");
            return self.promote_next();
        }
        self.queue.retain(|entry| entry.id != id);
        None
    }

    fn promote_next(&mut self) -> Option<Promotion> {
        let mut next = self.queue.pop_front()?;
        let promotion = Promotion {
            id: next.id,
            flush: next.held.take(),
        };
        log::debug!("Subscriber {} promoted", next.id);
        self.active = Some(next);
        Some(promotion)
    }

    /// Send `error` to every subscriber and drop them all
    pub fn fail_all(&mut self, error: impl Fn() -> ClaudeError) {
        for entry in self.active.take().into_iter().chain(self.queue.drain(..)) {
            let _ = entry.sink.send(Err(error()));
        }
    }

    /// Drop every subscriber without a final event
    pub fn clear(&mut self) {
        self.active = None;
        self.queue.clear();
    }

    /// Currently active subscriber
    #[must_use]
    pub fn active_id(&self) -> Option<SubscriberId> {
        self.active.as_ref().map(|entry| entry.id)
    }

    /// Queued subscribers, front first
    pub fn queued(&self) -> impl Iterator<Item = SubscriberId> + '_ {
        self.queue.iter().map(|entry| entry.id)
    }

    /// Whether nobody is subscribed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }
}
