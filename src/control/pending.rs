//! Pending correlated requests and their deadlines
//!
//! Each entry is removed exactly once: by its response, by its deadline, or by
//! a bulk release at shutdown. Whichever comes first wins; the others find
//! nothing left to do.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::time::{DelayQueue, delay_queue};

use crate::error::{ClaudeError, Result};
use crate::types::identifiers::RequestId;

/// Channel resolving the caller of a correlated request
pub type Waiter = oneshot::Sender<Result<Value>>;

struct PendingRequest {
    subtype: String,
    issued_at: DateTime<Utc>,
    key: delay_queue::Key,
    waiter: Waiter,
}

/// Table of requests awaiting a `control_response`
pub struct PendingRequests {
    entries: HashMap<RequestId, PendingRequest>,
    deadlines: DelayQueue<RequestId>,
}

impl PendingRequests {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            deadlines: DelayQueue::new(),
        }
    }

    /// Record a request that must be answered within `timeout`
    ///
    /// # Errors
    /// Returns `ControlProtocol` if `id` is already pending; `waiter` is
    /// dropped in that case
    pub fn insert(
        &mut self,
        id: RequestId,
        subtype: impl Into<String>,
        timeout: Duration,
        waiter: Waiter,
    ) -> Result<()> {
        if self.entries.contains_key(&id) {
            return Err(ClaudeError::control_protocol(format!(
                "Request id {id} is already pending"
            )));
        }
        let key = self.deadlines.insert(id.clone(), timeout);
        self.entries.insert(
            id,
            PendingRequest {
                subtype: subtype.into(),
                issued_at: Utc::now(),
                key,
                waiter,
            },
        );
        Ok(())
    }

    /// Resolve `id` with `outcome`
    ///
    /// Returns `false` when nothing was pending under `id` (late or unknown
    /// response).
    pub fn resolve(&mut self, id: &RequestId, outcome: Result<Value>) -> bool {
        let Some(entry) = self.entries.remove(id) else {
            return false;
        };
        self.deadlines.remove(&entry.key);
        let elapsed = Utc::now().signed_duration_since(entry.issued_at);
        log::debug!(
            "{} request {id} resolved after {}ms",
            entry.subtype,
            elapsed.num_milliseconds()
        );
        if entry.waiter.send(outcome).is_err() {
            log::debug!("Caller of request {id} went away before its response");
        }
        true
    }

    /// Wait for the next deadline and fail that request with `Timeout`
    ///
    /// Returns `None` immediately when nothing is pending.
    pub async fn expire_next(&mut self) -> Option<RequestId> {
        let expired = self.deadlines.next().await?;
        let id = expired.into_inner();
        if let Some(entry) = self.entries.remove(&id) {
            log::warn!("{} request {id} timed out", entry.subtype);
            let _ = entry.waiter.send(Err(ClaudeError::timeout(format!(
                "{} request {id} received no response in time",
                entry.subtype
            ))));
        }
        Some(id)
    }

    /// Release every pending request with an error built by `error`
    pub fn release_all(&mut self, error: impl Fn(&RequestId, &str) -> ClaudeError) -> usize {
        let released = self.entries.len();
        for (id, entry) in self.entries.drain() {
            let _ = entry.waiter.send(Err(error(&id, &entry.subtype)));
        }
        self.deadlines.clear();
        released
    }

    /// Release every pending request with `Cancelled`
    pub fn cancel_all(&mut self) -> usize {
        self.release_all(|id, subtype| {
            ClaudeError::cancelled(format!("{subtype} request {id} cancelled by shutdown"))
        })
    }

    /// Number of pending requests
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}
