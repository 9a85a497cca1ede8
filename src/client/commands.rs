//! Mailbox commands from client handles to the session actor

use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;

use super::Delivery;
use super::subscribers::EventSink;
use crate::control::ControlRequest;
use crate::error::Result;
use crate::types::identifiers::SubscriberId;

pub(crate) enum Command {
    /// Correlated control request issued by the application
    Control {
        request: ControlRequest,
        timeout: Duration,
        reply: oneshot::Sender<Result<Value>>,
    },
    Subscribe {
        id: SubscriberId,
        sink: EventSink,
    },
    Send {
        id: SubscriberId,
        line: String,
        reply: oneshot::Sender<Result<Delivery>>,
    },
    Unsubscribe {
        id: SubscriberId,
    },
    EndInput {
        reply: oneshot::Sender<Result<()>>,
    },
    Close {
        reply: oneshot::Sender<Result<()>>,
    },
}
