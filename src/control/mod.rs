//! Control protocol machinery
//!
//! - [`protocol`] - frame codec, request ids, wire casing
//! - [`pending`] - correlation of outbound requests with their responses
//! - [`mode`] - lightweight vs. full-control selection

pub mod mode;
pub mod pending;
pub mod protocol;

pub use mode::{TransportMode, select_mode, select_mode_from_value};
pub use pending::PendingRequests;
pub use protocol::{
    ControlFeatures, ControlFrame, ControlOutcome, ControlRequest, PayloadKey, ProtocolHandler,
    StreamEventEnvelope,
};
