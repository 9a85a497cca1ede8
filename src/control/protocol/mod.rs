//! Control protocol codec
//!
//! Four frame kinds travel over the wire: `control_request`,
//! `control_response`, conversation messages, and `stream_event`. This
//! module is the only place that builds or takes apart those frames.
//!
//! # Example
//!
//! ```rust
//! use kodegen_claude_control::control::protocol::{
//!     ControlFrame, ControlRequest, ProtocolHandler, decode, encode,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handler = ProtocolHandler::new();
//! let (id, frame) = handler.request(ControlRequest::Interrupt);
//!
//! let line = encode(&frame)?;
//! let parsed = decode(&line)?;
//! assert_eq!(parsed, frame);
//! assert!(matches!(parsed, ControlFrame::ControlRequest { request_id, .. } if request_id == id));
//! # Ok(())
//! # }
//! ```

mod capabilities;
pub mod casing;
mod frames;
mod handler;

// Re-export public types
pub use capabilities::ControlFeatures;
pub use frames::{
    ControlFrame, ControlOutcome, ControlRequest, PayloadKey, StreamEventEnvelope, decode, decode_value,
    encode,
};
pub use handler::ProtocolHandler;
