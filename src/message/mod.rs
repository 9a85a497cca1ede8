//! Typed messages and streaming deltas
//!
//! [`parse_message`] turns an `sdk_message` payload into a [`Message`];
//! [`StreamEventParser`] turns `stream_event` payloads into [`StreamDelta`]s.

mod parser;
pub mod stream;

pub use parser::{parse_line, parse_message};
pub use stream::{Accumulator, BlockKind, StreamDelta, StreamEventParser, parse_event, unwrap_envelope};
