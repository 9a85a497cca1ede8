//! Streaming event parser
//!
//! With `include_partial_messages` the CLI wraps the model's raw streaming
//! events in `stream_event` envelopes. [`StreamEventParser`] unwraps them,
//! turns each event into zero or more [`StreamDelta`]s and keeps a running
//! text buffer so every text delta (and the final `MessageStop`) carries the
//! text accumulated so far.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a content block announced by `content_block_start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// Plain text
    Text,
    /// Extended thinking
    Thinking,
    /// Tool invocation; input arrives as partial JSON
    ToolUse {
        /// Tool use ID
        id: String,
        /// Tool name
        name: String,
    },
    /// Any other block type, kept by name
    Other {
        /// Block type as sent
        name: String,
    },
}

impl BlockKind {
    fn from_block(block: &Value) -> Self {
        let str_field =
            |key: &str| block.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        match block.get("type").and_then(Value::as_str).unwrap_or_default() {
            "text" => Self::Text,
            "thinking" => Self::Thinking,
            "tool_use" | "server_tool_use" => Self::ToolUse {
                id: str_field("id"),
                name: str_field("name"),
            },
            other => Self::Other {
                name: other.to_string(),
            },
        }
    }
}

/// Typed streaming delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamDelta {
    /// A new assistant message started
    MessageStart {
        /// The `message` object of the event
        message: Value,
    },
    /// A content block started
    BlockStart {
        /// Block index
        index: u64,
        /// Block kind
        kind: BlockKind,
    },
    /// Text fragment
    TextDelta {
        /// Block index
        index: u64,
        /// This fragment
        text: String,
        /// All text of the message so far, this fragment included
        accumulated: String,
    },
    /// Thinking fragment
    ThinkingDelta {
        /// Block index
        index: u64,
        /// This fragment
        thinking: String,
    },
    /// Partial JSON of a tool input
    ToolInputDelta {
        /// Block index
        index: u64,
        /// This fragment
        partial_json: String,
    },
    /// Full tool input, assembled from the block's fragments
    ToolInputComplete {
        /// Block index
        index: u64,
        /// Parsed input
        input: Value,
    },
    /// A content block ended
    BlockStop {
        /// Block index
        index: u64,
    },
    /// Message-level update (stop reason, usage)
    MessageDelta {
        /// The `delta` object of the event
        delta: Value,
        /// Usage counters, if sent
        usage: Option<Value>,
    },
    /// The message ended
    MessageStop {
        /// Final accumulated text
        accumulated: String,
    },
}

impl StreamDelta {
    /// Whether this delta ends the current message
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::MessageStop { .. })
    }
}

/// Per-message parser state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accumulator {
    /// Text accumulated since the message started
    pub buffer: String,
    /// `type` of the last event seen
    pub last_event_kind: Option<String>,
    tool_inputs: BTreeMap<u64, String>,
}

impl Accumulator {
    /// Tool-input fragments still waiting for their block to stop
    #[must_use]
    pub fn open_tool_inputs(&self) -> usize {
        self.tool_inputs.len()
    }
}

/// Strip a `stream_event` envelope, if present
#[must_use]
pub fn unwrap_envelope(payload: &Value) -> &Value {
    match payload.get("type").and_then(Value::as_str) {
        Some("stream_event") => payload.get("event").unwrap_or(payload),
        _ => payload,
    }
}

/// Parse one event against `accumulator`, returning the deltas and the new state
#[must_use]
pub fn parse_event(event: &Value, accumulator: Accumulator) -> (Vec<StreamDelta>, Accumulator) {
    let mut parser = StreamEventParser {
        state: accumulator,
        pending: String::new(),
    };
    let deltas = parser.parse(event);
    (deltas, parser.state)
}

/// Stateful parser for one stream of events
#[derive(Debug, Default)]
pub struct StreamEventParser {
    state: Accumulator,
    pending: String,
}

impl StreamEventParser {
    /// Create a parser with an empty accumulator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text accumulated for the current message
    #[must_use]
    pub fn accumulated(&self) -> &str {
        &self.state.buffer
    }

    /// Current parser state
    #[must_use]
    pub const fn state(&self) -> &Accumulator {
        &self.state
    }

    /// Forget the current message and any buffered input
    pub fn reset(&mut self) {
        self.state = Accumulator::default();
        self.pending.clear();
    }

    /// Parse one event (enveloped or bare)
    pub fn parse(&mut self, payload: &Value) -> Vec<StreamDelta> {
        let event = unwrap_envelope(payload);
        let Some(kind) = event.get("type").and_then(Value::as_str) else {
            log::debug!("Ignoring stream event without a type");
            return Vec::new();
        };
        self.state.last_event_kind = Some(kind.to_string());
        let index = event.get("index").and_then(Value::as_u64).unwrap_or(0);

        match kind {
            "message_start" => {
                self.state.buffer.clear();
                self.state.tool_inputs.clear();
                vec![StreamDelta::MessageStart {
                    message: event.get("message").cloned().unwrap_or(Value::Null),
                }]
            }
            "content_block_start" => {
                let kind = event
                    .get("content_block")
                    .map_or(BlockKind::Other { name: String::new() }, BlockKind::from_block);
                if matches!(kind, BlockKind::ToolUse { .. }) {
                    self.state.tool_inputs.insert(index, String::new());
                }
                vec![StreamDelta::BlockStart { index, kind }]
            }
            "content_block_delta" => self.parse_block_delta(index, event.get("delta")),
            "content_block_stop" => {
                let mut deltas = Vec::with_capacity(2);
                if let Some(json) = self.state.tool_inputs.remove(&index) {
                    let input = if json.trim().is_empty() {
                        Value::Object(serde_json::Map::new())
                    } else {
                        match serde_json::from_str(&json) {
                            Ok(input) => input,
                            Err(e) => {
                                log::warn!("Tool input for block {index} is not valid JSON: {e}");
                                Value::String(json)
                            }
                        }
                    };
                    deltas.push(StreamDelta::ToolInputComplete { index, input });
                }
                deltas.push(StreamDelta::BlockStop { index });
                deltas
            }
            "message_delta" => vec![StreamDelta::MessageDelta {
                delta: event.get("delta").cloned().unwrap_or(Value::Null),
                usage: event.get("usage").cloned(),
            }],
            "message_stop" => {
                let accumulated = std::mem::take(&mut self.state.buffer);
                self.state = Accumulator {
                    last_event_kind: Some(kind.to_string()),
                    ..Accumulator::default()
                };
                vec![StreamDelta::MessageStop { accumulated }]
            }
            other => {
                log::trace!("Ignoring stream event {other}");
                Vec::new()
            }
        }
    }

    fn parse_block_delta(&mut self, index: u64, delta: Option<&Value>) -> Vec<StreamDelta> {
        let Some(delta) = delta else {
            return Vec::new();
        };
        let field = |key: &str| delta.get(key).and_then(Value::as_str).unwrap_or_default();

        match delta.get("type").and_then(Value::as_str).unwrap_or_default() {
            "text_delta" => {
                let text = field("text");
                self.state.buffer.push_str(text);
                vec![StreamDelta::TextDelta {
                    index,
                    text: text.to_string(),
                    accumulated: self.state.buffer.clone(),
                }]
            }
            "thinking_delta" => vec![StreamDelta::ThinkingDelta {
                index,
                thinking: field("thinking").to_string(),
            }],
            "input_json_delta" => {
                let partial = field("partial_json");
                self.state
                    .tool_inputs
                    .entry(index)
                    .or_default()
                    .push_str(partial);
                vec![StreamDelta::ToolInputDelta {
                    index,
                    partial_json: partial.to_string(),
                }]
            }
            _ => Vec::new(),
        }
    }

    /// Feed raw output, which may split JSON objects anywhere
    ///
    /// Complete objects are parsed as events; an incomplete trailing object
    /// stays buffered until the next call. Text that is not JSON is dropped
    /// up to the next line break.
    pub fn feed(&mut self, chunk: &str) -> Vec<StreamDelta> {
        self.pending.push_str(chunk);
        let mut deltas = Vec::new();

        loop {
            let buffered = std::mem::take(&mut self.pending);
            let mut objects = serde_json::Deserializer::from_str(&buffered).into_iter::<Value>();
            let next = objects.next();
            let consumed = objects.byte_offset();

            match next {
                Some(Ok(event)) => {
                    self.pending = buffered[consumed..].to_string();
                    deltas.extend(self.parse(&event));
                }
                Some(Err(e)) if e.is_eof() => {
                    self.pending = buffered;
                    break;
                }
                Some(Err(e)) => {
                    log::warn!("Dropping malformed stream chunk: {e}");
                    if let Some(newline) = buffered.find('\n') {
                        self.pending = buffered[newline + 1..].to_string();
                    } else {
                        break;
                    }
                }
                None => break,
            }
        }

        deltas
    }
}
