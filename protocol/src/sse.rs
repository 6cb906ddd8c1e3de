//! Incremental Server-Sent Events decoding of relayed reply bodies.

use serde_json::Value;
use tracing::{debug, trace};

use crate::extract::PayloadExtractor;

const FRAME_SEPARATOR: &str = "\n\n";
const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Event types whose payload carries answer text. Frames without an `event`
/// field are always considered.
const TEXT_EVENTS: [&str; 4] = ["message", "message_end", "message_delta", "completion"];

/// Push parser turning raw SSE bytes into extracted text deltas.
///
/// Bytes may be split anywhere, including inside a UTF-8 sequence or a frame.
/// Complete frames are decoded as soon as they arrive; the incomplete tail is
/// kept until more bytes come in or [`SseDecoder::finish`] is called.
pub struct SseDecoder {
    extractor: PayloadExtractor,
    pending: String,
    utf8_tail: Vec<u8>,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new(PayloadExtractor::default())
    }
}

impl SseDecoder {
    pub fn new(extractor: PayloadExtractor) -> Self {
        Self {
            extractor,
            pending: String::new(),
            utf8_tail: Vec::new(),
        }
    }

    /// Feeds one chunk and returns the text deltas of every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode_utf8(chunk);
        if self.pending.contains('\r') {
            self.pending = self.pending.replace("\r\n", "\n");
        }

        let Some(split_at) = self.pending.rfind(FRAME_SEPARATOR) else {
            return Vec::new();
        };
        let rest = self.pending.split_off(split_at + FRAME_SEPARATOR.len());
        let complete = std::mem::replace(&mut self.pending, rest);

        complete
            .split(FRAME_SEPARATOR)
            .flat_map(|frame| self.decode_frame(frame))
            .collect()
    }

    /// Flushes whatever is still buffered once the stream has ended.
    pub fn finish(&mut self) -> Vec<String> {
        if !self.utf8_tail.is_empty() {
            let tail = std::mem::take(&mut self.utf8_tail);
            self.pending.push_str(&String::from_utf8_lossy(&tail));
        }
        if self.pending.trim().is_empty() {
            self.pending.clear();
            return Vec::new();
        }
        self.feed(FRAME_SEPARATOR.as_bytes())
    }

    fn decode_utf8(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.utf8_tail);
        bytes.extend_from_slice(chunk);

        let mut input = bytes.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    self.pending.push_str(valid);
                    return;
                }
                Err(e) => {
                    let (valid, after) = input.split_at(e.valid_up_to());
                    // valid_up_to guarantees this prefix is well formed
                    self.pending.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            self.pending.push(char::REPLACEMENT_CHARACTER);
                            input = &after[len..];
                        }
                        None => {
                            self.utf8_tail = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    fn decode_frame(&self, frame: &str) -> Vec<String> {
        frame
            .lines()
            .filter_map(data_payload)
            .filter_map(|payload| self.decode_payload(payload))
            .collect()
    }

    fn decode_payload(&self, payload: &str) -> Option<String> {
        let parsed: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                debug!("Dropping malformed SSE payload: {e}");
                return None;
            }
        };

        if let Some(event) = parsed.get("event").and_then(Value::as_str) {
            if !TEXT_EVENTS.contains(&event) {
                trace!("Skipping SSE event {event}");
                return None;
            }
        }

        self.extractor.extract(&parsed)
    }
}

/// Returns the payload of a `data:` line with every stacked prefix removed,
/// or `None` for non-data lines, empty payloads and the done sentinel.
pub fn data_payload(line: &str) -> Option<&str> {
    let mut payload = line.trim();
    if !payload.starts_with(DATA_PREFIX) {
        return None;
    }
    while let Some(rest) = payload.strip_prefix(DATA_PREFIX) {
        payload = rest.trim_start();
    }
    let payload = payload.trim();
    (!payload.is_empty() && payload != DONE_SENTINEL).then_some(payload)
}
