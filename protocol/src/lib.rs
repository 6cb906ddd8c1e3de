//! Shared contract between the AI chat gateway and the browser client.
//!
//! The gateway relays the upstream body untouched; everything needed to turn
//! that body back into readable assistant text lives here so it can be used
//! from both native code and the wasm frontend.

pub mod error;
pub mod extract;
pub mod message;
pub mod reply;
pub mod request;
pub mod sse;

pub use error::{ErrorEnvelope, ErrorKind};
pub use extract::{extract_text, PayloadExtractor, TextExtractor};
pub use message::{ChatMessage, MessageRole, APOLOGY_TEXT, NO_REPLY_PLACEHOLDER};
pub use reply::{collect_reply, reply_deltas, BodyKind, ReplyDecoder};
pub use request::{ChatRequest, ResponseMode};
pub use sse::SseDecoder;
