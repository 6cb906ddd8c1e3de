//! Turning a relayed gateway body into assistant text.

use futures_util::{pin_mut, Stream, StreamExt};
use serde_json::Value;

use crate::extract::extract_text;
use crate::message::ChatMessage;
use crate::sse::SseDecoder;

/// How a reply body is framed, decided from its `content-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    EventStream,
    Whole,
}

impl BodyKind {
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.to_ascii_lowercase().contains("text/event-stream") {
            BodyKind::EventStream
        } else {
            BodyKind::Whole
        }
    }
}

/// Decoder for either framing. Event streams yield deltas as frames
/// complete; whole bodies are buffered and yield a single text on finish.
pub enum ReplyDecoder {
    EventStream(SseDecoder),
    Whole(Vec<u8>),
}

impl ReplyDecoder {
    pub fn for_content_type(content_type: &str) -> Self {
        match BodyKind::from_content_type(content_type) {
            BodyKind::EventStream => ReplyDecoder::EventStream(SseDecoder::default()),
            BodyKind::Whole => ReplyDecoder::Whole(Vec::new()),
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        match self {
            ReplyDecoder::EventStream(decoder) => decoder.feed(chunk),
            ReplyDecoder::Whole(body) => {
                body.extend_from_slice(chunk);
                Vec::new()
            }
        }
    }

    pub fn finish(&mut self) -> Vec<String> {
        match self {
            ReplyDecoder::EventStream(decoder) => decoder.finish(),
            ReplyDecoder::Whole(body) => {
                let body = std::mem::take(body);
                whole_body_text(&String::from_utf8_lossy(&body))
                    .into_iter()
                    .collect()
            }
        }
    }
}

/// Text of a non-streamed body: extracted from JSON when possible, the
/// trimmed raw text otherwise.
pub fn whole_body_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|parsed| extract_text(&parsed))
        .or_else(|| Some(trimmed.to_string()))
}

/// Adapts a byte stream into a stream of text deltas. Dropping the returned
/// stream stops reading the body.
pub fn reply_deltas<S, B, E>(content_type: &str, body: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut decoder = ReplyDecoder::for_content_type(content_type);
    async_stream::try_stream! {
        pin_mut!(body);
        while let Some(chunk) = body.next().await {
            for delta in decoder.feed(chunk?.as_ref()) {
                yield delta;
            }
        }
        for delta in decoder.finish() {
            yield delta;
        }
    }
}

/// Streams a whole reply into `message`. On success the message is finished
/// (placeholder when empty); on a body error the text received so far is
/// kept and the error returned.
pub async fn collect_reply<S, B, E>(
    content_type: &str,
    body: S,
    message: &mut ChatMessage,
) -> Result<(), E>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let deltas = reply_deltas(content_type, body);
    pin_mut!(deltas);
    while let Some(delta) = deltas.next().await {
        message.apply_delta(&delta?);
    }
    message.finish_reply();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_selects_framing() {
        assert_eq!(BodyKind::from_content_type("text/event-stream; charset=utf-8"), BodyKind::EventStream);
        assert_eq!(BodyKind::from_content_type("Text/Event-Stream"), BodyKind::EventStream);
        assert_eq!(BodyKind::from_content_type("application/json"), BodyKind::Whole);
        assert_eq!(BodyKind::from_content_type(""), BodyKind::Whole);
    }

    #[test]
    fn whole_json_body_is_extracted() {
        assert_eq!(whole_body_text(r#"{"code":200,"data":"hello"}"#).as_deref(), Some("hello"));
    }

    #[test]
    fn whole_body_falls_back_to_raw_text() {
        assert_eq!(whole_body_text("  plain answer \n").as_deref(), Some("plain answer"));
        assert_eq!(whole_body_text(r#"{"id":1}"#).as_deref(), Some(r#"{"id":1}"#));
        assert_eq!(whole_body_text("   "), None);
    }

    #[test]
    fn whole_decoder_only_yields_on_finish() {
        let mut decoder = ReplyDecoder::for_content_type("application/json");
        assert!(matches!(decoder, ReplyDecoder::Whole(_)));
        assert!(decoder.feed(br#"{"answer":"#).is_empty());
        assert!(decoder.feed(br#""ok"}"#).is_empty());
        assert_eq!(decoder.finish(), vec!["ok".to_string()]);
    }
}
