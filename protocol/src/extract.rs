//! Best-effort text extraction from upstream payloads.
//!
//! The upstream payload shape is not fixed, so extraction walks the JSON value
//! and asks a fixed, ordered list of [`TextExtractor`] strategies which nested
//! values may carry text. Strings found anywhere along the way are trimmed,
//! de-duplicated in insertion order and joined with newlines.
//!
//! Default strategy order:
//! 1. [`CandidateKeys`]: string fields `answer`, `content`, `message`, `text`, `value`
//! 2. [`Choices`]: `Choices[].Content` and `Choices[].Delta.content`
//! 3. [`NestedData`]: whatever sits under `data`, visited recursively

use serde_json::{Map, Value};
use tracing::trace;

/// One strategy for locating text-bearing values inside a JSON object.
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Values this strategy considers worth visiting, in visiting order.
    fn candidates<'a>(&self, object: &'a Map<String, Value>) -> Vec<&'a Value>;
}

/// Top-level string fields commonly used for answer text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateKeys;

const CANDIDATE_KEYS: [&str; 5] = ["answer", "content", "message", "text", "value"];

impl TextExtractor for CandidateKeys {
    fn name(&self) -> &'static str {
        "candidate_keys"
    }

    fn candidates<'a>(&self, object: &'a Map<String, Value>) -> Vec<&'a Value> {
        CANDIDATE_KEYS
            .iter()
            .filter_map(|key| object.get(*key))
            .filter(|value| value.is_string())
            .collect()
    }
}

/// OpenAI-style `Choices` arrays, with either full `Content` or a `Delta`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Choices;

impl TextExtractor for Choices {
    fn name(&self) -> &'static str {
        "choices"
    }

    fn candidates<'a>(&self, object: &'a Map<String, Value>) -> Vec<&'a Value> {
        let Some(choices) = object.get("Choices").and_then(Value::as_array) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for choice in choices.iter().filter_map(Value::as_object) {
            if let Some(content) = choice.get("Content") {
                if content.as_str().is_some_and(|s| !s.trim().is_empty()) {
                    found.push(content);
                }
            }
            if let Some(content) = choice
                .get("Delta")
                .and_then(Value::as_object)
                .and_then(|delta| delta.get("content"))
                .filter(|content| content.is_string())
            {
                found.push(content);
            }
        }
        found
    }
}

/// Envelopes that wrap the real payload under `data`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedData;

impl TextExtractor for NestedData {
    fn name(&self) -> &'static str {
        "nested_data"
    }

    fn candidates<'a>(&self, object: &'a Map<String, Value>) -> Vec<&'a Value> {
        object.get("data").into_iter().collect()
    }
}

/// Runs a list of strategies over a payload.
pub struct PayloadExtractor {
    strategies: Vec<Box<dyn TextExtractor>>,
}

impl Default for PayloadExtractor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(CandidateKeys),
            Box::new(Choices),
            Box::new(NestedData),
        ])
    }
}

impl PayloadExtractor {
    pub fn new(strategies: Vec<Box<dyn TextExtractor>>) -> Self {
        Self { strategies }
    }

    /// Returns every distinct non-empty string found, joined with `\n`, or
    /// `None` when the payload carries no text at all.
    pub fn extract(&self, payload: &Value) -> Option<String> {
        let mut found: Vec<String> = Vec::new();
        self.visit(payload, &mut found);
        (!found.is_empty()).then(|| found.join("\n"))
    }

    fn visit(&self, value: &Value, found: &mut Vec<String>) {
        match value {
            Value::String(s) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() && !found.iter().any(|f| f == trimmed) {
                    found.push(trimmed.to_string());
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item, found);
                }
            }
            Value::Object(object) => {
                for strategy in &self.strategies {
                    let candidates = strategy.candidates(object);
                    if !candidates.is_empty() {
                        trace!(strategy = strategy.name(), count = candidates.len(), "Visiting text candidates");
                    }
                    for candidate in candidates {
                        self.visit(candidate, found);
                    }
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}

/// [`PayloadExtractor::extract`] with the default strategies.
pub fn extract_text(payload: &Value) -> Option<String> {
    PayloadExtractor::default().extract(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn candidate_keys_only_yield_strings_in_key_order() {
        let obj = object(json!({"text": "b", "answer": "a", "message": {"x": 1}, "value": 3}));
        let found: Vec<_> = CandidateKeys.candidates(&obj).into_iter().cloned().collect();
        assert_eq!(found, vec![json!("a"), json!("b")]);
    }

    #[test]
    fn choices_yield_content_then_delta_per_choice() {
        let obj = object(json!({
            "Choices": [
                {"Content": "full", "Delta": {"content": "part"}},
                {"Content": "   "},
                {"Delta": {"content": 7}},
                "not an object"
            ]
        }));
        let found: Vec<_> = Choices.candidates(&obj).into_iter().cloned().collect();
        assert_eq!(found, vec![json!("full"), json!("part")]);
    }

    #[test]
    fn nested_data_yields_any_type() {
        let obj = object(json!({"data": [1, "x"]}));
        assert_eq!(NestedData.candidates(&obj), vec![&json!([1, "x"])]);
        assert!(NestedData.candidates(&object(json!({"other": 1}))).is_empty());
    }

    #[test]
    fn delta_content_is_extracted() {
        let payload = json!({"Choices": [{"Delta": {"content": "foo"}}]});
        assert_eq!(extract_text(&payload).as_deref(), Some("foo"));
    }

    #[test]
    fn strings_are_trimmed_deduplicated_and_joined() {
        let payload = json!({
            "answer": " hello ",
            "content": "hello",
            "data": {"text": "world", "data": ["hello", "  ", "again"]}
        });
        assert_eq!(extract_text(&payload).as_deref(), Some("hello\nworld\nagain"));
    }

    #[test]
    fn bare_strings_and_arrays_are_visited() {
        assert_eq!(extract_text(&json!("  hi  ")).as_deref(), Some("hi"));
        assert_eq!(extract_text(&json!(["a", {"answer": "b"}])).as_deref(), Some("a\nb"));
    }

    #[test]
    fn payload_without_text_yields_none() {
        assert_eq!(extract_text(&json!({"event": "ping", "id": 3})), None);
        assert_eq!(extract_text(&json!({"answer": ""})), None);
        assert_eq!(extract_text(&Value::Null), None);
    }

    #[test]
    fn custom_strategy_lists_are_respected() {
        let extractor = PayloadExtractor::new(vec![Box::new(NestedData)]);
        assert_eq!(extractor.extract(&json!({"answer": "skipped", "data": "kept"})).as_deref(), Some("kept"));
    }
}
