use ai_chat_protocol::{ChatRequest, ErrorEnvelope, ReplyDecoder, ResponseMode};
use gloo_net::http::{Request, Response};
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::ReadableStreamDefaultReader;

/// Gateway endpoint, served from the same origin as the page.
const CHAT_ENDPOINT: &str = "/api/ai-chat";

/// Asks the gateway one question and feeds every decoded text delta to
/// `on_delta` as the reply arrives.
pub async fn ask(question: &str, mut on_delta: impl FnMut(&str)) -> Result<(), String> {
    let body = ChatRequest::new(question).with_response_mode(ResponseMode::Streaming);

    let resp = Request::post(CHAT_ENDPOINT)
        .json(&body)
        .map_err(|e| format!("Serialize error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;

    if !resp.ok() {
        return Err(error_summary(resp).await);
    }

    let content_type = resp.headers().get("content-type").unwrap_or_default();
    let mut decoder = ReplyDecoder::for_content_type(&content_type);

    let Some(stream) = resp.body() else {
        return Err("The gateway did not return a readable reply stream".to_string());
    };
    let reader: ReadableStreamDefaultReader = stream.get_reader().unchecked_into();

    loop {
        let chunk = JsFuture::from(reader.read()).await.map_err(js_error)?;
        let done = Reflect::get(&chunk, &JsValue::from_str("done"))
            .map_err(js_error)?
            .as_bool()
            .unwrap_or(true);
        if done {
            break;
        }
        let value = Reflect::get(&chunk, &JsValue::from_str("value")).map_err(js_error)?;
        let bytes = Uint8Array::new(&value).to_vec();
        for delta in decoder.feed(&bytes) {
            on_delta(&delta);
        }
    }

    for delta in decoder.finish() {
        on_delta(&delta);
    }
    Ok(())
}

/// Human-readable description of a failed gateway call.
async fn error_summary(resp: Response) -> String {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => {
            log::error!("AI chat upstream diagnostic: {envelope:?}");
            envelope.summary()
        }
        Err(_) if text.trim().is_empty() => format!("Gateway returned status {status}"),
        Err(_) => format!("Gateway returned status {status} - {}", text.trim()),
    }
}

fn js_error(err: JsValue) -> String {
    format!("Stream error: {err:?}")
}
