use bytes::Bytes;
use futures_util::{stream, StreamExt};
use serde_json::json;
use tutorbot::error::{AIError, OpenAIError};
use tutorbot::streaming::{parse_sse_payload, text_deltas_from_sse, RawByteStream, SseEvent};

fn sse_event(token: &str) -> String {
    let payload = json!({
        "choices": [ { "delta": { "content": token } } ]
    });
    format!("data: {}\n\n", payload)
}

fn byte_stream(chunks: Vec<Result<String, AIError>>) -> RawByteStream {
    Box::pin(stream::iter(chunks.into_iter().map(|c| c.map(Bytes::from))))
}

async fn collect(chunks: Vec<Result<String, AIError>>) -> Vec<Result<String, AIError>> {
    text_deltas_from_sse(byte_stream(chunks)).collect().await
}

#[test]
fn payload_classification() {
    assert_eq!(parse_sse_payload("[DONE]"), SseEvent::Done);
    assert_eq!(
        parse_sse_payload(r#"{"choices":[{"delta":{"content":"hi"}}]}"#),
        SseEvent::Delta("hi".into())
    );
    assert_eq!(parse_sse_payload(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#), SseEvent::Ignored);
    assert_eq!(
        parse_sse_payload(r#"{"error":{"message":"quota exceeded"}}"#),
        SseEvent::Error("quota exceeded".into())
    );
}

#[tokio::test]
async fn deltas_arrive_in_order_and_stop_at_done() {
    let body = format!(
        "{}{}{}data: [DONE]\n\n{}",
        sse_event("Hello"),
        sse_event(", "),
        sse_event("world"),
        sse_event("ignored after done"),
    );
    let out = collect(vec![Ok(body)]).await;
    let texts: Vec<String> = out.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(texts, vec!["Hello", ", ", "world"]);
}

#[tokio::test]
async fn events_split_across_chunks() {
    let event = sse_event("안녕하세요");
    let (a, b) = event.split_at(10);
    let out = collect(vec![Ok(a.to_string()), Ok(b.to_string()), Ok("data: [DONE]\n\n".into())]).await;
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].as_ref().unwrap(), "안녕하세요");
}

#[tokio::test]
async fn transport_error_is_propagated_once() {
    let out = collect(vec![
        Ok(sse_event("partial")),
        Err(AIError::OpenAI(OpenAIError::Http("connection reset".into()))),
        Ok(sse_event("never")),
    ])
    .await;
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].as_ref().unwrap(), "partial");
    assert!(matches!(out[1], Err(AIError::Stream(_))));
}

#[tokio::test]
async fn provider_error_event_ends_stream() {
    let body = format!("{}data: {}\n\n", sse_event("a"), json!({"error": {"message": "boom"}}));
    let out = collect(vec![Ok(body)]).await;
    assert_eq!(out.len(), 2);
    assert!(matches!(&out[1], Err(AIError::OpenAI(OpenAIError::Api(m))) if m == "boom"));
}

#[tokio::test]
async fn stream_without_done_ends_at_eof() {
    let body = format!("{}data: {}", sse_event("one"), json!({"choices": [{"delta": {"content": "two"}}]}));
    let out = collect(vec![Ok(body)]).await;
    let texts: Vec<String> = out.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(texts, vec!["one", "two"]);
}
