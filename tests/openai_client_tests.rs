use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tutorbot::clients::{OpenAIClient, OpenAIConfig};
use tutorbot::core::{ChatClient, ChatRequest, ChatTurn};
use tutorbot::error::{AIError, OpenAIError};

/// Raw HTTP request as seen by the server.
struct Captured {
    head: String,
    body: String,
}

/// Serve one connection with a canned response; the handle yields the request.
async fn serve_once(status: &str, content_type: &str, body: String) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let status = status.to_string();
    let content_type = content_type.to_string();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before request head");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        while buf.len() < head_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body = String::from_utf8_lossy(&buf[head_end..]).to_string();

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        Captured { head, body: request_body }
    });

    (format!("http://{}", addr), handle)
}

fn client_for(base_url: String) -> OpenAIClient {
    OpenAIClient::new(OpenAIConfig { api_key: "test-key".into(), base_url })
}

fn request() -> ChatRequest {
    ChatRequest {
        model: "gpt-4o-mini".into(),
        messages: vec![ChatTurn::system("be brief"), ChatTurn::user("hi")],
        temperature: 0.7,
        max_tokens: 700,
        stream: true,
    }
}

fn completion(content: Value) -> String {
    json!({
        "id": "chatcmpl-1",
        "choices": [ { "index": 0, "message": { "role": "assistant", "content": content } } ]
    })
    .to_string()
}

#[tokio::test]
async fn complete_posts_to_chat_endpoint() {
    let (url, server) = serve_once("200 OK", "application/json", completion(json!("Hello!"))).await;
    let reply = client_for(url).complete(request()).await.unwrap();
    assert_eq!(reply, "Hello!");

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("POST /v1/chat/completions HTTP/1.1"));
    assert!(captured.head.to_lowercase().contains("authorization: bearer test-key"));
    let body: Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(body["stream"], false);
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["messages"][1]["content"], "hi");
}

#[tokio::test]
async fn null_content_is_empty_reply() {
    let (url, _server) = serve_once("200 OK", "application/json", completion(Value::Null)).await;
    let reply = client_for(url).complete(request()).await.unwrap();
    assert_eq!(reply, "");
}

#[tokio::test]
async fn empty_choices_is_api_error() {
    let (url, _server) = serve_once("200 OK", "application/json", json!({ "choices": [] }).to_string()).await;
    let err = client_for(url).complete(request()).await.unwrap_err();
    assert!(matches!(err, AIError::OpenAI(OpenAIError::Api(msg)) if msg == "No choices"));
}

#[tokio::test]
async fn unauthorized_maps_to_authentication() {
    let (url, _server) = serve_once("401 Unauthorized", "application/json", r#"{"error":"bad key"}"#.into()).await;
    let err = client_for(url).complete(request()).await.unwrap_err();
    assert!(matches!(err, AIError::OpenAI(OpenAIError::Authentication)));
}

#[tokio::test]
async fn too_many_requests_maps_to_rate_limit() {
    let (url, _server) = serve_once("429 Too Many Requests", "application/json", "{}".into()).await;
    let err = client_for(url).stream(request()).await.err().unwrap();
    assert!(matches!(err, AIError::OpenAI(OpenAIError::RateLimit)));
}

#[tokio::test]
async fn other_failure_carries_body() {
    let body = r#"{"error":{"message":"model overloaded"}}"#;
    let (url, _server) = serve_once("500 Internal Server Error", "application/json", body.into()).await;
    let err = client_for(url).complete(request()).await.unwrap_err();
    assert!(matches!(err, AIError::OpenAI(OpenAIError::Api(msg)) if msg == body));
}

#[tokio::test]
async fn stream_yields_sse_deltas() {
    let mut sse = String::new();
    for token in ["Hel", "lo", " there"] {
        sse.push_str(&format!("data: {}\n\n", json!({ "choices": [ { "delta": { "content": token } } ] })));
    }
    sse.push_str("data: [DONE]\n\n");

    let (url, server) = serve_once("200 OK", "text/event-stream", sse).await;
    let stream = client_for(url).stream(request()).await.unwrap();
    let chunks: Vec<String> = stream.map(|c| c.unwrap()).collect().await;
    assert_eq!(chunks, ["Hel", "lo", " there"]);

    let body: Value = serde_json::from_str(&server.await.unwrap().body).unwrap();
    assert_eq!(body["stream"], true);
}

#[tokio::test]
async fn env_base_url_overrides_default() {
    let (url, _server) = serve_once("200 OK", "application/json", completion(json!("via env"))).await;
    std::env::set_var("OPENAI_BASE_URL", format!("  {}/ ", url));
    let config = OpenAIConfig::new("test-key").with_env_base_url();
    std::env::remove_var("OPENAI_BASE_URL");
    assert_eq!(config.base_url, url);

    let reply = OpenAIClient::new(config).complete(request()).await.unwrap();
    assert_eq!(reply, "via env");
}
