//! End-to-end turns through the controller, adapter and real HTTP clients,
//! against a one-shot mock server on localhost.

use dpilot::config::{Provider, ProviderSettings};
use dpilot::core::adapter::{ResponseAdapter, ResponseGenerator, TransportMode};
use dpilot::core::controller::{ChatController, SubmitOutcome};
use dpilot::core::error::GenerateError;
use dpilot::providers::anthropic::AnthropicProvider;
use dpilot::providers::openai_compatible::OpenAICompatibleProvider;
use dpilot::providers::{LLMProvider, Message, Role};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct CapturedRequest {
    request_line: String,
    headers: Vec<(String, String)>,
    body: serde_json::Value,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        429 => "Too Many Requests",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

/// Accept one connection, capture the request, answer with the given body.
async fn serve_once(
    status: u16,
    content_type: &'static str,
    body: String,
) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");

        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let read = stream.read(&mut chunk).await.expect("read request");
            assert!(read > 0, "connection closed before headers");
            raw.extend_from_slice(&chunk[..read]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        let content_length = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);

        let mut request_body = raw[header_end..].to_vec();
        while request_body.len() < content_length {
            let read = stream.read(&mut chunk).await.expect("read body");
            assert!(read > 0, "connection closed before body");
            request_body.extend_from_slice(&chunk[..read]);
        }

        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reason(status),
            content_type,
            body.len(),
            body
        );
        stream
            .write_all(response.as_bytes())
            .await
            .expect("write response");
        stream.shutdown().await.ok();

        CapturedRequest {
            request_line,
            headers,
            body: serde_json::from_slice(&request_body).expect("request body is JSON"),
        }
    });

    (format!("http://{}", addr), handle)
}

fn settings(base_url: &str, api_key: Option<&str>) -> ProviderSettings {
    ProviderSettings {
        api_key: api_key.map(str::to_string),
        api_key_env: Some(format!("DPILOT_CHAT_FLOW_UNSET_{}", std::process::id())),
        base_url: Some(base_url.to_string()),
        ..Default::default()
    }
}

fn adapter(
    backend: Box<dyn LLMProvider>,
    base_url: &str,
    mode: TransportMode,
) -> ResponseAdapter {
    ResponseAdapter::new(
        backend,
        settings(base_url, Some("test-key")),
        "You are a dental clinical assistant.",
        mode,
    )
}

fn mistral() -> Box<dyn LLMProvider> {
    Box::new(OpenAICompatibleProvider::new(Provider::Mistral))
}

#[tokio::test]
async fn submit_end_to_end_with_batch_reply() {
    let reply = r#"{"id":"c1","choices":[{"index":0,"message":{"role":"assistant","content":"Protocol details..."}}]}"#;
    let (base_url, server) = serve_once(200, "application/json", reply.to_string()).await;
    let controller = ChatController::new(Box::new(adapter(
        mistral(),
        &base_url,
        TransportMode::Batch,
    )));

    let outcome = controller.submit("What is the protocol for X?").await;

    assert_eq!(outcome, SubmitOutcome::Answered("Protocol details...".to_string()));
    assert_eq!(
        controller.messages(),
        vec![
            Message::user("What is the protocol for X?"),
            Message::assistant("Protocol details..."),
        ]
    );
    assert!(!controller.is_pending());

    let request = server.await.unwrap();
    assert_eq!(request.request_line, "POST /chat/completions HTTP/1.1");
    assert_eq!(request.header("authorization"), Some("Bearer test-key"));
    assert_eq!(request.body["model"], "mistral-large-latest");
    assert_eq!(request.body["stream"], false);
    assert_eq!(request.body["max_tokens"], 1000);
    assert_eq!(request.body["messages"][0]["role"], "system");
    assert_eq!(request.body["messages"][1]["role"], "user");
    assert_eq!(
        request.body["messages"][1]["content"],
        "What is the protocol for X?"
    );
}

#[tokio::test]
async fn openai_compatible_stream_is_concatenated() {
    let body = [
        r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
        "",
        r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#,
        "",
        r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#,
        "",
        "data: [DONE]",
        "",
        "",
    ]
    .join("\n");
    let (base_url, server) = serve_once(200, "text/event-stream", body).await;
    let adapter = adapter(mistral(), &base_url, TransportMode::Stream);

    let text = adapter
        .generate(&[Message::user("greet me")])
        .await
        .unwrap();

    assert_eq!(text, "Hello");
    let request = server.await.unwrap();
    assert_eq!(request.body["stream"], true);
}

#[tokio::test]
async fn anthropic_stream_uses_messages_endpoint() {
    let body = [
        "event: message_start",
        r#"data: {"type":"message_start","message":{"id":"msg_1"}}"#,
        "",
        "event: content_block_delta",
        r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Root canal "}}"#,
        "",
        "event: content_block_delta",
        r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"therapy."}}"#,
        "",
        "event: message_stop",
        r#"data: {"type":"message_stop"}"#,
        "",
    ]
    .join("\n");
    let (base_url, server) = serve_once(200, "text/event-stream", body).await;
    let adapter = adapter(
        Box::new(AnthropicProvider::new()),
        &base_url,
        TransportMode::Stream,
    );

    let conversation = [
        Message::user("first"),
        Message::assistant("answer"),
        Message::user("Treatment for irreversible pulpitis?"),
    ];
    let text = adapter.generate(&conversation).await.unwrap();

    assert_eq!(text, "Root canal therapy.");
    let request = server.await.unwrap();
    assert_eq!(request.request_line, "POST /messages HTTP/1.1");
    assert_eq!(request.header("x-api-key"), Some("test-key"));
    assert_eq!(request.header("anthropic-version"), Some("2023-06-01"));
    assert_eq!(request.body["system"], "You are a dental clinical assistant.");
    let messages = request.body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| m["role"] != "system"));
}

#[tokio::test]
async fn anthropic_batch_joins_text_blocks() {
    let reply = r#"{"id":"msg_1","type":"message","role":"assistant","content":[{"type":"text","text":"Use a rubber dam. "},{"type":"text","text":"Irrigate with NaOCl."}],"stop_reason":"end_turn"}"#;
    let (base_url, server) = serve_once(200, "application/json", reply.to_string()).await;
    let controller = ChatController::new(Box::new(adapter(
        Box::new(AnthropicProvider::new()),
        &base_url,
        TransportMode::Batch,
    )));

    let outcome = controller.submit("Isolation for endodontic access?").await;

    assert_eq!(
        outcome,
        SubmitOutcome::Answered("Use a rubber dam. Irrigate with NaOCl.".to_string())
    );
    let request = server.await.unwrap();
    assert_eq!(request.request_line, "POST /messages HTTP/1.1");
    assert_eq!(request.body["stream"], false);
    assert_eq!(request.body["model"], "claude-3-opus-20240229");
    assert_eq!(request.body["max_tokens"], 1000);
}

#[tokio::test]
async fn anthropic_batch_without_content_is_empty_response() {
    let reply = r#"{"id":"msg_2","type":"message","role":"assistant","content":[],"stop_reason":"end_turn"}"#;
    let (base_url, server) = serve_once(200, "application/json", reply.to_string()).await;
    let adapter = adapter(
        Box::new(AnthropicProvider::new()),
        &base_url,
        TransportMode::Batch,
    );

    let err = adapter.generate(&[Message::user("q")]).await.unwrap_err();

    assert_eq!(err, GenerateError::EmptyResponse { provider: Provider::Anthropic });
    server.await.unwrap();
}

#[tokio::test]
async fn http_statuses_map_to_the_error_taxonomy() {
    let cases = [
        (
            401,
            r#"{"error":{"message":"Incorrect API key provided"}}"#,
            GenerateError::Auth { provider: Provider::Mistral },
        ),
        (
            429,
            r#"{"message":"Requests rate limit exceeded"}"#,
            GenerateError::RateLimit { provider: Provider::Mistral },
        ),
        (
            503,
            "upstream unavailable",
            GenerateError::ProviderService { provider: Provider::Mistral },
        ),
    ];

    for (status, body, expected) in cases {
        let (base_url, server) = serve_once(status, "application/json", body.to_string()).await;
        let controller = ChatController::new(Box::new(adapter(
            mistral(),
            &base_url,
            TransportMode::Stream,
        )));

        let outcome = controller.submit("hello").await;

        assert_eq!(outcome, SubmitOutcome::Failed(expected.clone()), "status {status}");
        let messages = controller.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(controller.last_error(), Some(expected.user_message()));
        assert!(!controller.is_pending());
        server.await.unwrap();
    }
}

#[tokio::test]
async fn empty_batch_content_is_empty_response() {
    let reply = r#"{"choices":[{"message":{"role":"assistant","content":""}}]}"#;
    let (base_url, server) = serve_once(200, "application/json", reply.to_string()).await;
    let adapter = adapter(mistral(), &base_url, TransportMode::Batch);

    let err = adapter.generate(&[Message::user("q")]).await.unwrap_err();

    assert_eq!(err, GenerateError::EmptyResponse { provider: Provider::Mistral });
    server.await.unwrap();
}

#[tokio::test]
async fn missing_credential_never_reaches_the_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let adapter = ResponseAdapter::new(
        Box::new(OpenAICompatibleProvider::new(Provider::OpenAI)),
        settings(&base_url, None),
        "persona",
        TransportMode::Batch,
    );

    let err = adapter.generate(&[Message::user("q")]).await.unwrap_err();
    assert_eq!(err, GenerateError::Config { provider: Provider::OpenAI });

    let accepted = tokio::time::timeout(
        std::time::Duration::from_millis(100),
        listener.accept(),
    )
    .await;
    assert!(accepted.is_err(), "no connection should have been made");
}
