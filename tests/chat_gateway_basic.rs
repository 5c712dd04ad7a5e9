use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use llm_chat_gateway::http::{
    HttpBodyStream, HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport,
};
use llm_chat_gateway::metrics::{Endpoint, GatewayMetrics, Outcome, TokenKind};
use llm_chat_gateway::{
    ChannelSink, ChatGateway, ChatMessage, ChatRequest, FnSink, GatewayConfig, GatewayError,
    SinkError, StreamEvent, TokenUsage, build_gateway,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Canned reply served by [`RecordingTransport`].
enum Reply {
    Full { status: u16, body: String },
    Lines { status: u16, lines: Vec<String> },
    ReadError { lines: Vec<String> },
    Pending,
    Fail(String),
}

/// In-memory transport that records every request it receives.
struct RecordingTransport {
    reply: Reply,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }

    fn last_body(&self) -> Value {
        let requests = self.requests.lock().expect("lock");
        let request = requests.last().expect("a request was sent");
        serde_json::from_slice(&request.body).expect("json body")
    }

    fn record(&self, request: HttpRequest) {
        self.requests.lock().expect("lock").push(request);
    }
}

fn line_body(lines: &[String]) -> Vec<Result<Vec<u8>, GatewayError>> {
    lines
        .iter()
        .map(|line| Ok(format!("{line}\n").into_bytes()))
        .collect()
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, GatewayError> {
        self.record(request);
        match &self.reply {
            Reply::Full { status, body } => Ok(HttpResponse {
                status: *status,
                headers: Default::default(),
                body: body.clone().into_bytes(),
            }),
            Reply::Fail(message) => Err(GatewayError::transport(message.clone())),
            _ => panic!("unexpected non-streaming call"),
        }
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, GatewayError> {
        self.record(request);
        let (status, body) = match &self.reply {
            Reply::Lines { status, lines } => {
                let body: HttpBodyStream = Box::pin(stream::iter(line_body(lines)));
                (*status, body)
            }
            Reply::ReadError { lines } => {
                let mut chunks = line_body(lines);
                chunks.push(Err(GatewayError::transport("connection reset")));
                let body: HttpBodyStream = Box::pin(stream::iter(chunks));
                (200, body)
            }
            Reply::Pending => {
                let body: HttpBodyStream = Box::pin(stream::pending());
                (200, body)
            }
            Reply::Fail(message) => return Err(GatewayError::transport(message.clone())),
            Reply::Full { .. } => panic!("unexpected streaming call"),
        };
        Ok(HttpStreamResponse {
            status,
            headers: Default::default(),
            body,
        })
    }
}

fn gateway(transport: Arc<RecordingTransport>) -> (ChatGateway, Arc<GatewayMetrics>) {
    let metrics = Arc::new(GatewayMetrics::standalone().expect("metrics"));
    let config = GatewayConfig::new("test-key", "https://api.example.com");
    let gateway = build_gateway(Some(&config), transport, metrics.clone()).expect("gateway");
    (gateway, metrics)
}

fn request() -> ChatRequest {
    ChatRequest::new("session-1")
        .with_message(ChatMessage::system("be brief"))
        .with_message(ChatMessage::user("hello"))
        .with_message(ChatMessage::assistant("hi"))
        .with_message(ChatMessage::user("how are you?"))
}

fn delta(content: &str) -> String {
    format!(
        r#"data: {{"id":"c1","object":"chat.completion.chunk","created":1,"model":"deepseek-r1","choices":[{{"index":0,"delta":{{"content":"{content}"}},"finish_reason":null}}]}}"#
    )
}

fn done() -> String {
    "data: [DONE]".to_string()
}

const COMPLETION: &str = r#"{
    "id": "c1",
    "object": "chat.completion",
    "created": 1700000000,
    "model": "deepseek-r1",
    "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello!"}, "finish_reason": "stop"}],
    "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
}"#;

#[tokio::test]
async fn chat_returns_content_and_usage() {
    let transport = RecordingTransport::new(Reply::Full {
        status: 200,
        body: COMPLETION.to_string(),
    });
    let (gateway, metrics) = gateway(transport.clone());

    let response = gateway.chat(&request()).await.expect("chat");

    assert_eq!(response.session_id, "session-1");
    assert_eq!(response.content, "Hello!");
    assert_eq!(response.model, "deepseek-r1");
    assert_eq!(
        response.token_usage,
        Some(TokenUsage {
            prompt_tokens: 12,
            completion_tokens: 3,
            total_tokens: 15,
        })
    );
    assert_eq!(metrics.request_count(Endpoint::Chat, Outcome::Success), 1);
    assert_eq!(metrics.latency_sample_count(Endpoint::Chat), 1);
    assert_eq!(metrics.token_usage(TokenKind::Prompt), 12.0);
    assert_eq!(metrics.token_usage(TokenKind::Completion), 3.0);
    assert_eq!(metrics.token_usage(TokenKind::Total), 15.0);
}

#[tokio::test]
async fn chat_sends_messages_in_order_without_stream_flag() {
    let transport = RecordingTransport::new(Reply::Full {
        status: 200,
        body: COMPLETION.to_string(),
    });
    let (gateway, _) = gateway(transport.clone());

    gateway
        .chat(&request().with_temperature(0.5).with_max_tokens(0))
        .await
        .expect("chat");

    let body = transport.last_body();
    assert_eq!(body["model"], "deepseek-r1");
    assert_eq!(body["stream"], false);
    assert_eq!(body["temperature"], 0.5);
    assert!(body.get("max_tokens").is_none());
    let roles: Vec<&str> = body["messages"]
        .as_array()
        .expect("messages")
        .iter()
        .map(|m| m["role"].as_str().expect("role"))
        .collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert_eq!(body["messages"][3]["content"], "how are you?");
}

#[tokio::test]
async fn stream_request_sets_stream_flag() {
    let transport = RecordingTransport::new(Reply::Lines {
        status: 200,
        lines: vec![done()],
    });
    let (gateway, _) = gateway(transport.clone());
    let mut sink = FnSink::new(|_event: StreamEvent| Ok(()));

    gateway
        .stream_chat(&request(), &mut sink)
        .await
        .expect("stream");

    let body = transport.last_body();
    assert_eq!(body["stream"], true);
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn chat_vendor_error_counts_failure() {
    let transport = RecordingTransport::new(Reply::Full {
        status: 500,
        body: r#"{"error":{"message":"overloaded"}}"#.to_string(),
    });
    let (gateway, metrics) = gateway(transport);

    let err = gateway.chat(&request()).await.expect_err("should fail");

    match &err {
        GatewayError::Vendor { status, body } => {
            assert_eq!(*status, 500);
            assert!(body.contains("overloaded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.vendor_message().as_deref(), Some("overloaded"));
    assert_eq!(metrics.request_count(Endpoint::Chat, Outcome::Error), 1);
    assert_eq!(metrics.request_count(Endpoint::Chat, Outcome::Success), 0);
    assert_eq!(metrics.latency_sample_count(Endpoint::Chat), 0);
}

#[tokio::test]
async fn chat_malformed_body_is_decoding_error() {
    let transport = RecordingTransport::new(Reply::Full {
        status: 200,
        body: "not json".to_string(),
    });
    let (gateway, metrics) = gateway(transport);

    let err = gateway.chat(&request()).await.expect_err("should fail");

    assert!(matches!(err, GatewayError::Decoding { .. }), "unexpected: {err:?}");
    assert_eq!(metrics.request_count(Endpoint::Chat, Outcome::Error), 1);
}

#[tokio::test]
async fn chat_empty_choices_yield_empty_content() {
    let transport = RecordingTransport::new(Reply::Full {
        status: 200,
        body: r#"{"model":"deepseek-r1","choices":[]}"#.to_string(),
    });
    let (gateway, _) = gateway(transport);

    let response = gateway.chat(&request()).await.expect("chat");

    assert_eq!(response.content, "");
    assert_eq!(response.token_usage, Some(TokenUsage::default()));
}

#[tokio::test]
async fn chat_transport_failure_is_counted() {
    let transport = RecordingTransport::new(Reply::Fail("connection refused".to_string()));
    let (gateway, metrics) = gateway(transport);

    let err = gateway.chat(&request()).await.expect_err("should fail");

    assert!(matches!(err, GatewayError::Transport { .. }));
    assert_eq!(metrics.request_count(Endpoint::Chat, Outcome::Error), 1);
}

#[tokio::test]
async fn stream_delivers_every_chunk_in_order() {
    let transport = RecordingTransport::new(Reply::Lines {
        status: 200,
        lines: vec![delta("Hel"), delta("lo"), delta("!"), done()],
    });
    let (gateway, metrics) = gateway(transport);
    let mut seen = Vec::new();
    let mut sink = FnSink::new(|event: StreamEvent| {
        seen.push(event);
        Ok(())
    });

    gateway
        .stream_chat(&request(), &mut sink)
        .await
        .expect("stream");
    drop(sink);

    let contents: Vec<&str> = seen.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["Hel", "lo", "!"]);
    assert!(
        seen.iter()
            .all(|e| e.session_id == "session-1" && e.model == "deepseek-r1")
    );
    assert_eq!(metrics.request_count(Endpoint::StreamChat, Outcome::Success), 1);
    assert_eq!(metrics.latency_sample_count(Endpoint::StreamChat), 1);
    assert_eq!(metrics.token_usage(TokenKind::Total), 0.0);
}

#[tokio::test]
async fn stream_sink_failure_aborts_after_second_chunk() {
    let transport = RecordingTransport::new(Reply::Lines {
        status: 200,
        lines: vec![delta("a"), delta("b"), delta("c"), done()],
    });
    let (gateway, metrics) = gateway(transport);
    let mut calls = 0;
    let mut sink = FnSink::new(|_event: StreamEvent| {
        calls += 1;
        if calls == 2 {
            Err(SinkError::new("client went away"))
        } else {
            Ok(())
        }
    });

    let err = gateway
        .stream_chat(&request(), &mut sink)
        .await
        .expect_err("should abort");
    drop(sink);

    assert_eq!(calls, 2);
    match err {
        GatewayError::SinkAbort { source } => assert_eq!(source.message(), "client went away"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(metrics.request_count(Endpoint::StreamChat, Outcome::Error), 1);
    assert_eq!(metrics.request_count(Endpoint::StreamChat, Outcome::Success), 0);
}

#[tokio::test]
async fn stream_skips_malformed_chunk() {
    let transport = RecordingTransport::new(Reply::Lines {
        status: 200,
        lines: vec![
            delta("a"),
            "data: {\"choices\": [".to_string(),
            delta("b"),
            done(),
        ],
    });
    let (gateway, metrics) = gateway(transport);
    let mut seen = Vec::new();
    let mut sink = FnSink::new(|event: StreamEvent| {
        seen.push(event.content);
        Ok(())
    });

    gateway
        .stream_chat(&request(), &mut sink)
        .await
        .expect("stream");
    drop(sink);

    assert_eq!(seen, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(metrics.request_count(Endpoint::StreamChat, Outcome::Success), 1);
}

#[tokio::test]
async fn stream_vendor_error_delivers_nothing() {
    let transport = RecordingTransport::new(Reply::Lines {
        status: 401,
        lines: vec![r#"{"error":{"message":"bad key"}}"#.to_string()],
    });
    let (gateway, metrics) = gateway(transport);
    let mut sink = FnSink::new(|_event: StreamEvent| -> Result<(), SinkError> {
        panic!("sink must not be called")
    });

    let err = gateway
        .stream_chat(&request(), &mut sink)
        .await
        .expect_err("should fail");

    match err {
        GatewayError::Vendor { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("bad key"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(metrics.request_count(Endpoint::StreamChat, Outcome::Error), 1);
    assert_eq!(metrics.latency_sample_count(Endpoint::StreamChat), 0);
}

#[tokio::test]
async fn stream_read_error_keeps_delivered_events() {
    let transport = RecordingTransport::new(Reply::ReadError {
        lines: vec![delta("a")],
    });
    let (gateway, metrics) = gateway(transport);
    let mut seen = Vec::new();
    let mut sink = FnSink::new(|event: StreamEvent| {
        seen.push(event.content);
        Ok(())
    });

    let err = gateway
        .stream_chat(&request(), &mut sink)
        .await
        .expect_err("should fail");
    drop(sink);

    assert!(matches!(err, GatewayError::Transport { .. }));
    assert_eq!(seen, vec!["a".to_string()]);
    assert_eq!(metrics.request_count(Endpoint::StreamChat, Outcome::Error), 1);
}

#[tokio::test]
async fn stream_into_channel_sink() {
    let transport = RecordingTransport::new(Reply::Lines {
        status: 200,
        lines: vec![delta("x"), delta("y"), done()],
    });
    let (gateway, _) = gateway(transport);
    let (mut sink, mut receiver) = ChannelSink::channel(8);

    gateway
        .stream_chat(&request(), &mut sink)
        .await
        .expect("stream");
    drop(sink);

    let mut contents = Vec::new();
    while let Some(event) = receiver.recv().await {
        contents.push(event.content);
    }
    assert_eq!(contents, vec!["x".to_string(), "y".to_string()]);
}

#[tokio::test]
async fn cancelling_a_stalled_stream_returns_transport_error() {
    let transport = RecordingTransport::new(Reply::Pending);
    let (gateway, metrics) = gateway(transport);
    let cancel = CancellationToken::new();
    let mut sink = FnSink::new(|_event: StreamEvent| Ok(()));

    let trigger = cancel.clone();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = gateway
        .stream_chat_cancellable(&request(), &mut sink, &cancel)
        .await
        .expect_err("should be cancelled");
    canceller.await.expect("canceller");

    assert!(matches!(err, GatewayError::Transport { ref message } if message.contains("cancelled")));
    assert_eq!(metrics.request_count(Endpoint::StreamChat, Outcome::Error), 1);
}

#[tokio::test]
async fn uninitialized_gateway_makes_no_http_calls() {
    let transport = RecordingTransport::new(Reply::Fail("unreachable".to_string()));
    let metrics = Arc::new(GatewayMetrics::standalone().expect("metrics"));
    let gateway = build_gateway(None, transport.clone(), metrics.clone()).expect("gateway");

    let err = gateway.chat(&request()).await.expect_err("should fail");
    assert!(matches!(err, GatewayError::NotInitialized));

    let mut sink = FnSink::new(|_event: StreamEvent| Ok(()));
    let err = gateway
        .stream_chat(&request(), &mut sink)
        .await
        .expect_err("should fail");
    assert!(matches!(err, GatewayError::NotInitialized));

    assert_eq!(transport.calls(), 0);
    assert_eq!(metrics.request_count(Endpoint::Chat, Outcome::Error), 0);
    assert_eq!(metrics.request_count(Endpoint::StreamChat, Outcome::Error), 0);
}
