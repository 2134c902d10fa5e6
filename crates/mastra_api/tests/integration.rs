use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use mastra_api::events::MastraStreamEvent;
use mastra_api::{AgentStreamRequest, MastraApiClient, MastraApiConfig, MastraApiError};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

fn allow_local_integration() -> bool {
    std::env::var("MASTRA_API_ALLOW_LOCAL_INTEGRATION")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

#[derive(Clone)]
struct ResponseChunk {
    delay_ms: u64,
    bytes: Vec<u8>,
}

#[derive(Clone)]
struct ScriptedResponse {
    status: u16,
    content_type: &'static str,
    chunks: Vec<ResponseChunk>,
}

struct ScriptedServer {
    base_url: String,
    request_count: Arc<AtomicUsize>,
    request_heads: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let request_count = Arc::new(AtomicUsize::new(0));
        let request_heads = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn({
            let scripts = Arc::clone(&scripts);
            let request_count = Arc::clone(&request_count);
            let request_heads = Arc::clone(&request_heads);

            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let scripts = Arc::clone(&scripts);
                    let request_count = Arc::clone(&request_count);
                    let request_heads = Arc::clone(&request_heads);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, request_count, request_heads).await;
                    });
                }
            }
        });

        Self {
            base_url,
            request_count,
            request_heads,
            handle,
        }
    }

    fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Acquire)
    }

    fn request_heads(&self) -> Vec<String> {
        self.request_heads.lock().expect("request log").clone()
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

fn response_sse(status: u16, frames: &[&str]) -> ScriptedResponse {
    ScriptedResponse {
        status,
        content_type: "text/event-stream",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: sse_frames(frames),
        }],
    }
}

fn response_json(status: u16, body: &str) -> ScriptedResponse {
    ScriptedResponse {
        status,
        content_type: "application/json",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: body.as_bytes().to_vec(),
        }],
    }
}

fn sse_frames(frames: &[&str]) -> Vec<u8> {
    let mut body = String::new();

    for frame in frames {
        body.push_str("data: ");
        body.push_str(frame);
        body.push_str("\n\n");
    }

    body.into_bytes()
}

fn weather_request() -> AgentStreamRequest {
    AgentStreamRequest::new("weather-agent", json!("what is the weather in London?"))
        .with_memory("1", "booker")
}

#[tokio::test]
async fn stream_integration_collects_events_until_done() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![response_sse(
        200,
        &[
            r##"{"type":"text-delta","runId":"r1","payload":{"text":"Checking"}}"##,
            r##"{"type":"tool-call","runId":"r1","payload":{"toolCallId":"c1","toolName":"weatherTool","args":{"location":"London"}}}"##,
            r##"{"type":"finish","runId":"r1","payload":{"stepResult":{"reason":"stop"}}}"##,
            "[DONE]",
            r##"{"type":"text-delta","runId":"r1","payload":{"text":"ignored"}}"##,
        ],
    )])
    .await;

    let client = MastraApiClient::new(MastraApiConfig::new(&server.base_url)).expect("client");

    let result = client
        .stream(&weather_request(), None)
        .await
        .expect("stream should succeed");

    assert_eq!(result.finish_reason.as_deref(), Some("stop"));
    assert_eq!(result.events.len(), 3);
    assert!(matches!(
        result.events[1],
        MastraStreamEvent::ToolCall { .. }
    ));
    assert_eq!(server.request_count(), 1);
    assert!(server.request_heads()[0].starts_with("POST /api/agents/weather-agent/stream "));

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_http_error_is_not_retried() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![
        response_json(503, r##"{"error":{"message":"overloaded"}}"##),
        response_sse(200, &["[DONE]"]),
    ])
    .await;

    let client = MastraApiClient::new(MastraApiConfig::new(&server.base_url)).expect("client");

    let error = client
        .stream(&weather_request(), None)
        .await
        .expect_err("503 should fail");

    assert!(matches!(
        error,
        MastraApiError::Status(status, ref message) if status.as_u16() == 503 && message == "overloaded"
    ));
    assert_eq!(server.request_count(), 1);

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_error_chunk_fails_stream() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![response_sse(
        200,
        &[
            r##"{"type":"text-delta","runId":"r1","payload":{"text":"partial"}}"##,
            r##"{"type":"error","runId":"r1","payload":{"error":{"message":"tool crashed"}}}"##,
        ],
    )])
    .await;

    let client = MastraApiClient::new(MastraApiConfig::new(&server.base_url)).expect("client");
    let mut seen = Vec::new();

    let error = client
        .stream_with_handler(&weather_request(), None, |event| seen.push(event))
        .await
        .expect_err("error chunk should fail the stream");

    assert_eq!(seen.len(), 1);
    assert!(matches!(error, MastraApiError::StreamFailed { ref message } if message == "tool crashed"));

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_sends_bearer_token() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![response_sse(200, &["[DONE]"])]).await;
    let config = MastraApiConfig::new(&server.base_url).with_api_key("secret");
    let client = MastraApiClient::new(config).expect("client");

    client
        .stream(&weather_request(), None)
        .await
        .expect("stream should succeed");

    let head = server.request_heads()[0].to_ascii_lowercase();
    assert!(head.contains("authorization: bearer secret"));
    assert!(head.contains("accept: text/event-stream"));

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_cancellation_interrupts_slow_stream() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![ScriptedResponse {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![
            ResponseChunk {
                delay_ms: 0,
                bytes: sse_frames(&[r##"{"type":"text-delta","runId":"r","payload":{"text":"a"}}"##]),
            },
            ResponseChunk {
                delay_ms: 5_000,
                bytes: sse_frames(&["[DONE]"]),
            },
        ],
    }])
    .await;

    let client = MastraApiClient::new(MastraApiConfig::new(&server.base_url)).expect("client");
    let cancel = Arc::new(AtomicBool::new(false));
    let mut events = client
        .open_stream(&weather_request(), Some(Arc::clone(&cancel)))
        .await
        .expect("stream should open");

    assert!(matches!(
        events.next_event().await,
        Some(Ok(MastraStreamEvent::TextDelta { .. }))
    ));

    cancel.store(true, Ordering::SeqCst);
    let next = timeout(Duration::from_secs(1), events.next_event())
        .await
        .expect("cancellation should be observed promptly");
    assert!(matches!(next, Some(Err(MastraApiError::Cancelled))));

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_timeout_bounds_idle_gaps_not_total_duration() {
    if !allow_local_integration() {
        return;
    }

    let body = sse_frames(&[
        r##"{"type":"text-delta","runId":"r","payload":{"text":"14°C and "}}"##,
        r##"{"type":"text-delta","runId":"r","payload":{"text":"cloudy"}}"##,
        "[DONE]",
    ]);
    let chunks = body
        .chunks(24)
        .map(|bytes| ResponseChunk {
            delay_ms: 100,
            bytes: bytes.to_vec(),
        })
        .collect::<Vec<_>>();
    assert!(chunks.len() >= 4);

    let server = ScriptedServer::new(vec![ScriptedResponse {
        status: 200,
        content_type: "text/event-stream",
        chunks,
    }])
    .await;

    let config =
        MastraApiConfig::new(&server.base_url).with_timeout(Duration::from_millis(300));
    let client = MastraApiClient::new(config).expect("client");

    let result = client
        .stream(&weather_request(), None)
        .await
        .expect("a steadily producing stream should outlive the timeout");

    let text: String = result
        .events
        .iter()
        .filter_map(|event| match event {
            MastraStreamEvent::TextDelta { text, .. } => text.clone(),
            _ => None,
        })
        .collect();
    assert_eq!(text, "14°C and cloudy");

    server.shutdown();
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    request_count: Arc<AtomicUsize>,
    request_heads: Arc<Mutex<Vec<String>>>,
) {
    let Ok(head) = read_request_head(&mut socket).await else {
        return;
    };
    request_heads.lock().expect("request log").push(head);

    let index = request_count.fetch_add(1, Ordering::AcqRel);
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| response_json(500, r##"{"error":"unexpected request"}"##));

    let headers = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        response.status,
        status_reason(response.status),
        response.content_type,
    );

    if socket.write_all(headers.as_bytes()).await.is_err() {
        return;
    }

    for chunk in response.chunks {
        if chunk.delay_ms > 0 {
            sleep(Duration::from_millis(chunk.delay_ms)).await;
        }
        let prefix = format!("{:X}\r\n", chunk.bytes.len());
        if socket.write_all(prefix.as_bytes()).await.is_err() {
            return;
        }
        if socket.write_all(&chunk.bytes).await.is_err() {
            return;
        }
        if socket.write_all(b"\r\n").await.is_err() {
            return;
        }
    }

    let _ = socket.write_all(b"0\r\n\r\n").await;
    let _ = socket.shutdown().await;
}

async fn read_request_head(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
        if request.windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&request).into_owned())
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
