//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use gitlab_sse_gateway::config::GatewayConfig;
use gitlab_sse_gateway::http::HttpServer;
use gitlab_sse_gateway::lifecycle::Shutdown;
use gitlab_sse_gateway::transport::SessionRegistry;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// A gateway running on an ephemeral local port.
pub struct Gateway {
    pub addr: SocketAddr,
    pub sessions: SessionRegistry,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn_gateway(config: GatewayConfig) -> Gateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).unwrap();
    let sessions = server.sessions().clone();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    Gateway {
        addr,
        sessions,
        shutdown,
        task,
    }
}

/// Fresh client per caller, so dropping a response really closes its connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// One request as the mock GitLab saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub token: Option<String>,
    pub request_id: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone)]
enum Reply {
    Empty,
    Json(Value),
    Raw(&'static str, Vec<u8>),
}

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<Recorded>>>,
    status: StatusCode,
    reply: Reply,
}

/// Upstream stand-in that records every request and answers with a fixed reply.
pub struct MockGitLab {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockGitLab {
    /// `Value::Null` as the reply means an empty body.
    pub async fn start(status: StatusCode, reply: Value) -> Self {
        let reply = if reply.is_null() {
            Reply::Empty
        } else {
            Reply::Json(reply)
        };
        Self::serve(status, reply).await
    }

    /// Answer every request with `body` labelled as `content_type`.
    pub async fn start_raw(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Self {
        Self::serve(status, Reply::Raw(content_type, body)).await
    }

    async fn serve(status: StatusCode, reply: Reply) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            requests: requests.clone(),
            status,
            reply,
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().fallback(record).with_state(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api/v4", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.requests().pop().expect("mock gitlab saw no requests")
    }
}

async fn record(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    state.requests.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_owned),
        token: header("private-token"),
        request_id: header("x-request-id"),
        body: serde_json::from_slice(&body).ok(),
    });

    match state.reply {
        Reply::Empty => state.status.into_response(),
        Reply::Json(value) => (state.status, Json(value)).into_response(),
        Reply::Raw(content_type, body) => {
            (state.status, [("content-type", content_type)], body).into_response()
        }
    }
}

/// One parsed SSE frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub event: Option<String>,
    pub data: String,
    pub comment: Option<String>,
}

impl Frame {
    /// Strict parse: field prefixes must carry exactly one space.
    fn parse(raw: &str) -> Self {
        let mut frame = Frame::default();
        for line in raw.lines() {
            if let Some(comment) = line.strip_prefix(": ") {
                frame.comment = Some(comment.to_string());
            } else if let Some(event) = line.strip_prefix("event: ") {
                frame.event = Some(event.to_string());
            } else if let Some(data) = line.strip_prefix("data: ") {
                if !frame.data.is_empty() {
                    frame.data.push('\n');
                }
                frame.data.push_str(data);
            } else if !line.is_empty() {
                panic!("unexpected SSE line {line:?}");
            }
        }
        frame
    }

    pub fn is_comment(&self) -> bool {
        self.event.is_none() && self.comment.is_some()
    }
}

/// Incremental reader over an open `/sse` response.
pub struct SseReader {
    pub headers: reqwest::header::HeaderMap,
    response: reqwest::Response,
    buffer: Vec<u8>,
}

impl SseReader {
    pub async fn open(url: &str) -> Self {
        let response = client()
            .get(url)
            .header("accept", "text/event-stream")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        Self {
            headers: response.headers().clone(),
            response,
            buffer: Vec::new(),
        }
    }

    /// Next frame exactly as sent, terminating blank line included.
    pub async fn next_raw_frame(&mut self) -> Option<String> {
        loop {
            if let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
                let raw: Vec<u8> = self.buffer.drain(..pos + 2).collect();
                return Some(String::from_utf8(raw).expect("SSE frame is not UTF-8"));
            }

            let chunk = tokio::time::timeout(FRAME_TIMEOUT, self.response.chunk())
                .await
                .expect("timed out waiting for an SSE frame");
            match chunk {
                Ok(Some(bytes)) => self.buffer.extend_from_slice(&bytes),
                _ => return None,
            }
        }
    }

    /// Next frame of any kind, or `None` once the stream has ended.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.next_raw_frame().await.map(|raw| Frame::parse(&raw))
    }

    /// Next named event, skipping keep-alive comments.
    pub async fn next_event(&mut self) -> Option<Frame> {
        loop {
            let frame = self.next_frame().await?;
            if !frame.is_comment() {
                return Some(frame);
            }
        }
    }

    /// Read the handshake, which must be the first frame, and return the
    /// advertised injection path.
    pub async fn endpoint(&mut self) -> String {
        let frame = self.next_frame().await.expect("stream ended before handshake");
        assert_eq!(frame.event.as_deref(), Some("endpoint"), "first frame was {frame:?}");
        frame.data
    }
}

/// Whether `raw` is exactly one keep-alive comment frame.
pub fn is_keep_alive_frame(raw: &str) -> bool {
    raw.strip_prefix(": keep-alive ")
        .and_then(|rest| rest.strip_suffix("\n\n"))
        .is_some_and(|millis| !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit()))
}
