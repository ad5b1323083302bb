//! SSE channel and message injection handlers.
//!
//! # Wire Format
//! ```text
//! GET /sse
//!     event: endpoint\ndata: /messages/<id>\n\n      (once, first)
//!     : keep-alive <unix-millis>\n\n                 (every heartbeat interval)
//!     event: message\ndata: <json>\n\n               (per successful injection)
//!
//! POST /messages/<id>   body: JSON
//!     202 (or 204) empty body                       session open
//!     404 {"error":"session not found"}             otherwise
//! ```

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::{AckStatus, TransportConfig};
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::transport::lifecycle::{SessionStream, StreamLifecycle};
use crate::transport::registry::{SessionId, SessionRegistry};

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// State shared by the transport handlers.
#[derive(Clone)]
pub struct TransportState {
    pub registry: SessionRegistry,
    pub heartbeat_interval: Duration,
    pub ack_status: StatusCode,
    pub base_path: String,
}

impl TransportState {
    pub fn new(registry: SessionRegistry, config: &TransportConfig) -> Self {
        let ack_status = match config.ack_status {
            AckStatus::Accepted => StatusCode::ACCEPTED,
            AckStatus::NoContent => StatusCode::NO_CONTENT,
        };

        Self {
            registry,
            heartbeat_interval: Duration::from_millis(config.heartbeat_interval_ms),
            ack_status,
            base_path: config.base_path.trim_end_matches('/').to_string(),
        }
    }

    /// Path a client must POST to in order to reach `id`.
    pub fn endpoint_for(&self, id: &SessionId) -> String {
        format!("{}/messages/{}", self.base_path, id)
    }
}

/// Open a new long-lived event stream.
pub async fn sse_handler(State(state): State<TransportState>) -> Result<Response, GatewayError> {
    let id = SessionId::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let heartbeat_queue = tx.downgrade();

    state.registry.register(id.clone(), tx)?;

    let endpoint = state.endpoint_for(&id);
    let handshake = Event::default().event("endpoint").data(&endpoint);
    let lifecycle = StreamLifecycle::start(
        id.clone(),
        state.registry.clone(),
        heartbeat_queue,
        state.heartbeat_interval,
    );

    tracing::info!(session_id = %id, endpoint = %endpoint, "SSE session opened");

    let headers = [
        (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        (header::CONNECTION, HeaderValue::from_static("keep-alive")),
        (X_ACCEL_BUFFERING, HeaderValue::from_static("no")),
    ];

    Ok((headers, Sse::new(SessionStream::new(lifecycle, handshake, rx))).into_response())
}

/// Inject one JSON message into an open session's stream.
///
/// The session is checked before the body, so an unknown id is a 404 even
/// when the body is malformed.
pub async fn message_handler(
    State(state): State<TransportState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, GatewayError> {
    let id = SessionId::from(session_id);
    if state.registry.lookup(&id).is_none() {
        metrics::record_injection("unknown_session");
        tracing::debug!(session_id = %id, "Injection target not found");
        return Err(GatewayError::SessionNotFound);
    }

    let payload: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            metrics::record_injection("invalid");
            tracing::debug!(session_id = %id, error = %e, "Rejected injected message");
            GatewayError::InvalidJson
        })?
    };

    let event = Event::default().event("message").data(payload.to_string());

    // The session may have closed since the lookup; deliver re-checks.
    match state.registry.deliver(&id, event) {
        Ok(()) => {
            metrics::record_injection("delivered");
            tracing::debug!(session_id = %id, "Message injected");
            Ok(state.ack_status)
        }
        Err(e) => {
            metrics::record_injection("unknown_session");
            tracing::debug!(session_id = %id, "Session closed before delivery");
            Err(e.into())
        }
    }
}
