//! Per-session stream lifecycle.
//!
//! # Responsibilities
//! - Run the keep-alive heartbeat for one open stream
//! - Tear the session down exactly once (unregister, then stop heartbeat)
//! - Expose the session's event queue as the SSE response body
//!
//! # Data Flow
//! ```text
//! heartbeat task ──┐
//!                  ├──▶ mpsc queue ──▶ SessionStream ──▶ hyper body
//! injection ───────┘  (registry)          │
//!                                         └─ dropped on disconnect ─▶ close()
//! ```
//!
//! The heartbeat only holds a weak handle to the queue. Once the registry
//! entry is gone the queue has no writers left, the stream ends, and the
//! connection can finish. This is what lets graceful shutdown complete.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::response::sse::Event;
use futures_util::Stream;
use tokio::sync::mpsc::{UnboundedReceiver, WeakUnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::observability::metrics;
use crate::transport::registry::{SessionId, SessionRegistry};

/// Interval between keep-alive comments.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(15_000);

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closing,
    Closed,
}

/// Build a keep-alive comment stamped with the current unix time in millis.
pub fn heartbeat_event() -> Event {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    Event::default().comment(format!("keep-alive {millis}"))
}

/// Owns the heartbeat and teardown of one registered session.
pub struct StreamLifecycle {
    id: SessionId,
    registry: SessionRegistry,
    heartbeat: Option<JoinHandle<()>>,
    state: SessionState,
}

impl StreamLifecycle {
    /// Start the heartbeat for an already registered session.
    pub fn start(
        id: SessionId,
        registry: SessionRegistry,
        queue: WeakUnboundedSender<Event>,
        interval: Duration,
    ) -> Self {
        let heartbeat = tokio::spawn(run_heartbeat(
            id.clone(),
            registry.clone(),
            queue,
            interval,
        ));

        metrics::record_session_opened();

        Self {
            id,
            registry,
            heartbeat: Some(heartbeat),
            state: SessionState::Open,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Tear the session down. Calling this more than once is a no-op.
    ///
    /// The registry entry is removed before the heartbeat is stopped, so an
    /// injection racing with teardown sees "not found" instead of a queue
    /// that is about to be dropped.
    pub fn close(&mut self) {
        if self.state != SessionState::Open {
            return;
        }
        self.state = SessionState::Closing;

        self.registry.unregister(&self.id);
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }

        self.state = SessionState::Closed;
        metrics::record_session_closed();
        tracing::info!(session_id = %self.id, "SSE session closed");
    }
}

impl Drop for StreamLifecycle {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_heartbeat(
    id: SessionId,
    registry: SessionRegistry,
    queue: WeakUnboundedSender<Event>,
    interval: Duration,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(queue) = queue.upgrade() else {
            tracing::debug!(session_id = %id, "Session unregistered, stopping heartbeat");
            break;
        };

        if queue.send(heartbeat_event()).is_err() {
            // Client vanished before the close signal reached us.
            tracing::debug!(session_id = %id, "Heartbeat write failed, tearing down session");
            registry.unregister(&id);
            break;
        }
        metrics::record_heartbeat();
    }
}

/// SSE body for one session: the handshake, then whatever the queue carries.
///
/// Dropping the stream is the connection-close signal and runs teardown.
pub struct SessionStream {
    // Declared first so teardown runs before the queue is dropped.
    lifecycle: StreamLifecycle,
    handshake: Option<Event>,
    events: UnboundedReceiver<Event>,
}

impl SessionStream {
    pub fn new(lifecycle: StreamLifecycle, handshake: Event, events: UnboundedReceiver<Event>) -> Self {
        Self {
            lifecycle,
            handshake: Some(handshake),
            events,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        self.lifecycle.id()
    }
}

impl Stream for SessionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(handshake) = self.handshake.take() {
            return Poll::Ready(Some(Ok(handshake)));
        }

        match self.events.poll_recv(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Ok(event))),
            Poll::Ready(None) => {
                self.lifecycle.close();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
