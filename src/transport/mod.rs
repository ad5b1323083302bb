//! SSE session transport.
//!
//! # Data Flow
//! ```text
//! GET /sse
//!     → handlers.rs (mint id, register, handshake)
//!     → lifecycle.rs (heartbeat, SessionStream body)
//!     → registry.rs (id → queue)
//!
//! POST /messages/<id>  (any connection, any peer)
//!     → handlers.rs (parse JSON)
//!     → registry.rs deliver → queue → original stream
//!
//! Disconnect
//!     → SessionStream dropped → lifecycle close → unregister + stop heartbeat
//! ```

pub mod handlers;
pub mod lifecycle;
pub mod registry;

use axum::{
    routing::{get, post},
    Router,
};

pub use handlers::TransportState;
pub use lifecycle::{SessionState, SessionStream, StreamLifecycle, DEFAULT_HEARTBEAT_INTERVAL};
pub use registry::{DeliveryError, RegistryError, SessionHandle, SessionId, SessionRegistry};

/// Routes for the stream and injection endpoints.
pub fn routes(state: TransportState) -> Router {
    let router = Router::new()
        .route("/sse", get(handlers::sse_handler))
        .route("/messages/{session_id}", post(handlers::message_handler))
        .with_state(state.clone());

    if state.base_path.is_empty() {
        router
    } else {
        Router::new().nest(&state.base_path, router)
    }
}
