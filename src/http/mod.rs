//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → /sse, /messages/<id>   → transport
//!     → /health, /tools, /tool/* → local
//!     → everything else        → gitlab proxy → upstream
//! ```

pub mod server;

pub use server::HttpServer;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";
