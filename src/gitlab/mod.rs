//! GitLab pass-through proxy.
//!
//! # Data Flow
//! ```text
//! local route (routes.rs)
//!     → path template + percent-encoded captures
//!     → client.rs (one reqwest round trip, PRIVATE-TOKEN)
//!     → upstream status, content type and body bytes relayed unmodified
//! ```

pub mod client;
pub mod routes;

pub use client::{GitLabClient, UpstreamError, UpstreamRequest, UpstreamResponse};
pub use routes::{health_routes, routes, Mapping, ROUTES};
