//! GitLab gateway with an SSE session transport and local tools.

pub mod config;
pub mod error;
pub mod gitlab;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod tools;
pub mod transport;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use transport::{SessionId, SessionRegistry};
