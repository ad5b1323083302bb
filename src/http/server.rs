//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with transport, GitLab, tool and health routes
//! - Wire up middleware (tracing, request ID, body limit, timeout)
//! - Bind server to listener
//! - Clear the session registry on shutdown so open streams end

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, Router};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::gitlab::{self, GitLabClient, UpstreamError};
use crate::lifecycle::ShutdownSignal;
use crate::tools::{self, ToolFilter};
use crate::transport::{self, SessionRegistry, TransportState};

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    sessions: SessionRegistry,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, UpstreamError> {
        let sessions = SessionRegistry::new();
        let client = Arc::new(GitLabClient::new(&config.gitlab)?);

        if !client.is_configured() {
            tracing::warn!("gitlab.base_url is empty; proxy routes will answer 503");
        }

        let router = Self::build_router(&config, sessions.clone(), client);
        Ok(Self {
            router,
            config,
            sessions,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, sessions: SessionRegistry, client: Arc<GitLabClient>) -> Router {
        let transport = transport::routes(TransportState::new(sessions, &config.transport));

        // The timeout must never wrap /sse, which stays open indefinitely.
        let proxy = gitlab::routes(client)
            .merge(gitlab::health_routes())
            .merge(tools::routes(&ToolFilter::from(&config.tools)))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .merge(transport)
            .merge(proxy)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Registry of open SSE sessions.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let sessions = self.sessions.clone();
        let signal = async move {
            shutdown.recv().await;
            tracing::info!(sessions = sessions.len(), "Closing open SSE sessions");
            sessions.clear();
        };

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        self.sessions.clear();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
