//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Check URL and path shapes used to build routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("gitlab.base_url `{0}` is not an absolute http(s) URL")]
    BaseUrl(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("transport.base_path `{0}` must be empty or start with '/'")]
    BasePath(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let base_url = config.gitlab.base_url.trim();
    if !base_url.is_empty() {
        let valid = url::Url::parse(base_url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::BaseUrl(base_url.to_string()));
        }
    }

    if config.gitlab.timeout_secs == 0 {
        errors.push(ValidationError::Zero("gitlab.timeout_secs"));
    }
    if config.transport.heartbeat_interval_ms == 0 {
        errors.push(ValidationError::Zero("transport.heartbeat_interval_ms"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    let base_path = &config.transport.base_path;
    if !base_path.is_empty() && (!base_path.starts_with('/') || base_path.trim_end_matches('/').is_empty()) {
        errors.push(ValidationError::BasePath(base_path.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
