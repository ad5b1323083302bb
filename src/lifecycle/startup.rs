//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve configuration: file, then environment, then command line
//! - Validate the result before anything binds
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - No file is required; defaults plus environment are a valid setup

use std::path::Path;

use crate::config::{
    apply_env_overrides, read_config, validate_config, ConfigError, GatewayConfig,
};

/// Values given on the command line. They beat env and file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
    pub includes: Option<Vec<String>>,
    pub excludes: Option<Vec<String>>,
}

/// Build the effective configuration.
pub fn resolve_config<F>(
    path: Option<&Path>,
    env: F,
    cli: &CliOverrides,
) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, env);

    if let Some(bind_address) = &cli.bind_address {
        config.listener.bind_address = bind_address.clone();
    }
    if let Some(port) = cli.port {
        config.listener.set_port(port);
    }
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    if let Some(includes) = &cli.includes {
        config.tools.includes = tool_names(includes);
    }
    if let Some(excludes) = &cli.excludes {
        config.tools.excludes = tool_names(excludes);
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn tool_names(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
