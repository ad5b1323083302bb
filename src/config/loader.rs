//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a configuration file without validating it.
pub fn read_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Split a comma-separated tool list, dropping blanks.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Apply `GITLAB_BASE_URL`, `GITLAB_TOKEN`, `PORT`, `TOOLS_INCLUDE` and
/// `TOOLS_EXCLUDE` on top of `config`.
///
/// `lookup` abstracts the environment so callers can pass `std::env::var`
/// or a fixed map. A `PORT` that does not parse is ignored, as is a tool
/// list with no names in it.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup("GITLAB_BASE_URL").filter(|v| !v.is_empty()) {
        config.gitlab.base_url = base_url;
    }
    if let Some(token) = lookup("GITLAB_TOKEN").filter(|v| !v.is_empty()) {
        config.gitlab.token = token;
    }
    if let Some(port) = lookup("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.listener.set_port(port),
            Err(_) => tracing::warn!(port = %port, "Ignoring unparsable PORT"),
        }
    }
    if let Some(includes) = lookup("TOOLS_INCLUDE").map(|v| parse_list(&v)).filter(|l| !l.is_empty()) {
        config.tools.includes = includes;
    }
    if let Some(excludes) = lookup("TOOLS_EXCLUDE").map(|v| parse_list(&v)).filter(|l| !l.is_empty()) {
        config.tools.excludes = excludes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("GITLAB_BASE_URL", "https://gitlab.example.com/api/v4"),
                ("GITLAB_TOKEN", "testtoken"),
                ("PORT", "4321"),
            ]),
        );

        assert_eq!(config.gitlab.base_url, "https://gitlab.example.com/api/v4");
        assert_eq!(config.gitlab.token, "testtoken");
        assert_eq!(config.listener.bind_address, "0.0.0.0:4321");
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, env(&[("PORT", "abc")]));
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
    }

    #[test]
    fn test_tool_lists_from_env() {
        let mut config = GatewayConfig::default();
        config.tools.includes = vec!["from-file".into()];
        apply_env_overrides(
            &mut config,
            env(&[("TOOLS_INCLUDE", "hello, bar"), ("TOOLS_EXCLUDE", "foo")]),
        );

        assert_eq!(config.tools.includes, vec!["hello", "bar"]);
        assert_eq!(config.tools.excludes, vec!["foo"]);
    }

    #[test]
    fn test_blank_tool_list_keeps_file_value() {
        let mut config = GatewayConfig::default();
        config.tools.excludes = vec!["foo".into()];
        apply_env_overrides(&mut config, env(&[("TOOLS_EXCLUDE", " , ")]));
        assert_eq!(config.tools.excludes, vec!["foo"]);
    }

    #[test]
    fn test_load_config_round_trip() {
        let path = std::env::temp_dir().join(format!("gateway-config-{}.toml", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            "[listener]\nbind_address = \"127.0.0.1:9000\"\n[transport]\nheartbeat_interval_ms = 500\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.transport.heartbeat_interval_ms, 500);

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_load_config_reports_validation() {
        let path = std::env::temp_dir().join(format!("gateway-config-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[transport]\nheartbeat_interval_ms = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("heartbeat_interval_ms"));

        fs::remove_file(&path).unwrap_or_default();
    }
}
