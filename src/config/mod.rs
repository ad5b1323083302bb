//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (GITLAB_BASE_URL / GITLAB_TOKEN / PORT / TOOLS_* overrides)
//!     → CLI flags (main.rs)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, read_config, ConfigError};
pub use schema::{
    AckStatus, GatewayConfig, GitLabConfig, ListenerConfig, ObservabilityConfig, SecurityConfig,
    TimeoutConfig, ToolsConfig, TransportConfig,
};
pub use validation::{validate_config, ValidationError};
