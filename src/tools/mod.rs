//! Local tools served next to the GitLab routes.
//!
//! # Data Flow
//! ```text
//! ToolsConfig (file → TOOLS_INCLUDE/TOOLS_EXCLUDE → --includes/--excludes)
//!     → ToolFilter
//!     → CATALOG filtered in catalog order
//!     → each enabled tool mounts its own route, GET /tools lists them
//! ```

pub mod hello;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::config::ToolsConfig;

/// Static description of one tool.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    mount: fn(Router) -> Router,
}

impl ToolInfo {
    pub const fn new(name: &'static str, description: &'static str, mount: fn(Router) -> Router) -> Self {
        Self {
            name,
            description,
            mount,
        }
    }
}

/// Every tool the gateway knows about.
pub const CATALOG: &[ToolInfo] = &[hello::TOOL];

/// Include/exclude selection over a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolFilter {
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl ToolFilter {
    pub fn new(includes: Vec<String>, excludes: Vec<String>) -> Self {
        Self { includes, excludes }
    }

    pub fn allows(&self, name: &str) -> bool {
        if !self.includes.is_empty() {
            return self.includes.iter().any(|n| n == name);
        }
        !self.excludes.iter().any(|n| n == name)
    }

    /// Enabled tools, in catalog order.
    pub fn select(&self, catalog: &[ToolInfo]) -> Vec<ToolInfo> {
        catalog.iter().filter(|t| self.allows(t.name)).copied().collect()
    }

    /// Names in either list that no catalog entry carries.
    fn unknown<'a>(&'a self, catalog: &[ToolInfo]) -> Vec<&'a str> {
        self.includes
            .iter()
            .chain(&self.excludes)
            .map(String::as_str)
            .filter(|name| !catalog.iter().any(|t| t.name == *name))
            .collect()
    }
}

impl From<&ToolsConfig> for ToolFilter {
    fn from(config: &ToolsConfig) -> Self {
        Self::new(config.includes.clone(), config.excludes.clone())
    }
}

/// Routes for every enabled tool plus `GET /tools`.
pub fn routes(filter: &ToolFilter) -> Router {
    let unknown = filter.unknown(CATALOG);
    if !unknown.is_empty() {
        tracing::warn!(tools = ?unknown, "Tool filter names unknown tools");
    }

    let enabled = filter.select(CATALOG);
    tracing::info!(
        tools = ?enabled.iter().map(|t| t.name).collect::<Vec<_>>(),
        "Tools enabled"
    );

    let listing = json!({ "tools": enabled });
    let mut router = Router::new().route(
        "/tools",
        get(move || std::future::ready(Json(listing.clone()))),
    );
    for tool in &enabled {
        router = (tool.mount)(router);
    }
    router
}
