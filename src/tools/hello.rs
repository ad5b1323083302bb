//! `POST /tool/hello`: greet a name.

use axum::{body::Bytes, routing::post, Json, Router};
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::tools::ToolInfo;

pub const TOOL: ToolInfo = ToolInfo::new("hello", "Greets the provided name", mount);

fn mount(router: Router) -> Router {
    router.route("/tool/hello", post(hello))
}

/// `{"name": "Alice"}` → `{"greeting": "Hello, Alice!"}`.
///
/// `name` must be a string with at least one non-blank character. It is
/// echoed as given, surrounding whitespace included.
pub async fn hello(body: Bytes) -> Result<Json<Value>, GatewayError> {
    let input: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|_| GatewayError::InvalidJson)?
    };

    match input.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => {
            Ok(Json(json!({ "greeting": format!("Hello, {name}!") })))
        }
        _ => Err(GatewayError::NameRequired),
    }
}
