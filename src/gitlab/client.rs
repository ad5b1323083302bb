//! Thin GitLab REST/GraphQL client.
//!
//! # Responsibilities
//! - Build upstream URLs under the configured API root
//! - Attach the `PRIVATE-TOKEN` header and propagate `x-request-id`
//! - Perform exactly one HTTP round trip per call
//! - Hand back the body bytes and content type untouched
//!
//! # Design Decisions
//! - No retries, caching or field mapping; the gateway relays what GitLab says
//! - Upstream status codes are kept, error or not

use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use url::Url;

use crate::config::GitLabConfig;
use crate::http::X_REQUEST_ID;
use crate::observability::metrics;

const PRIVATE_TOKEN: &str = "PRIVATE-TOKEN";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("gitlab base url is not configured")]
    NotConfigured,

    #[error("invalid upstream url: {0}")]
    Url(#[from] url::ParseError),

    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream request failed: {0}")]
    Transport(reqwest::Error),

    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Transport(err)
        }
    }
}

/// One upstream round trip's result.
///
/// The body and its content type are kept exactly as GitLab sent them.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Body parsed as JSON, if it is JSON.
    pub fn json(&self) -> Option<Value> {
        let is_json = self
            .content_type
            .as_ref()
            .and_then(|ct| ct.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        is_json.then(|| serde_json::from_slice(&self.body).ok()).flatten()
    }

    /// Relay as plain text whatever the upstream content type was.
    pub fn into_text_response(self) -> Response {
        let text = String::from_utf8_lossy(&self.body).into_owned();
        (
            self.status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN))],
            text,
        )
            .into_response()
    }
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        if self.body.is_empty() {
            return self.status.into_response();
        }
        match self.content_type {
            Some(content_type) => {
                (self.status, [(header::CONTENT_TYPE, content_type)], self.body).into_response()
            }
            None => (self.status, self.body).into_response(),
        }
    }
}

/// A call to make against the GitLab API root.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Path below the API root, already percent-encoded, starting with '/'.
    pub path: String,
    /// Raw query string without the leading '?'.
    pub query: Option<String>,
    pub body: Option<Value>,
    pub request_id: Option<String>,
}

impl UpstreamRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: None,
            request_id: None,
        }
    }

    pub fn query(mut self, query: Option<String>) -> Self {
        self.query = query.filter(|q| !q.is_empty());
        self
    }

    pub fn body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Client bound to one GitLab instance.
#[derive(Clone)]
pub struct GitLabClient {
    http: reqwest::Client,
    base_url: Option<String>,
    token: String,
}

impl GitLabClient {
    pub fn new(config: &GitLabConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(UpstreamError::Client)?;

        let base_url = config.base_url.trim().trim_end_matches('/');
        Ok(Self {
            http,
            base_url: (!base_url.is_empty()).then(|| base_url.to_string()),
            token: config.token.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Full URL for `path` (below the API root) and an optional raw query.
    pub fn endpoint(&self, path: &str, query: Option<&str>) -> Result<Url, UpstreamError> {
        let base = self.base_url.as_deref().ok_or(UpstreamError::NotConfigured)?;
        let mut url = Url::parse(&format!("{base}{path}"))?;
        url.set_query(query);
        Ok(url)
    }

    /// Perform one round trip.
    pub async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.endpoint(&request.path, request.query.as_deref())?;
        let start = Instant::now();
        let method_label = request.method.to_string();

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(PRIVATE_TOKEN, &self.token);
        if let Some(request_id) = &request.request_id {
            builder = builder.header(X_REQUEST_ID, request_id);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    method = %request.method,
                    path = %request.path,
                    error = %e,
                    "Upstream error"
                );
                metrics::record_upstream(&method_label, 0, start);
                return Err(e.into());
            }
        };

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes().await?;

        metrics::record_upstream(&method_label, status.as_u16(), start);
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = %status,
            "Upstream responded"
        );

        let response = UpstreamResponse {
            status,
            content_type,
            body,
        };
        if status.is_client_error() || status.is_server_error() {
            let message = response
                .json()
                .and_then(|v| v.get("message").or_else(|| v.get("error")).cloned());
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                status = %status,
                message = ?message,
                "Upstream returned an error"
            );
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> GitLabClient {
        GitLabClient::new(&GitLabConfig {
            base_url: base_url.into(),
            token: "testtoken".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_keeps_api_prefix() {
        let client = client("https://gitlab.example.com/api/v4/");
        let url = client.endpoint("/projects/123", None).unwrap();
        assert_eq!(url.as_str(), "https://gitlab.example.com/api/v4/projects/123");
    }

    #[test]
    fn test_endpoint_with_encoded_path_and_query() {
        let client = client("https://gitlab.example.com/api/v4");
        let url = client
            .endpoint("/projects/123/repository/files/src%2Findex.ts/raw", Some("ref=main"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.example.com/api/v4/projects/123/repository/files/src%2Findex.ts/raw?ref=main"
        );
    }

    #[test]
    fn test_unconfigured_client() {
        let client = client("");
        assert!(!client.is_configured());
        assert!(matches!(
            client.endpoint("/projects", None),
            Err(UpstreamError::NotConfigured)
        ));
    }

    fn response(content_type: Option<&'static str>, body: &'static [u8]) -> UpstreamResponse {
        UpstreamResponse {
            status: StatusCode::OK,
            content_type: content_type.map(HeaderValue::from_static),
            body: Bytes::from_static(body),
        }
    }

    #[tokio::test]
    async fn test_binary_body_is_relayed_untouched() {
        let zip: &[u8] = &[0x50, 0x4b, 0x03, 0x04, 0xff, 0xfe, 0x00, 0x80];
        let relayed = response(Some("application/zip"), zip).into_response();

        assert_eq!(relayed.headers()[header::CONTENT_TYPE], "application/zip");
        let body = axum::body::to_bytes(relayed.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], zip);
    }

    #[tokio::test]
    async fn test_json_body_keeps_upstream_bytes() {
        let raw = br#"{"z":1, "a":[2,3]}"#;
        let relayed = response(Some("application/json"), raw).into_response();

        let body = axum::body::to_bytes(relayed.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], raw);
    }

    #[test]
    fn test_json_detection() {
        assert_eq!(
            response(Some("application/json; charset=utf-8"), br#"{"id":1}"#).json(),
            Some(serde_json::json!({"id": 1}))
        );
        assert_eq!(response(Some("text/plain"), b"hello").json(), None);
        // Mislabelled bodies are not JSON.
        assert_eq!(response(Some("application/json"), b"<html>").json(), None);
    }

    #[tokio::test]
    async fn test_text_response_forces_plain_text() {
        let relayed = response(Some("application/octet-stream"), b"console.log(1)").into_text_response();
        assert!(relayed.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let body = axum::body::to_bytes(relayed.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"console.log(1)");
    }
}
