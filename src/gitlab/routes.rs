//! Local GitLab routes.
//!
//! Most routes are a one-to-one mapping from a local path template to an
//! upstream path template, kept in [`ROUTES`]. Captured segments are
//! percent-encoded before substitution and the query string is forwarded
//! verbatim. The few routes that reshape a request (search, raw files) have
//! their own handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, RawPathParams, RawQuery, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
    routing::{get, on, MethodFilter},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use url::form_urlencoded;

use crate::error::GatewayError;
use crate::gitlab::client::{GitLabClient, UpstreamRequest};
use crate::http::X_REQUEST_ID;

/// HTTP verb of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Delete => Method::DELETE,
        }
    }

    fn filter(self) -> MethodFilter {
        match self {
            Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
            Verb::Put => MethodFilter::PUT,
            Verb::Delete => MethodFilter::DELETE,
        }
    }
}

/// Where the upstream body comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRule {
    /// Nothing is sent upstream.
    Omit,
    /// The local JSON body is sent as-is (absent body is omitted).
    Forward,
    /// A fixed `{"state_event": ...}` body.
    StateEvent(&'static str),
}

/// One local route and the GitLab call it stands for.
#[derive(Debug, Clone, Copy)]
pub struct Mapping {
    pub verb: Verb,
    pub local: &'static str,
    pub upstream_verb: Verb,
    pub upstream: &'static str,
    pub body: BodyRule,
}

const fn same(verb: Verb, path: &'static str) -> Mapping {
    let body = match verb {
        Verb::Post | Verb::Put => BodyRule::Forward,
        Verb::Get | Verb::Delete => BodyRule::Omit,
    };
    Mapping {
        verb,
        local: path,
        upstream_verb: verb,
        upstream: path,
        body,
    }
}

const fn renamed(verb: Verb, local: &'static str, upstream: &'static str) -> Mapping {
    let mut mapping = same(verb, local);
    mapping.upstream = upstream;
    mapping
}

const fn state_event(local: &'static str, upstream: &'static str, event: &'static str) -> Mapping {
    Mapping {
        verb: Verb::Put,
        local,
        upstream_verb: Verb::Put,
        upstream,
        body: BodyRule::StateEvent(event),
    }
}

use Verb::{Delete, Get, Post, Put};

/// Pass-through route table.
pub const ROUTES: &[Mapping] = &[
    // projects
    same(Get, "/projects"),
    same(Get, "/projects/{id}"),
    // merge requests
    same(Get, "/projects/{id}/merge_requests"),
    same(Post, "/projects/{id}/merge_requests"),
    same(Get, "/projects/{id}/merge_requests/{iid}"),
    same(Put, "/projects/{id}/merge_requests/{iid}"),
    same(Get, "/projects/{id}/merge_requests/{iid}/changes"),
    same(Put, "/projects/{id}/merge_requests/{iid}/merge"),
    same(Put, "/projects/{id}/merge_requests/{iid}/close"),
    same(Put, "/projects/{id}/merge_requests/{iid}/reopen"),
    same(Put, "/projects/{id}/merge_requests/{iid}/rebase"),
    same(Get, "/projects/{id}/merge_requests/{iid}/notes"),
    same(Post, "/projects/{id}/merge_requests/{iid}/notes"),
    same(Get, "/projects/{id}/merge_requests/{iid}/notes/{note_id}"),
    same(Put, "/projects/{id}/merge_requests/{iid}/notes/{note_id}"),
    same(Delete, "/projects/{id}/merge_requests/{iid}/notes/{note_id}"),
    same(Get, "/projects/{id}/merge_requests/{iid}/discussions"),
    same(Post, "/projects/{id}/merge_requests/{iid}/discussions"),
    same(Get, "/projects/{id}/merge_requests/{iid}/discussions/{discussion_id}"),
    same(Put, "/projects/{id}/merge_requests/{iid}/discussions/{discussion_id}"),
    same(Delete, "/projects/{id}/merge_requests/{iid}/discussions/{discussion_id}"),
    same(Put, "/projects/{id}/merge_requests/{iid}/discussions/{discussion_id}/resolve"),
    same(Put, "/projects/{id}/merge_requests/{iid}/discussions/{discussion_id}/unresolve"),
    same(Post, "/projects/{id}/merge_requests/{iid}/discussions/{discussion_id}/notes"),
    same(Put, "/projects/{id}/merge_requests/{iid}/discussions/{discussion_id}/notes/{note_id}"),
    same(Delete, "/projects/{id}/merge_requests/{iid}/discussions/{discussion_id}/notes/{note_id}"),
    // issues
    same(Get, "/projects/{id}/issues"),
    same(Post, "/projects/{id}/issues"),
    same(Get, "/projects/{id}/issues/{iid}"),
    same(Put, "/projects/{id}/issues/{iid}"),
    state_event("/projects/{id}/issues/{iid}/close", "/projects/{id}/issues/{iid}", "close"),
    state_event("/projects/{id}/issues/{iid}/reopen", "/projects/{id}/issues/{iid}", "reopen"),
    same(Get, "/projects/{id}/issues/{iid}/discussions"),
    same(Post, "/projects/{id}/issues/{iid}/discussions"),
    same(Get, "/projects/{id}/issues/{iid}/discussions/{discussion_id}"),
    same(Post, "/projects/{id}/issues/{iid}/discussions/{discussion_id}/notes"),
    same(Put, "/projects/{id}/issues/{iid}/discussions/{discussion_id}/notes/{note_id}"),
    same(Delete, "/projects/{id}/issues/{iid}/discussions/{discussion_id}/notes/{note_id}"),
    // commits
    renamed(Get, "/projects/{id}/commits", "/projects/{id}/repository/commits"),
    same(Get, "/projects/{id}/repository/commits/{sha}/discussions"),
    same(Post, "/projects/{id}/repository/commits/{sha}/discussions"),
    same(Get, "/projects/{id}/repository/commits/{sha}/discussions/{discussion_id}"),
    same(Post, "/projects/{id}/repository/commits/{sha}/discussions/{discussion_id}/notes"),
    same(Put, "/projects/{id}/repository/commits/{sha}/discussions/{discussion_id}/notes/{note_id}"),
    same(Delete, "/projects/{id}/repository/commits/{sha}/discussions/{discussion_id}/notes/{note_id}"),
    // snippets
    same(Get, "/projects/{id}/snippets/{snippet_id}/discussions"),
    same(Post, "/projects/{id}/snippets/{snippet_id}/discussions"),
    same(Get, "/projects/{id}/snippets/{snippet_id}/discussions/{discussion_id}"),
    same(Post, "/projects/{id}/snippets/{snippet_id}/discussions/{discussion_id}/notes"),
    same(Put, "/projects/{id}/snippets/{snippet_id}/discussions/{discussion_id}/notes/{note_id}"),
    same(Delete, "/projects/{id}/snippets/{snippet_id}/discussions/{discussion_id}/notes/{note_id}"),
    // branches and tags
    renamed(Get, "/projects/{id}/branches", "/projects/{id}/repository/branches"),
    renamed(Post, "/projects/{id}/branches", "/projects/{id}/repository/branches"),
    renamed(Get, "/projects/{id}/branches/{branch}", "/projects/{id}/repository/branches/{branch}"),
    renamed(Delete, "/projects/{id}/branches/{branch}", "/projects/{id}/repository/branches/{branch}"),
    same(Get, "/projects/{id}/protected_branches"),
    renamed(Get, "/projects/{id}/tags", "/projects/{id}/repository/tags"),
    renamed(Post, "/projects/{id}/tags", "/projects/{id}/repository/tags"),
    renamed(Get, "/projects/{id}/tags/{tag}", "/projects/{id}/repository/tags/{tag}"),
    renamed(Delete, "/projects/{id}/tags/{tag}", "/projects/{id}/repository/tags/{tag}"),
    // repository files
    renamed(Get, "/projects/{id}/files", "/projects/{id}/repository/tree"),
    renamed(Post, "/projects/{id}/files/{*file_path}", "/projects/{id}/repository/files/{file_path}"),
    renamed(Put, "/projects/{id}/files/{*file_path}", "/projects/{id}/repository/files/{file_path}"),
    renamed(Delete, "/projects/{id}/files/{*file_path}", "/projects/{id}/repository/files/{file_path}"),
    // pipelines
    same(Get, "/projects/{id}/pipelines"),
    same(Post, "/projects/{id}/pipelines"),
    same(Get, "/projects/{id}/pipelines/{pipeline_id}"),
    same(Delete, "/projects/{id}/pipelines/{pipeline_id}"),
    same(Get, "/projects/{id}/pipelines/{pipeline_id}/jobs"),
    same(Get, "/projects/{id}/pipelines/{pipeline_id}/artifacts"),
    same(Post, "/projects/{id}/pipelines/{pipeline_id}/cancel"),
    same(Post, "/projects/{id}/pipelines/{pipeline_id}/retry"),
    // releases
    same(Get, "/projects/{id}/releases"),
    same(Post, "/projects/{id}/releases"),
    same(Get, "/projects/{id}/releases/{tag}"),
    same(Put, "/projects/{id}/releases/{tag}"),
    same(Delete, "/projects/{id}/releases/{tag}"),
    // ci/cd settings
    same(Get, "/projects/{id}/variables"),
    same(Post, "/projects/{id}/variables"),
    same(Delete, "/projects/{id}/variables/{key}"),
    same(Get, "/projects/{id}/feature_flags"),
    same(Post, "/projects/{id}/feature_flags"),
    same(Delete, "/projects/{id}/feature_flags/{flag}"),
    same(Get, "/projects/{id}/freeze_periods"),
    same(Get, "/projects/{id}/deploy_keys"),
    same(Post, "/projects/{id}/deploy_tokens"),
    same(Get, "/projects/{id}/deployments"),
    // access
    same(Get, "/projects/{id}/access_tokens"),
    same(Get, "/projects/{id}/access_requests"),
    same(Get, "/personal_access_tokens"),
    // container registry
    same(Get, "/projects/{id}/registry/repositories"),
    same(Get, "/projects/{id}/registry/protection/repository/rules"),
    // groups
    same(Post, "/groups"),
    same(Get, "/groups/{group_id}"),
    same(Delete, "/groups/{group_id}"),
    same(Get, "/groups/{group_id}/members"),
    same(Get, "/groups/{group_id}/access_tokens"),
    same(Get, "/groups/{group_id}/access_requests"),
    same(Get, "/groups/{group_id}/epics"),
    same(Get, "/groups/{group_id}/epics/{epic_iid}/discussions"),
    same(Post, "/groups/{group_id}/epics/{epic_iid}/discussions"),
    same(Get, "/groups/{group_id}/epics/{epic_iid}/discussions/{discussion_id}"),
    same(Post, "/groups/{group_id}/epics/{epic_iid}/discussions/{discussion_id}/notes"),
    same(Put, "/groups/{group_id}/epics/{epic_iid}/discussions/{discussion_id}/notes/{note_id}"),
    same(Delete, "/groups/{group_id}/epics/{epic_iid}/discussions/{discussion_id}/notes/{note_id}"),
    // graphql
    renamed(Post, "/api/graphql", "/graphql"),
];

/// Substitute `{name}` / `{*name}` placeholders with percent-encoded values.
pub fn render_path<'a, I>(template: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut path = template.to_string();
    for (name, value) in params {
        let encoded = urlencoding::encode(value);
        path = path
            .replace(&format!("{{{name}}}"), &encoded)
            .replace(&format!("{{*{name}}}"), &encoded);
    }
    path
}

fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn upstream_body(rule: BodyRule, body: &Bytes) -> Result<Option<Value>, GatewayError> {
    match rule {
        BodyRule::Omit => Ok(None),
        BodyRule::StateEvent(event) => Ok(Some(json!({ "state_event": event }))),
        BodyRule::Forward if body.iter().all(u8::is_ascii_whitespace) => Ok(None),
        BodyRule::Forward => serde_json::from_slice(body)
            .map(Some)
            .map_err(|_| GatewayError::InvalidJson),
    }
}

async fn forward(
    client: &GitLabClient,
    mapping: &Mapping,
    path: String,
    query: Option<String>,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request = UpstreamRequest::new(mapping.upstream_verb.method(), path)
        .query(query)
        .body(upstream_body(mapping.body, &body)?)
        .request_id(request_id(headers));

    Ok(client.send(request).await?.into_response())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// `GET /projects/search?q=X` → `GET /projects?search=X`.
async fn search_projects(
    State(client): State<Arc<GitLabClient>>,
    Query(query): Query<SearchQuery>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("search", &query.q)
        .finish();
    let request = UpstreamRequest::new(Method::GET, "/projects")
        .query(Some(query))
        .request_id(request_id(&headers));

    Ok(client.send(request).await?.into_response())
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    #[serde(rename = "ref")]
    git_ref: Option<String>,
}

/// Raw file content, relayed as text. `ref` defaults to `main`.
async fn get_file_raw(
    State(client): State<Arc<GitLabClient>>,
    Path((id, file_path)): Path<(String, String)>,
    Query(query): Query<FileQuery>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let git_ref = query.git_ref.filter(|r| !r.is_empty()).unwrap_or_else(|| "main".to_string());
    let path = render_path(
        "/projects/{id}/repository/files/{file_path}/raw",
        [("id", id.as_str()), ("file_path", file_path.as_str())],
    );
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("ref", &git_ref)
        .finish();
    let request = UpstreamRequest::new(Method::GET, path)
        .query(Some(query))
        .request_id(request_id(&headers));

    Ok(client.send(request).await?.into_text_response())
}

fn add_mapping(router: Router<Arc<GitLabClient>>, mapping: &'static Mapping) -> Router<Arc<GitLabClient>> {
    let filter = mapping.verb.filter();

    // Path extractors reject routes without captures, so those get their own handler.
    if !mapping.local.contains('{') {
        let handler = move |State(client): State<Arc<GitLabClient>>,
                            RawQuery(query): RawQuery,
                            headers: HeaderMap,
                            body: Bytes| async move {
            let path = mapping.upstream.to_string();
            forward(&client, mapping, path, query, &headers, body).await
        };
        return router.route(mapping.local, on(filter, handler));
    }

    let handler = move |State(client): State<Arc<GitLabClient>>,
                        params: RawPathParams,
                        RawQuery(query): RawQuery,
                        headers: HeaderMap,
                        body: Bytes| async move {
        let path = render_path(mapping.upstream, params.iter());
        forward(&client, mapping, path, query, &headers, body).await
    };
    router.route(mapping.local, on(filter, handler))
}

/// Build the GitLab proxy router.
pub fn routes(client: Arc<GitLabClient>) -> Router {
    let mut router = Router::new()
        .route("/projects/search", get(search_projects))
        .route("/projects/{id}/files/{*file_path}", get(get_file_raw));

    for mapping in ROUTES {
        router = add_mapping(router, mapping);
    }

    router.with_state(client)
}

/// Health check, served without touching GitLab.
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health))
}
