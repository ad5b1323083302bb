//! End-to-end tests for the local tool routes and their include/exclude filter.

use gitlab_sse_gateway::config::GatewayConfig;
use serde_json::{json, Value};

mod common;
use common::{client, spawn_gateway};

#[tokio::test]
async fn test_hello_greets_name() {
    let gateway = spawn_gateway(GatewayConfig::default()).await;

    let res = client()
        .post(gateway.url("/tool/hello"))
        .json(&json!({ "name": "Alice" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "greeting": "Hello, Alice!" }));
}

#[tokio::test]
async fn test_hello_requires_name() {
    let gateway = spawn_gateway(GatewayConfig::default()).await;

    for body in [json!({}), json!({ "name": "" }), json!({ "name": "  " })] {
        let res = client()
            .post(gateway.url("/tool/hello"))
            .json(&body)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 400, "body {body}");
        assert_eq!(res.json::<Value>().await.unwrap(), json!({ "error": "name required" }));
    }
}

#[tokio::test]
async fn test_hello_works_without_gitlab() {
    // Default config has no base url, so proxy routes answer 503.
    let gateway = spawn_gateway(GatewayConfig::default()).await;

    let res = client().get(gateway.url("/projects/1")).send().await.unwrap();
    assert_eq!(res.status(), 503);

    let res = client()
        .post(gateway.url("/tool/hello"))
        .json(&json!({ "name": "Bob" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_listing_reports_enabled_tools() {
    let gateway = spawn_gateway(GatewayConfig::default()).await;

    let res = client().get(gateway.url("/tools")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let listing: Value = res.json().await.unwrap();
    assert_eq!(
        listing,
        json!({ "tools": [{ "name": "hello", "description": "Greets the provided name" }] })
    );
}

#[tokio::test]
async fn test_excluded_tool_is_gone() {
    let mut config = GatewayConfig::default();
    config.tools.excludes = vec!["hello".into()];
    let gateway = spawn_gateway(config).await;

    let res = client()
        .post(gateway.url("/tool/hello"))
        .json(&json!({ "name": "Alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let listing: Value = client()
        .get(gateway.url("/tools"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing, json!({ "tools": [] }));
}

#[tokio::test]
async fn test_include_beats_exclude() {
    let mut config = GatewayConfig::default();
    config.tools.includes = vec!["hello".into()];
    config.tools.excludes = vec!["hello".into()];
    let gateway = spawn_gateway(config).await;

    let res = client()
        .post(gateway.url("/tool/hello"))
        .json(&json!({ "name": "Alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_include_list_without_hello_hides_it() {
    let mut config = GatewayConfig::default();
    config.tools.includes = vec!["other".into()];
    let gateway = spawn_gateway(config).await;

    let res = client()
        .post(gateway.url("/tool/hello"))
        .json(&json!({ "name": "Alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}
