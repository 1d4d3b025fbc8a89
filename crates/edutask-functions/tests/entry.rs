//! The function entry point built from a config, invoked the way the
//! hosting runtime invokes it.

use edutask_functions::{function_entry, global_options, FunctionsConfig};
use edutask_gateway::InboundRequest;

const STAGING: &str = r#"
[options]
region = "asia-northeast3"
max_instances = 2

[cors]
allow_origins = ["https://staging.edutask.example"]
"#;

#[tokio::test]
async fn entry_serves_health_with_configured_cors() {
    let config = FunctionsConfig::from_toml(STAGING).unwrap();
    let adapter = function_entry(&config).unwrap();

    let resp = adapter
        .handle(
            InboundRequest::new("GET", "/api/health")
                .with_header("Origin", "https://staging.edutask.example"),
        )
        .await;

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.body().as_ref(), br#"{"status":"ok"}"#);
    assert_eq!(
        resp.header("access-control-allow-origin"),
        Some("https://staging.edutask.example")
    );
    assert!(global_options().is_some());
}

#[tokio::test]
async fn entry_rejects_preflight_from_default_origin_when_overridden() {
    let config = FunctionsConfig::from_toml(STAGING).unwrap();
    let adapter = function_entry(&config).unwrap();

    let resp = adapter
        .handle(
            InboundRequest::new("OPTIONS", "/api/health")
                .with_header("Origin", "http://localhost:5173")
                .with_header("Access-Control-Request-Method", "GET"),
        )
        .await;

    assert_eq!(resp.status(), 400);
}

#[test]
fn invalid_options_fail_entry_construction() {
    let config = FunctionsConfig::from_toml("[options]\nmemory_mb = 0\n").unwrap();
    assert!(function_entry(&config).is_err());
}
