//! End-to-end tests for the steptrace HTTP API.
//!
//! Tests use `tower::ServiceExt::oneshot` to send requests directly to the
//! router without starting a network server. The router is built with the
//! inline executor, so no worker binary is needed.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use steptrace_server::config::ServerConfig;
use steptrace_server::router::build_router;
use steptrace_server::state::AppState;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn test_app() -> Router {
    build_router(AppState::new(ServerConfig::inline()))
}

/// Sends a POST request with a JSON body and returns (status, json).
async fn post_json(
    app: &Router,
    path: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value =
        serde_json::from_slice(&body_bytes).unwrap_or(json!(null));
    (status, json)
}

/// Sends a GET request and returns (status, json).
async fn get_json(app: &Router, path: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value =
        serde_json::from_slice(&body_bytes).unwrap_or(json!(null));
    (status, json)
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_healthy() {
    let app = test_app();
    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn languages_lists_python_with_tracing() {
    let app = test_app();
    let (status, json) = get_json(&app, "/api/v1/languages").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["languages"], json!([{"name": "python", "tracing": true}]));
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trace_is_forwarded_verbatim() {
    let app = test_app();
    let (status, json) = post_json(
        &app,
        "/api/v1/execution/trace",
        json!({"code": "x = 1\ny = 2\nz = x + y\n", "language": "python"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let expected = serde_json::to_value(steptrace_tracer::trace("x = 1\ny = 2\nz = x + y\n", &[])).unwrap();
    assert_eq!(json, expected);
    assert_eq!(json["trace"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn inputs_reach_the_program() {
    let app = test_app();
    let (status, json) = post_json(
        &app,
        "/api/v1/execution/trace",
        json!({"code": "n = int(input())\nm = n + 1\n", "input_data": [41]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["trace"][1]["locals"]["n"], 41);
}

#[tokio::test]
async fn runtime_fault_is_a_trailing_entry() {
    let app = test_app();
    let (status, json) = post_json(
        &app,
        "/api/v1/execution/trace",
        json!({"code": "d = {}\nv = d['missing']\n"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = json["trace"].as_array().unwrap();
    assert_eq!(entries.last().unwrap()["error_type"], "KeyError");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn compile_error_and_unknown_language_are_traces() {
    let app = test_app();
    let (status, json) = post_json(
        &app,
        "/api/v1/execution/trace",
        json!({"code": "if x\n"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["error"].as_str().unwrap().starts_with("SyntaxError"));

    let (status, json) = post_json(
        &app,
        "/api/v1/execution/trace",
        json!({"code": "x = 1", "language": "brainfuck"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"error": "language 'brainfuck' is not supported for tracing"})
    );
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let app = test_app();
    let (status, json) = post_json(
        &app,
        "/api/v1/execution/trace",
        json!({"code": "   "}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");

    let (status, _) = post_json(
        &app,
        "/api/v1/execution/trace",
        json!({"code": "x = 1", "timeout": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = post_json(
        &app,
        "/api/v1/execution/trace",
        json!({"code": "x = 1", "timeout": 1000}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"].as_str().unwrap().contains("120"));
}
