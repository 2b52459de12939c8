//! HTTP boundary, driven through the router without binding a socket.

mod common;

use attack_detector::api;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn predict_returns_verdict() {
    let alerts = tempfile::tempdir().unwrap();
    let (ctx, _) = common::context(alerts.path());
    let app = api::router(Arc::new(ctx));

    let (status, body) = call(&app, post("/predict", serde_json::to_value(common::sqli()).unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threatType"], "SQL Injection");
    let c = body["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&c));
}

#[tokio::test]
async fn predict_falls_back_on_malformed_ip() {
    let alerts = tempfile::tempdir().unwrap();
    let (ctx, _) = common::context(alerts.path());
    let app = api::router(Arc::new(ctx));

    let (status, body) = call(
        &app,
        post("/predict", json!({"ip": "10.0.5", "password": "' OR 1=1 --"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"threatType": "BENIGN", "confidence": 0.0}));
}

#[tokio::test]
async fn analyze_is_refused_when_stopped() {
    let alerts = tempfile::tempdir().unwrap();
    let (ctx, _) = common::context(alerts.path());
    let app = api::router(Arc::new(ctx));

    let (status, body) = call(&app, post("/analyze", json!({"ip": "10.0.0.1"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], 503);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn analyze_then_list_threats() {
    let alerts = tempfile::tempdir().unwrap();
    let (ctx, _) = common::context(alerts.path());
    let ctx = Arc::new(ctx);
    ctx.detector().start().unwrap();
    let app = api::router(ctx.clone());

    let (status, body) = call(&app, post("/analyze", serde_json::to_value(common::xss()).unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "queued"}));
    let (_, body) = call(&app, post("/analyze", serde_json::to_value(common::benign()).unwrap())).await;
    assert_eq!(body["status"], "queued");

    tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.detector().stats().processed < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let (status, body) = call(&app, get("/threats?limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    let threats = body.as_array().unwrap();
    assert_eq!(threats.len(), 1);
    assert_eq!(threats[0]["threatType"], "XSS Attack");
    assert_eq!(threats[0]["ip"], "10.0.0.7");
    assert!(threats[0]["id"].is_string());

    let (_, body) = call(&app, get("/threats?attack_type=SQLi")).await;
    assert_eq!(body, json!([]));
    let (_, body) = call(&app, get("/threats?ip=10.0.0.7&attack_type=XSS%20Attack")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = call(&app, get("/threats/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalThreats"], 1);
    assert_eq!(body["threatsByType"][0]["threatType"], "XSS Attack");

    ctx.detector().stop().await;
}

#[tokio::test]
async fn health_reports_model_and_state() {
    let alerts = tempfile::tempdir().unwrap();
    let (ctx, _) = common::context(alerts.path());
    let ctx = Arc::new(ctx);
    let app = api::router(ctx.clone());

    let (_, body) = call(&app, get("/health")).await;
    assert_eq!(body["modelVersion"], common::VERSION);
    assert_eq!(body["running"], false);

    ctx.detector().start().unwrap();
    let (status, body) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["running"], true);
    ctx.detector().stop().await;
}

#[tokio::test]
async fn predict_falls_back_on_mistyped_fields() {
    let alerts = tempfile::tempdir().unwrap();
    let (ctx, _) = common::context(alerts.path());
    let app = api::router(Arc::new(ctx));

    for body in [
        json!({"email": 123, "ip": "10.0.0.1"}),
        json!({"body": ["a", "b"], "ip": "10.0.0.1"}),
        json!({"time_since_last": "5", "ip": "10.0.0.1"}),
    ] {
        let (status, resp) = call(&app, post("/predict", body.clone())).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(resp, json!({"threatType": "BENIGN", "confidence": 0.0}));
    }
}

#[tokio::test]
async fn analyze_rejects_mistyped_fields_generically() {
    let alerts = tempfile::tempdir().unwrap();
    let (ctx, _) = common::context(alerts.path());
    let ctx = Arc::new(ctx);
    ctx.detector().start().unwrap();
    let app = api::router(ctx.clone());

    let (status, body) = call(&app, post("/analyze", json!({"email": 123}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid request", "status": 400}));
    assert_eq!(ctx.detector().stats().accepted, 0);

    let (status, body) = call(&app, get("/threats?limit=many")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    ctx.detector().stop().await;
}
