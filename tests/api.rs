use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use club_risk::api::router;
use club_risk::assessment::RiskService;
use club_risk::strategy::SuggesterOptions;

const ORIGIN: &str = "http://localhost:5173";

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn app() -> Router {
    app_with_origins(&[ORIGIN.to_string()])
}

fn app_with_origins(origins: &[String]) -> Router {
    let service = RiskService::load_from(
        &fixture_path("clubs.csv"),
        &fixture_path("risk_model.json"),
        SuggesterOptions::default(),
    )
    .expect("fixture service should load");
    router(Arc::new(service), origins)
}

fn preflight() -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/risk")
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .expect("request builds")
}

fn risk_request(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/risk")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn body_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is json")
}

#[tokio::test]
async fn risk_endpoint_returns_scored_rows() {
    let res = app()
        .oneshot(risk_request(r#"{"club_names": ["Fulham", "Arsenal"]}"#))
        .await
        .expect("request served");
    assert_eq!(res.status(), StatusCode::OK);

    let json = body_json(res.into_body()).await;
    let clubs = json["clubs"].as_array().expect("clubs array");
    assert_eq!(clubs.len(), 2);

    let arsenal = &clubs[0];
    assert_eq!(arsenal["Club"], "Arsenal");
    assert_eq!(arsenal["Season"], "2023-24");
    assert_eq!(arsenal["Risk Score"], 18.75);
    assert_eq!(arsenal["Risk Catgeogry"], "Low Risk");
    assert_eq!(arsenal["European Competition"], true);
    assert_eq!(arsenal["strategies"].as_array().map(Vec::len), Some(6));

    let fulham = &clubs[1];
    assert_eq!(fulham["Club"], "Fulham");
    assert_eq!(fulham["Risk Catgeogry"], "Medium Risk");
    assert!(fulham["Total Revenue (£m)"].is_number());
}

#[tokio::test]
async fn unknown_clubs_yield_empty_list() {
    let res = app()
        .oneshot(risk_request(r#"{"club_names": ["Nowhere Town"]}"#))
        .await
        .expect("request served");
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res.into_body()).await;
    assert_eq!(json["clubs"], serde_json::json!([]));
}

#[tokio::test]
async fn missing_club_names_is_rejected() {
    let res = app()
        .oneshot(risk_request(r#"{"clubs": ["Arsenal"]}"#))
        .await
        .expect("request served");
    assert!(res.status().is_client_error());
}

#[tokio::test]
async fn clubs_endpoint_lists_unique_names() {
    let res = app()
        .oneshot(
            Request::builder()
                .uri("/api/clubs")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request served");
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res.into_body()).await;
    assert_eq!(
        json,
        serde_json::json!(["Arsenal", "Everton", "Fulham", "Brentford"])
    );
}

#[tokio::test]
async fn health_reports_loaded_model() {
    let res = app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request served");
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["rows"], 5);
    assert_eq!(json["trees"], 2);
    assert_eq!(json["scaling"], "artifact");
    assert_eq!(json["model_source"], "fixture forest");
}

#[tokio::test]
async fn preflight_from_allowed_origin_gets_credentials() {
    let res = app().oneshot(preflight()).await.expect("request served");
    let headers = res.headers();
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some(ORIGIN)
    );
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
}

#[tokio::test]
async fn wildcard_and_invalid_origins_are_skipped() {
    let app = app_with_origins(&[
        "*".to_string(),
        "bad\norigin".to_string(),
        ORIGIN.to_string(),
    ]);
    let res = app.oneshot(preflight()).await.expect("request served");
    let headers = res.headers();
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some(ORIGIN)
    );
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).is_some());
}

#[tokio::test]
async fn foreign_origin_is_not_echoed() {
    let mut req = risk_request(r#"{"club_names": ["Arsenal"]}"#);
    req.headers_mut().insert(
        header::ORIGIN,
        "https://evil.example".parse().expect("valid header"),
    );
    let res = app().oneshot(req).await.expect("request served");
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
