//! Web server integration tests
//!
//! The router is exercised in-process with `tower::ServiceExt::oneshot`, so
//! no port is bound. Only request validation paths are covered here; a real
//! transcription needs a model file and network access.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use tubescribe::config::Config;
use tubescribe::server::{router, AppState};

fn test_app() -> axum::Router {
    router(Arc::new(AppState::new(Config::default())))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn index_serves_form() {
    let response = test_app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8_lossy(&bytes);
    assert!(html.contains("<title>Tubescribe</title>"));
    assert!(html.contains("/api/transcribe"));
}

#[tokio::test]
async fn info_requires_url_param() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn info_rejects_bad_scheme() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/info?url=ftp%3A%2F%2Fexample.com%2Fa.mp3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("HTTP or HTTPS"));
}

#[tokio::test]
async fn transcribe_rejects_bad_scheme() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/transcribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "url": "ftp://example.com/a.mp3" }).to_string(),
        ))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("HTTP or HTTPS"));
}

#[tokio::test]
async fn transcribe_rejects_malformed_url() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/transcribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "url": "not a url" }).to_string()))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Invalid URL"));
}

#[tokio::test]
async fn transcribe_rejects_malformed_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/transcribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn transcribe_rejects_ill_typed_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/transcribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "url": 42 }).to_string()))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn transcribe_requires_json_content_type() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/transcribe")
        .body(Body::from(
            json!({ "url": "https://example.com/a.mp3" }).to_string(),
        ))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = body_json(response).await;
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn transcribe_rejects_unknown_model() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/transcribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "url": "https://example.com/a.mp3",
                "model": "enormous",
            })
            .to_string(),
        ))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Unknown whisper model"));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
