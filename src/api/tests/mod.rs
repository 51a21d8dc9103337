use super::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod system;

/// Helper to create a test MediaDownloader instance wrapped in Arc
async fn create_test_downloader(resolver_url: &str) -> (Arc<MediaDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) =
        crate::downloader::test_helpers::create_test_downloader(resolver_url).await;
    (Arc::new(downloader), temp_dir)
}

/// Router over a fresh downloader, plus the downloader for direct inspection
async fn create_test_app(
    resolver_url: &str,
) -> (Router, Arc<MediaDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = create_test_downloader(resolver_url).await;
    let config = downloader.get_config();
    let app = create_router(downloader.clone(), config);
    (app, downloader, temp_dir)
}

/// Collect a response body as JSON
async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Resolver redirecting to `/media.mp4` on the same mock server
async fn redirecting_resolver(bytes: &[u8], filename: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "redirect",
            "url": format!("{}/media.mp4", server.uri()),
            "filename": filename
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.to_vec()))
        .mount(&server)
        .await;
    server
}

fn post_download(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/download")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_api_server_serves_and_stops_on_shutdown() {
    let (downloader, _temp_dir) = create_test_downloader("http://127.0.0.1:9").await;
    let config = downloader.get_config();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = tokio::spawn(serve(listener, downloader.clone(), config));

    let response = reqwest::get(format!("http://{}/health", address))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    drop(response);

    downloader.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop after shutdown")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (downloader, _temp_dir) = create_test_downloader("http://127.0.0.1:9").await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (downloader, _temp_dir) = create_test_downloader("http://127.0.0.1:9").await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_origins = vec!["http://app.example.com".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://app.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://app.example.com"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (downloader, _temp_dir) = create_test_downloader("http://127.0.0.1:9").await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        response
            .headers()
            .get("access-control-allow-origin")
            .is_none()
    );
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let (downloader, _temp_dir) = create_test_downloader("http://127.0.0.1:9").await;

    let app = create_router(downloader.clone(), downloader.get_config());
    let response = app.oneshot(get("/api-docs/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut config = (*downloader.get_config()).clone();
    config.server.api.swagger_ui = false;
    let app = create_router(downloader, Arc::new(config));
    let response = app.oneshot(get("/api-docs/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
