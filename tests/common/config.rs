//! Helpers for building downloaders and mock upstreams

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use media_dl::{Config, MediaDownloader};

/// Config whose resolver is `resolver_url` and whose storage lives in `temp_dir`
pub fn test_config(resolver_url: &str, temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.resolver.base_url = resolver_url.to_string();
    config.storage.storage_dir = temp_dir.path().join("media");
    config.download.estimate_interval = Duration::from_millis(10);
    config
}

/// Create a downloader talking to `resolver_url`
///
/// Returns the downloader and temp directory (keep temp_dir alive for test duration)
pub async fn create_downloader(resolver_url: &str) -> (Arc<MediaDownloader>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = test_config(resolver_url, &temp_dir);
    let downloader = MediaDownloader::new(config)
        .await
        .expect("Failed to create downloader");
    (Arc::new(downloader), temp_dir)
}

/// Mock upstream that resolves every request to `/media.mp4` on itself
pub async fn redirecting_upstream(body: Vec<u8>, filename: &str) -> MockServer {
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
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;
    server
}

/// Mock resolver that rejects every request with `code`
pub async fn rejecting_upstream(code: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "error", "error": {"code": code}})),
        )
        .mount(&server)
        .await;
    server
}
