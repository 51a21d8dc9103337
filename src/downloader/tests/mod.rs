use super::*;
use crate::downloader::test_helpers::{create_test_downloader, test_config, wait_for_terminal};
use crate::types::Status;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};


/// Mount a resolver reply on `POST /`
async fn mount_resolver(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount media bytes on `GET media_path`
async fn mount_media(server: &MockServer, media_path: &str, bytes: &[u8]) {
    Mock::given(method("GET"))
        .and(path(media_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .set_body_bytes(bytes.to_vec()),
        )
        .mount(server)
        .await;
}

/// Resolver that takes `delay` to answer with a redirect to its own `/media.mp4`
async fn slow_resolver(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "status": "redirect",
                    "url": format!("{}/media.mp4", server.uri()),
                    "filename": "slow.mp4"
                }))
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    mount_media(&server, "/media.mp4", b"slow bytes").await;
    server
}
