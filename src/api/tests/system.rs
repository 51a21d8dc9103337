use super::*;

#[tokio::test]
async fn test_health_check() {
    let (app, _downloader, _temp) = create_test_app("http://127.0.0.1:9").await;

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["jobs"], 0);
    assert_eq!(body["accepting"], true);
}

#[tokio::test]
async fn test_openapi_spec_endpoint() {
    let (app, _downloader, _temp) = create_test_app("http://127.0.0.1:9").await;

    let response = app.oneshot(get("/openapi.json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["openapi"].as_str().unwrap().starts_with("3."));
    assert_eq!(body["info"]["title"], "media-dl REST API");
    assert!(body["paths"].get("/download").is_some());
}

#[tokio::test]
async fn test_event_stream_content_type() {
    let (app, _downloader, _temp) = create_test_app("http://127.0.0.1:9").await;

    let response = app.oneshot(get("/events")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
}

#[tokio::test]
async fn test_event_stream_delivers_job_events() {
    use futures::StreamExt;

    let resolver = redirecting_resolver(b"bytes", "clip.mp4").await;
    let (app, downloader, _temp) = create_test_app(&resolver.uri()).await;

    let response = app.oneshot(get("/events")).await.unwrap();
    let mut stream = response.into_body().into_data_stream();

    downloader.submit("https://example.com/v").await.unwrap();

    let chunk = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let bytes = stream.next().await.unwrap().unwrap();
            if !bytes.is_empty() {
                return String::from_utf8_lossy(&bytes).into_owned();
            }
        }
    })
    .await
    .unwrap();
    assert!(chunk.contains("event: queued"), "{chunk}");
    assert!(chunk.contains("\"source_url\":\"https://example.com/v\""), "{chunk}");
}

#[tokio::test]
async fn test_event_stream_ends_on_shutdown() {
    let (app, downloader, _temp) = create_test_app("http://127.0.0.1:9").await;

    let response = app.oneshot(get("/events")).await.unwrap();
    downloader.shutdown().await.unwrap();

    // The body completes instead of waiting for more events
    tokio::time::timeout(
        Duration::from_secs(5),
        axum::body::to_bytes(response.into_body(), usize::MAX),
    )
    .await
    .expect("event stream still open after shutdown")
    .unwrap();
}
