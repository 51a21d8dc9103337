//! Standalone media-dl server
//!
//! Reads `RESOLVER_URL`, `FILE_STORAGE_PATH`, `FILE_EXPIRY_MINUTES` and `PORT`
//! from the environment (a `.env` file is honored), then serves the REST API
//! until SIGTERM or Ctrl+C.
//!
//! ```bash
//! RESOLVER_URL=http://localhost:9000 cargo run --example server
//! curl -X POST http://localhost:3000/download \
//!     -H 'Content-Type: application/json' \
//!     -d '{"url": "https://example.com/watch?v=abc"}'
//! ```

use media_dl::{Config, MediaDownloader, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,media_dl=debug")),
        )
        .init();

    let config = Config::from_env()?;
    let address = config.server.api.bind_address;
    let downloader = Arc::new(MediaDownloader::new(config).await?);

    let _sweeper = downloader.start_sweeper();
    let api = downloader.spawn_api_server();

    tracing::info!(%address, "media-dl ready");
    println!("📖 Swagger UI: http://{}/swagger-ui", address);
    println!("🔄 Events stream: http://{}/events", address);

    run_with_shutdown((*downloader).clone()).await?;

    // The server exits on its own once the downloader shuts down
    api.await??;

    Ok(())
}
