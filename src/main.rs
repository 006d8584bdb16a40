use anyhow::{Context, Result};
use clap::Parser;
use song_catalog::config::ServerConfig;
use song_catalog::server::{self, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("song_catalog=debug,tower_http=debug")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = ServerConfig::parse();

    if config.data_dir.exists() && !config.data_dir.is_dir() {
        anyhow::bail!("Data path is not a directory: {}", config.data_dir.display());
    }

    tracing::info!("Starting Song Catalog");
    tracing::info!("Data directory: {}", config.data_dir.display());

    for dir in [config.covers_dir(), config.songs_dir()] {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let state = AppState::from_config(&config);
    state
        .store
        .ensure_initialized()
        .await
        .context("Failed to initialize catalog file")?;

    let app = server::create_router(state, &config);
    let addr = config.bind_addr();

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /api/health     - Catalog health check");
    tracing::info!("  GET  /api/songs      - List all songs");
    tracing::info!("  GET  /api/songs/:id  - Get song details");
    tracing::info!("  POST /api/songs      - Upload a new song (multipart)");
    tracing::info!("  GET  /covers/:file   - Cover images");
    tracing::info!("  GET  /songs/:file    - Audio files");
    if config.web_dir.is_some() {
        tracing::info!("Web Client:");
        tracing::info!("  http://localhost:{}/web/index.html", config.port);
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
