use song_catalog::client::CatalogClient;
use song_catalog::config::ServerConfig;
use song_catalog::server::{AppState, create_router};
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::net::TcpListener;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-a-png";
const MP3_BYTES: &[u8] = b"ID3\x03\x00\x00not-really-an-mp3";

/// Serve a fresh catalog on an ephemeral port and point a client at it.
async fn spawn_server(init: bool) -> (TempDir, ServerConfig, CatalogClient) {
    let dir = TempDir::new().unwrap();
    let config = ServerConfig::with_data_dir(dir.path().join("server"));
    let state = AppState::from_config(&config);
    if init {
        state.store.ensure_initialized().await.unwrap();
    }
    let app = create_router(state, &config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (dir, config, CatalogClient::new(format!("http://{}", addr)))
}

fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, data).unwrap();
    path
}

#[tokio::test]
async fn test_health_reports_connected_catalog() {
    let (_dir, _config, client) = spawn_server(true).await;

    let report = client.health().await.unwrap();

    assert!(report.is_ok());
    assert_eq!(report.database, "connected");
}

#[tokio::test]
async fn test_health_parses_unavailable_report() {
    let (_dir, _config, client) = spawn_server(false).await;

    let report = client.health().await.unwrap();

    assert!(!report.is_ok());
    assert_eq!(report.database, "disconnected");
}

#[tokio::test]
async fn test_upload_then_list_get_and_fetch() {
    let (dir, _config, client) = spawn_server(true).await;
    let cover = write_file(&dir, "cover.png", PNG_BYTES);
    let track = write_file(&dir, "track.mp3", MP3_BYTES);

    let created = client
        .create_song("Song One", "Artist One", &cover, &track)
        .await
        .unwrap();
    assert_eq!(created.id, 1);
    assert!(created.cover_path.starts_with("/covers/"));
    assert!(created.song_path.starts_with("/songs/"));

    let songs = client.list_songs().await.unwrap();
    assert_eq!(songs, vec![created.clone()]);

    let found = client.get_song(created.id).await.unwrap();
    assert_eq!(found, Some(created.clone()));

    assert_eq!(client.fetch_asset(&created.cover_path).await.unwrap(), PNG_BYTES);
    assert_eq!(client.fetch_asset(&created.song_path).await.unwrap(), MP3_BYTES);
}

#[tokio::test]
async fn test_get_unknown_song_is_none() {
    let (_dir, _config, client) = spawn_server(true).await;

    assert_eq!(client.get_song(42).await.unwrap(), None);
}

#[tokio::test]
async fn test_rejected_cover_surfaces_server_message() {
    let (dir, _config, client) = spawn_server(true).await;
    let cover = write_file(&dir, "cover.txt", b"plain text");
    let track = write_file(&dir, "track.mp3", MP3_BYTES);

    let err = client
        .create_song("Song", "Artist", &cover, &track)
        .await
        .unwrap_err();

    assert!(
        err.to_string().contains("Only image files are allowed for covers"),
        "unexpected error: {:#}",
        err
    );
    assert!(client.list_songs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_title_surfaces_server_message() {
    let (dir, _config, client) = spawn_server(true).await;
    let cover = write_file(&dir, "cover.png", PNG_BYTES);
    let track = write_file(&dir, "track.mp3", MP3_BYTES);

    let err = client
        .create_song("   ", "Artist", &cover, &track)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Title and artist are required"));
}

#[tokio::test]
async fn test_corrupt_catalog_fails_list_with_message() {
    let (_dir, config, client) = spawn_server(true).await;
    std::fs::write(config.catalog_file(), "{ not json").unwrap();

    let err = client.list_songs().await.unwrap_err();

    assert!(err.to_string().contains("not valid JSON"));
    assert!(!client.health().await.unwrap().is_ok());
}

#[tokio::test]
async fn test_missing_asset_fetch_is_an_error() {
    let (_dir, _config, client) = spawn_server(true).await;

    assert!(client.fetch_asset("/songs/missing.mp3").await.is_err());
}
