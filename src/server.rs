use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartRejection},
    http::StatusCode,
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::{HealthReport, SongListResponse, SongResponse};
use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::song::timestamp_now;
use crate::store::SongStore;
use crate::upload::{AssetKind, UploadHandler};

#[derive(Clone)]
pub struct AppState {
    pub store: SongStore,
    pub uploads: UploadHandler,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            store: SongStore::new(config.catalog_file()),
            uploads: UploadHandler::new(config.covers_dir(), config.songs_dir()),
        }
    }
}

/// Build the router over `state`; `config` supplies the upload limit and web dir.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let covers = ServeDir::new(state.uploads.dir_for(AssetKind::Cover));
    let songs = ServeDir::new(state.uploads.dir_for(AssetKind::Song));

    let api = Router::new()
        .route("/health", get(health))
        .route("/songs", get(list_songs).post(create_song))
        .route("/songs/:id", get(get_song));

    let mut router = Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .nest_service(AssetKind::Cover.url_prefix(), covers)
        .nest_service(AssetKind::Song.url_prefix(), songs);

    if let Some(web_dir) = &config.web_dir {
        router = router.nest_service("/web", ServeDir::new(web_dir));
    }

    router
        .layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    concat!("Song Catalog API v", env!("CARGO_PKG_VERSION"))
}

/// Report whether the catalog document is present and readable
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let health = state.store.probe().await;
    let report = HealthReport::from_store(&health, timestamp_now());

    if report.is_ok() {
        tracing::debug!("Health check OK");
        (StatusCode::OK, Json(report))
    } else {
        tracing::warn!("Health check failed: {}", report.message);
        (StatusCode::SERVICE_UNAVAILABLE, Json(report))
    }
}

/// List all songs
async fn list_songs(State(state): State<AppState>) -> ApiResult<Json<SongListResponse>> {
    tracing::debug!("Fetching all songs");
    let songs = state.store.read().await?.into_songs();
    tracing::debug!("Returning {} songs", songs.len());

    Ok(Json(SongListResponse {
        success: true,
        count: songs.len(),
        songs,
    }))
}

/// Get a specific song by ID
async fn get_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SongResponse>> {
    tracing::debug!("Fetching song with id: {}", id);
    let not_found = || {
        tracing::warn!("Song {} not found", id);
        ApiError::NotFound(format!("Song with id {} not found", id))
    };

    let Ok(numeric_id) = id.trim().parse::<u64>() else {
        return Err(not_found());
    };

    let song = state
        .store
        .read()
        .await?
        .into_songs()
        .into_iter()
        .find(|s| s.id == numeric_id)
        .ok_or_else(not_found)?;

    Ok(Json(SongResponse {
        success: true,
        song,
    }))
}

/// Create a song from an uploaded cover and audio file
async fn create_song(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<SongResponse>)> {
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!("Rejected create request: {}", e);
        ApiError::Validation(format!("Expected a multipart/form-data request: {}", e))
    })?;

    let submission = state.uploads.accept(&mut multipart).await?;
    tracing::debug!(
        "Creating song: title={:?}, artist={:?}, cover={} bytes, audio={} bytes",
        submission.title,
        submission.artist,
        submission.cover.size,
        submission.song.size
    );

    let song = match state.store.append(submission.to_new_song()).await {
        Ok(song) => song,
        Err(e) => {
            for asset in submission.assets() {
                tracing::warn!("Orphaned asset after failed append: {}", asset.path.display());
            }
            return Err(e.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(SongResponse {
            success: true,
            song,
        }),
    ))
}
