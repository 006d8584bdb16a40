use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use axum::extract::multipart::Field;
use tokio::io::AsyncWriteExt;

use crate::error::{ApiError, ApiResult};
use crate::song::NewSong;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Cover,
    Song,
}

impl AssetKind {
    /// Multipart field carrying this asset
    pub fn field_name(self) -> &'static str {
        match self {
            AssetKind::Cover => "cover",
            AssetKind::Song => "song",
        }
    }

    /// URL prefix the static server mounts this asset's directory on
    pub fn url_prefix(self) -> &'static str {
        match self {
            AssetKind::Cover => "/covers",
            AssetKind::Song => "/songs",
        }
    }

    fn media_prefix(self) -> &'static str {
        match self {
            AssetKind::Cover => "image/",
            AssetKind::Song => "audio/",
        }
    }

    fn from_field(name: &str) -> Option<Self> {
        match name {
            "cover" => Some(AssetKind::Cover),
            "song" => Some(AssetKind::Song),
            _ => None,
        }
    }

    pub fn accepts(self, content_type: Option<&str>) -> bool {
        content_type
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with(self.media_prefix()))
            .unwrap_or(false)
    }

    fn rejection(self) -> &'static str {
        match self {
            AssetKind::Cover => "Only image files are allowed for covers",
            AssetKind::Song => "Only audio files are allowed for songs",
        }
    }
}

/// An asset written to disk by the upload handler
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub kind: AssetKind,
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
}

impl StoredAsset {
    /// Server-relative URL the asset is served from
    pub fn url_path(&self) -> String {
        format!("{}/{}", self.kind.url_prefix(), self.file_name)
    }
}

/// A fully validated create request
#[derive(Debug)]
pub struct SongSubmission {
    pub title: String,
    pub artist: String,
    pub cover: StoredAsset,
    pub song: StoredAsset,
}

impl SongSubmission {
    pub fn to_new_song(&self) -> NewSong {
        NewSong {
            title: self.title.clone(),
            artist: self.artist.clone(),
            cover_path: self.cover.url_path(),
            song_path: self.song.url_path(),
        }
    }

    pub fn assets(&self) -> [&StoredAsset; 2] {
        [&self.cover, &self.song]
    }
}

/// Writes cover and audio parts of a create request to their directories.
#[derive(Debug, Clone)]
pub struct UploadHandler {
    covers_dir: PathBuf,
    songs_dir: PathBuf,
}

impl UploadHandler {
    pub fn new(covers_dir: PathBuf, songs_dir: PathBuf) -> Self {
        Self {
            covers_dir,
            songs_dir,
        }
    }

    pub fn dir_for(&self, kind: AssetKind) -> &Path {
        match kind {
            AssetKind::Cover => &self.covers_dir,
            AssetKind::Song => &self.songs_dir,
        }
    }

    /// Read every part of `multipart`, persisting file parts as they arrive.
    ///
    /// Parts are handled in request order: a file part written before a
    /// later part is rejected stays on disk.
    pub async fn accept(&self, multipart: &mut Multipart) -> ApiResult<SongSubmission> {
        let mut title: Option<String> = None;
        let mut artist: Option<String> = None;
        let mut cover: Option<StoredAsset> = None;
        let mut song: Option<StoredAsset> = None;

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            tracing::warn!("Error reading multipart field: {}", e);
            ApiError::Validation(format!("Malformed multipart request: {}", e))
        })? {
            let name = field.name().unwrap_or("").to_string();

            match name.as_str() {
                "title" | "artist" => {
                    let value = field.text().await.map_err(|e| {
                        ApiError::Validation(format!("Failed to read field '{}': {}", name, e))
                    })?;
                    if name == "title" {
                        title = Some(value);
                    } else {
                        artist = Some(value);
                    }
                }
                _ => match AssetKind::from_field(&name) {
                    Some(kind) => {
                        let slot = match kind {
                            AssetKind::Cover => &mut cover,
                            AssetKind::Song => &mut song,
                        };
                        if slot.is_some() {
                            tracing::warn!("Duplicate '{}' part in upload", name);
                            return Err(ApiError::Validation(format!(
                                "Only one '{}' file is allowed",
                                name
                            )));
                        }
                        *slot = Some(self.persist(kind, field).await?);
                    }
                    None => {
                        tracing::debug!("Ignoring unexpected multipart field '{}'", name);
                    }
                },
            }
        }

        let title = non_blank(title);
        let artist = non_blank(artist);
        let (Some(title), Some(artist)) = (title, artist) else {
            warn_orphans([cover.as_ref(), song.as_ref()]);
            return Err(ApiError::Validation(
                "Title and artist are required".to_string(),
            ));
        };

        let (Some(cover), Some(song)) = (cover.clone(), song.clone()) else {
            warn_orphans([cover.as_ref(), song.as_ref()]);
            return Err(ApiError::Validation(
                "Both a cover image and an audio file are required".to_string(),
            ));
        };

        Ok(SongSubmission {
            title,
            artist,
            cover,
            song,
        })
    }

    /// Validate the declared media type and stream the part to disk.
    async fn persist(&self, kind: AssetKind, mut field: Field<'_>) -> ApiResult<StoredAsset> {
        if !kind.accepts(field.content_type()) {
            tracing::warn!(
                "Rejected '{}' part with content type {:?}",
                kind.field_name(),
                field.content_type()
            );
            return Err(ApiError::Validation(kind.rejection().to_string()));
        }

        let dir = self.dir_for(kind);
        tokio::fs::create_dir_all(dir).await?;

        let file_name = generate_file_name(kind, field.file_name());
        let path = dir.join(&file_name);
        let mut file = tokio::fs::File::create(&path).await?;

        let mut size = 0u64;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    discard_partial(&path).await;
                    return Err(ApiError::Validation(format!(
                        "Failed to read '{}' upload: {}",
                        kind.field_name(),
                        e
                    )));
                }
            };
            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                discard_partial(&path).await;
                return Err(e.into());
            }
            size += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!("Stored {} ({} bytes)", path.display(), size);
        Ok(StoredAsset {
            kind,
            file_name,
            path,
            size,
        })
    }
}

/// `<field>-<unix millis>-<random>.<ext>`, keeping the client's extension
/// only when it is plain ASCII alphanumerics.
pub fn generate_file_name(kind: AssetKind, original_name: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().as_u128() % 1_000_000_000;
    let base = format!("{}-{}-{}", kind.field_name(), millis, suffix);

    match original_name.and_then(safe_extension) {
        Some(ext) => format!("{}.{}", base, ext),
        None => base,
    }
}

fn safe_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn warn_orphans(assets: [Option<&StoredAsset>; 2]) {
    for asset in assets.into_iter().flatten() {
        tracing::warn!(
            "Upload rejected after {} was written; file left in place",
            asset.path.display()
        );
    }
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Failed to remove partial upload {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_name_shape() {
        let name = generate_file_name(AssetKind::Cover, Some("My Cover.PNG"));
        let parts: Vec<&str> = name.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "cover");
        assert!(parts[1].parse::<i64>().is_ok());
        assert!(parts[2].ends_with(".PNG"));
        let suffix: u64 = parts[2].trim_end_matches(".PNG").parse().unwrap();
        assert!(suffix < 1_000_000_000);
    }

    #[test]
    fn test_generated_names_differ() {
        let a = generate_file_name(AssetKind::Song, Some("track.mp3"));
        let b = generate_file_name(AssetKind::Song, Some("track.mp3"));
        assert_ne!(a, b);
        assert!(a.starts_with("song-"));
        assert!(a.ends_with(".mp3"));
    }

    #[test]
    fn test_unsafe_or_missing_extension_is_dropped() {
        assert_eq!(safe_extension("noext"), None);
        assert_eq!(safe_extension("evil.p/hp"), None);
        assert_eq!(safe_extension("weird.m p3"), None);
        assert_eq!(safe_extension("ok.flac"), Some("flac".to_string()));

        let name = generate_file_name(AssetKind::Song, None);
        assert!(!name.contains('.'));
    }

    #[test]
    fn test_media_type_checks() {
        assert!(AssetKind::Cover.accepts(Some("image/png")));
        assert!(AssetKind::Cover.accepts(Some("IMAGE/JPEG")));
        assert!(!AssetKind::Cover.accepts(Some("audio/mpeg")));
        assert!(!AssetKind::Cover.accepts(None));
        assert!(AssetKind::Song.accepts(Some("audio/mpeg")));
        assert!(!AssetKind::Song.accepts(Some("application/octet-stream")));
    }

    #[test]
    fn test_url_path_uses_static_prefix() {
        let asset = StoredAsset {
            kind: AssetKind::Song,
            file_name: "song-1-2.mp3".to_string(),
            path: PathBuf::from("/tmp/songs/song-1-2.mp3"),
            size: 3,
        };
        assert_eq!(asset.url_path(), "/songs/song-1-2.mp3");
    }
}
