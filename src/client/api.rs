use std::path::Path;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};

use crate::api::{ErrorResponse, HealthReport, SongListResponse, SongResponse};
use crate::song::Song;

pub const DEFAULT_SERVER: &str = "http://localhost:3001";

/// HTTP client for the catalog service
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    http: reqwest::Client,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a server-relative asset path such as `/covers/x.png`
    pub fn asset_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch the health report; a 503 still yields a report describing the failure.
    pub async fn health(&self) -> Result<HealthReport> {
        let url = format!("{}/api/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to connect to server")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read response")?;
        serde_json::from_str(&body)
            .with_context(|| format!("Server is not available ({})", status))
    }

    pub async fn list_songs(&self) -> Result<Vec<Song>> {
        let url = format!("{}/api/songs", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to connect to server")?;

        let list: SongListResponse = parse_success(response).await?;
        Ok(list.songs)
    }

    /// Look up one song; `None` when the server has no song with that id.
    pub async fn get_song(&self, id: u64) -> Result<Option<Song>> {
        let url = format!("{}/api/songs/{}", self.base_url, id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to connect to server")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let found: SongResponse = parse_success(response).await?;
        Ok(Some(found.song))
    }

    /// Upload a new song with its cover image and audio file.
    pub async fn create_song(
        &self,
        title: &str,
        artist: &str,
        cover: &Path,
        song: &Path,
    ) -> Result<Song> {
        let form = Form::new()
            .text("title", title.to_string())
            .text("artist", artist.to_string())
            .part("cover", file_part(cover).await?)
            .part("song", file_part(song).await?);

        let url = format!("{}/api/songs", self.base_url);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("Failed to connect to server")?;

        let created: SongResponse = parse_success(response).await?;
        Ok(created.song)
    }

    /// Download an asset referenced by a song's `coverPath` or `songPath`.
    pub async fn fetch_asset(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.asset_url(path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to connect to server")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch {}: {}", path, response.status());
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to download {}", path))?;
        Ok(bytes.to_vec())
    }
}

/// Decode a success body, or turn the server's error message into an error.
async fn parse_success<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(error) => anyhow::bail!("{}", error.message),
            Err(_) => anyhow::bail!("Server returned error: {}", status),
        }
    }

    response.json().await.context("Failed to parse response")
}

async fn file_part(path: &Path) -> Result<Part> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    Part::bytes(data)
        .file_name(file_name)
        .mime_str(media_type_for(path))
        .context("Invalid media type")
}

/// Media type declared for an upload, based on its file extension
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_for_extensions() {
        assert_eq!(media_type_for(Path::new("cover.PNG")), "image/png");
        assert_eq!(media_type_for(Path::new("a/b/cover.jpeg")), "image/jpeg");
        assert_eq!(media_type_for(Path::new("track.mp3")), "audio/mpeg");
        assert_eq!(media_type_for(Path::new("track")), "application/octet-stream");
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let client = CatalogClient::new("http://localhost:3001/");
        assert_eq!(client.base_url(), "http://localhost:3001");
        assert_eq!(
            client.asset_url("/covers/cover-1-2.png"),
            "http://localhost:3001/covers/cover-1-2.png"
        );
    }
}
