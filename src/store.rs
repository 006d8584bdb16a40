use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::song::{NewSong, Song, next_id};

/// Store failures. Messages never include filesystem paths since they are
/// returned to clients; use [`StoreError::path`] when logging.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("catalog file is not valid JSON: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("catalog I/O error: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("no song id left to assign after {max_id}")]
    IdsExhausted { max_id: u64 },
}

impl StoreError {
    /// File the failure happened on, when there is one
    pub fn path(&self) -> Option<&Path> {
        match self {
            StoreError::Corrupt { path, .. } | StoreError::Io { path, .. } => Some(path),
            StoreError::Serialize(_) | StoreError::IdsExhausted { .. } => None,
        }
    }
}

/// Outcome of reading the store document when it could be read at all.
#[derive(Debug)]
pub enum CatalogRead {
    /// The document does not exist yet
    Missing,
    Loaded(Vec<Song>),
}

impl CatalogRead {
    pub fn into_songs(self) -> Vec<Song> {
        match self {
            CatalogRead::Missing => Vec::new(),
            CatalogRead::Loaded(songs) => songs,
        }
    }
}

/// Availability of the store document as reported by the health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreHealth {
    Connected,
    Disconnected,
    Error(String),
}

/// The JSON document holding the whole catalog.
///
/// Reads go straight to disk on every call. Writes replace the document via
/// a temp file and rename, and `append` holds the write lock across its
/// read-modify-write so concurrent creates are serialized.
#[derive(Clone)]
pub struct SongStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SongStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the catalog, distinguishing a missing document from a broken one.
    pub async fn read(&self) -> Result<CatalogRead, StoreError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Catalog file {} does not exist", self.path.display());
                return Ok(CatalogRead::Missing);
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let songs: Vec<Song> = serde_json::from_str(&data).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Loaded {} songs from {}", songs.len(), self.path.display());
        Ok(CatalogRead::Loaded(songs))
    }

    /// Read the catalog, treating any failure as an empty catalog.
    pub async fn load_all(&self) -> Vec<Song> {
        match self.read().await {
            Ok(read) => read.into_songs(),
            Err(e) => {
                tracing::warn!("Treating unreadable catalog as empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Overwrite the document with `songs`, pretty-printed.
    pub async fn save_all(&self, songs: &[Song]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(songs)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StoreError::Io {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }

        let tmp_path = self.temp_path();
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!("Saved {} songs to {}", songs.len(), self.path.display());
        Ok(())
    }

    /// Assign the next id to `new_song` and append it to the document.
    ///
    /// A corrupt document is reported rather than overwritten.
    pub async fn append(&self, new_song: NewSong) -> Result<Song, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut songs = self.read().await?.into_songs();
        let id = next_id(&songs).ok_or(StoreError::IdsExhausted { max_id: u64::MAX })?;
        let song = new_song.into_song(id);
        songs.push(song.clone());
        self.save_all(&songs).await?;

        tracing::info!("Added song {} ({} - {})", song.id, song.artist, song.title);
        Ok(song)
    }

    /// Check that the document exists and parses as JSON.
    pub async fn probe(&self) -> StoreHealth {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => match serde_json::from_str::<serde_json::Value>(&data) {
                Ok(_) => StoreHealth::Connected,
                Err(e) => StoreHealth::Error(e.to_string()),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreHealth::Disconnected,
            Err(e) => StoreHealth::Error(e.to_string()),
        }
    }

    /// Create an empty document if none exists.
    pub async fn ensure_initialized(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        if tokio::fs::try_exists(&self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?
        {
            return Ok(());
        }

        tracing::info!("Creating empty catalog at {}", self.path.display());
        self.save_all(&[]).await
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "songs.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_song(title: &str) -> NewSong {
        NewSong {
            title: title.to_string(),
            artist: "Tester".to_string(),
            cover_path: "/covers/cover.png".to_string(),
            song_path: "/songs/song.mp3".to_string(),
        }
    }

    fn store_in(dir: &TempDir) -> SongStore {
        SongStore::new(dir.path().join("data").join("songs.json"))
    }

    #[tokio::test]
    async fn test_missing_document_reads_as_missing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(matches!(store.read().await.unwrap(), CatalogRead::Missing));
        assert!(store.load_all().await.is_empty());
        assert_eq!(store.probe().await, StoreHealth::Disconnected);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error_but_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.read().await, Err(StoreError::Corrupt { .. })));
        assert!(store.load_all().await.is_empty());
        assert!(matches!(store.probe().await, StoreHealth::Error(_)));
    }

    #[tokio::test]
    async fn test_save_all_round_trip_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let songs = vec![new_song("A").into_song(1), new_song("B").into_song(2)];

        store.save_all(&songs).await.unwrap();

        assert_eq!(store.load_all().await, songs);
        assert!(!store.temp_path().exists());
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\n  {"), "document should be pretty-printed");
    }

    #[tokio::test]
    async fn test_append_assigns_incrementing_ids() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let first = store.append(new_song("First")).await.unwrap();
        let second = store.append(new_song("Second")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        let titles: Vec<_> = store.load_all().await.into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_append_refuses_to_overwrite_corrupt_document() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "garbage").unwrap();

        assert!(store.append(new_song("Lost")).await.is_err());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "garbage");
    }

    #[tokio::test]
    async fn test_append_at_max_id_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save_all(&[new_song("Last").into_song(u64::MAX)])
            .await
            .unwrap();

        let err = store.append(new_song("Overflow")).await.unwrap_err();

        assert!(matches!(err, StoreError::IdsExhausted { .. }));
        assert_eq!(store.load_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_error_messages_omit_paths() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        let err = store.read().await.unwrap_err();

        assert_eq!(err.path(), Some(store.path()));
        assert!(!err.to_string().contains(&dir.path().display().to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_appends_get_distinct_ids() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(new_song(&format!("Song {}", i))).await.unwrap().id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();

        assert_eq!(ids, (1..=16).collect::<Vec<u64>>());
        assert_eq!(store.load_all().await.len(), 16);
    }

    #[tokio::test]
    async fn test_ensure_initialized_keeps_existing_document() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.ensure_initialized().await.unwrap();
        assert_eq!(store.probe().await, StoreHealth::Connected);

        store.append(new_song("Kept")).await.unwrap();
        store.ensure_initialized().await.unwrap();
        assert_eq!(store.load_all().await.len(), 1);
    }
}
