use crate::api::HealthReport;
use crate::song::Song;

pub const NO_SONGS_MESSAGE: &str = "No songs yet. Try uploading one.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogState {
    Idle,
    CheckingHealth,
    Loading,
    Ready,
    /// Health check failed; the catalog stays hidden
    Unavailable(String),
}

/// One rendered catalog card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongCard {
    /// Position in the full catalog, not in the filtered list
    pub index: usize,
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub cover_url: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Cards(Vec<SongCard>),
    Placeholder(&'static str),
    Unavailable(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadDialog {
    pub open: bool,
    pub error: Option<String>,
}

/// Catalog screen: health gate, song grid, search filter and upload dialog.
#[derive(Debug, Clone)]
pub struct CatalogView {
    base_url: String,
    state: CatalogState,
    songs: Vec<Song>,
    query: String,
    active_id: Option<u64>,
    error: Option<String>,
    upload: UploadDialog,
}

impl CatalogView {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: CatalogState::Idle,
            songs: Vec::new(),
            query: String::new(),
            active_id: None,
            error: None,
            upload: UploadDialog::default(),
        }
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    /// Inline error shown above the grid, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn upload_dialog(&self) -> &UploadDialog {
        &self.upload
    }

    pub fn start(&mut self) {
        self.state = CatalogState::CheckingHealth;
        self.error = None;
    }

    /// Apply the health check outcome. Returns true when the catalog should be fetched.
    pub fn health_checked(&mut self, result: Result<HealthReport, String>) -> bool {
        match result {
            Ok(report) if report.is_ok() => {
                self.state = CatalogState::Loading;
                true
            }
            Ok(report) => {
                let message = format!("Server error: {}", report.message);
                self.error = Some(message.clone());
                self.state = CatalogState::Unavailable(message);
                false
            }
            Err(e) => {
                let message = format!("Could not connect to the server: {}", e);
                self.error = Some(message.clone());
                self.state = CatalogState::Unavailable(message);
                false
            }
        }
    }

    /// Apply the catalog fetch outcome; a failure keeps the songs already shown.
    pub fn catalog_loaded(&mut self, result: Result<Vec<Song>, String>) {
        match result {
            Ok(songs) => {
                self.songs = songs;
                self.error = None;
            }
            Err(e) => {
                self.error = Some(e);
            }
        }
        self.state = CatalogState::Ready;
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Catalog indices of songs matching the current query
    pub fn visible_indices(&self) -> Vec<usize> {
        let needle = self.query.trim().to_lowercase();
        self.songs
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                s.title.to_lowercase().contains(&needle)
                    || s.artist.to_lowercase().contains(&needle)
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn render(&self) -> Rendered {
        if let CatalogState::Unavailable(message) = &self.state {
            return Rendered::Unavailable(message.clone());
        }

        let cards: Vec<SongCard> = self
            .visible_indices()
            .into_iter()
            .map(|index| {
                let song = &self.songs[index];
                SongCard {
                    index,
                    id: song.id,
                    title: song.title.clone(),
                    artist: song.artist.clone(),
                    cover_url: format!("{}{}", self.base_url, song.cover_path),
                    active: self.active_id == Some(song.id),
                }
            })
            .collect();

        if cards.is_empty() {
            Rendered::Placeholder(NO_SONGS_MESSAGE)
        } else {
            Rendered::Cards(cards)
        }
    }

    /// Mark the card at catalog `index` as the only active one.
    pub fn activate(&mut self, index: usize) -> Option<&Song> {
        let song = self.songs.get(index)?;
        self.active_id = Some(song.id);
        Some(song)
    }

    /// Follow the player onto another track, or clear the highlight.
    pub fn set_active(&mut self, id: Option<u64>) {
        self.active_id = id;
    }

    pub fn active_id(&self) -> Option<u64> {
        self.active_id
    }

    pub fn open_upload(&mut self) {
        self.upload = UploadDialog {
            open: true,
            error: None,
        };
    }

    pub fn close_upload(&mut self) {
        self.upload = UploadDialog::default();
    }

    /// A created song goes to the front of the list and the dialog closes.
    pub fn upload_succeeded(&mut self, song: Song) {
        self.songs.insert(0, song);
        self.close_upload();
        self.error = None;
    }

    pub fn upload_failed(&mut self, message: String) {
        self.upload.open = true;
        self.upload.error = Some(message);
    }
}
