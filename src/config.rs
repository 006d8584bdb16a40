use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, Parser)]
#[command(name = "song-catalog")]
#[command(about = "Song Catalog Server", long_about = None)]
pub struct ServerConfig {
    /// Directory holding data/songs.json, covers/ and songs/
    #[arg(short, long, env = "SONG_CATALOG_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Address to bind
    #[arg(long, env = "SONG_CATALOG_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "SONG_CATALOG_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Largest accepted upload request, in megabytes
    #[arg(long, default_value_t = 100)]
    pub max_upload_mb: usize,

    /// Optional directory with a browser frontend, served under /web
    #[arg(long, env = "SONG_CATALOG_WEB_DIR")]
    pub web_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Config rooted at `data_dir` with every other option at its default
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_upload_mb: 100,
            web_dir: None,
        }
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.data_dir.join("data").join("songs.json")
    }

    pub fn covers_dir(&self) -> PathBuf {
        self.data_dir.join("covers")
    }

    pub fn songs_dir(&self) -> PathBuf {
        self.data_dir.join("songs")
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
