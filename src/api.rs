//! JSON bodies exchanged between the catalog service and its clients

use serde::{Deserialize, Serialize};

use crate::song::Song;
use crate::store::StoreHealth;

pub const STATUS_OK: &str = "OK";
pub const STATUS_ERROR: &str = "ERROR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub message: String,
    pub timestamp: String,
    /// `connected`, `disconnected` or `error`
    pub database: String,
}

impl HealthReport {
    pub fn from_store(health: &StoreHealth, timestamp: String) -> Self {
        let (status, message, database) = match health {
            StoreHealth::Connected => (
                STATUS_OK,
                "Server is running and the catalog is available".to_string(),
                "connected",
            ),
            StoreHealth::Disconnected => (
                STATUS_ERROR,
                "Catalog file does not exist".to_string(),
                "disconnected",
            ),
            StoreHealth::Error(reason) => (
                STATUS_ERROR,
                format!("Failed to read catalog file: {}", reason),
                "error",
            ),
        };

        Self {
            status: status.to_string(),
            message,
            timestamp,
            database: database.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongListResponse {
    pub success: bool,
    pub count: usize,
    pub songs: Vec<Song>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongResponse {
    pub success: bool,
    pub song: Song,
}

/// Body of every non-2xx API response except health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}
