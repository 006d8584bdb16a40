use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A catalog entry as persisted in the store document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub cover_path: String,
    pub song_path: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields supplied by a create request, before an id is assigned
#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub cover_path: String,
    pub song_path: String,
}

impl NewSong {
    /// Stamp the record with its id and creation time.
    pub fn into_song(self, id: u64) -> Song {
        let now = timestamp_now();
        Song {
            id,
            title: self.title,
            artist: self.artist,
            cover_path: self.cover_path,
            song_path: self.song_path,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Next id to assign: one past the largest existing id, 1 for an empty catalog.
/// `None` once the largest id is `u64::MAX`.
pub fn next_id(songs: &[Song]) -> Option<u64> {
    match songs.iter().map(|s| s.id).max() {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}

/// Current UTC time as ISO-8601 with millisecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: u64) -> Song {
        NewSong {
            title: format!("Song {}", id),
            artist: "Artist".to_string(),
            cover_path: "/covers/c.png".to_string(),
            song_path: "/songs/s.mp3".to_string(),
        }
        .into_song(id)
    }

    #[test]
    fn test_next_id_empty_catalog() {
        assert_eq!(next_id(&[]), Some(1));
    }

    #[test]
    fn test_next_id_uses_max_not_len() {
        let songs = vec![song(7), song(2), song(4)];
        assert_eq!(next_id(&songs), Some(8));
    }

    #[test]
    fn test_next_id_exhausted_at_max() {
        assert_eq!(next_id(&[song(u64::MAX)]), None);
    }

    #[test]
    fn test_json_keys_are_camel_case() {
        let value = serde_json::to_value(song(1)).unwrap();
        for key in ["id", "title", "artist", "coverPath", "songPath", "createdAt", "updatedAt"] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
    }

    #[test]
    fn test_timestamps_set_at_creation() {
        let s = song(3);
        assert_eq!(s.created_at, s.updated_at);
        assert!(s.created_at.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&s.created_at).is_ok());
    }
}
