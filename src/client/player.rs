use std::time::Duration;

use crate::song::Song;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
    Ended,
}

/// Input to the player: user actions and notifications from the audio backend
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Start the track at this catalog index
    Select(usize),
    TogglePlay,
    Next,
    /// Backend started producing audio
    Started,
    /// Backend paused
    Paused,
    MetadataLoaded(Duration),
    TimeUpdate(Duration),
    SeekStart,
    SeekTo(Duration),
    SeekEnd,
    /// Backend reached the end of the current track
    Ended,
}

/// Work the audio backend must carry out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEffect {
    Load { index: usize, song_path: String },
    Play,
    Pause,
    Seek(Duration),
}

/// Position control: follows playback unless the user is dragging it
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeekBar {
    pub position: Duration,
    pub duration: Option<Duration>,
    pub dragging: bool,
}

/// Playback over a snapshot of the catalog.
#[derive(Debug, Clone)]
pub struct Player {
    tracks: Vec<Song>,
    current: Option<usize>,
    state: PlaybackState,
    seek: SeekBar,
}

impl Player {
    pub fn new(tracks: Vec<Song>) -> Self {
        Self {
            tracks,
            current: None,
            state: PlaybackState::Stopped,
            seek: SeekBar::default(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn seek_bar(&self) -> &SeekBar {
        &self.seek
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    /// Swap in a new catalog snapshot, following the current song by id.
    pub fn replace_tracks(&mut self, tracks: Vec<Song>) {
        let current_id = self.current_song().map(|s| s.id);
        self.tracks = tracks;
        self.current = current_id.and_then(|id| self.tracks.iter().position(|s| s.id == id));
        if self.current.is_none() {
            self.state = PlaybackState::Stopped;
            self.seek = SeekBar::default();
        }
    }

    pub fn handle(&mut self, event: PlayerEvent) -> Vec<PlayerEffect> {
        match event {
            PlayerEvent::Select(index) => self.select(index),
            PlayerEvent::TogglePlay => match (self.current, self.state) {
                (None, _) => Vec::new(),
                (Some(_), PlaybackState::Playing) => vec![PlayerEffect::Pause],
                (Some(index), PlaybackState::Ended) => self.select(index),
                (Some(_), _) => vec![PlayerEffect::Play],
            },
            PlayerEvent::Next => self.advance(),
            PlayerEvent::Started => {
                let resumable = matches!(
                    self.state,
                    PlaybackState::Stopped | PlaybackState::Paused
                );
                if self.current.is_some() && resumable {
                    self.state = PlaybackState::Playing;
                }
                Vec::new()
            }
            PlayerEvent::Paused => {
                if self.state == PlaybackState::Playing {
                    self.state = PlaybackState::Paused;
                }
                Vec::new()
            }
            PlayerEvent::MetadataLoaded(duration) => {
                self.seek.duration = Some(duration);
                Vec::new()
            }
            PlayerEvent::TimeUpdate(position) => {
                if !self.seek.dragging {
                    self.seek.position = position;
                }
                Vec::new()
            }
            PlayerEvent::SeekStart => {
                self.seek.dragging = true;
                Vec::new()
            }
            PlayerEvent::SeekTo(position) => {
                if self.current.is_none() {
                    return Vec::new();
                }
                let position = match self.seek.duration {
                    Some(duration) => position.min(duration),
                    None => position,
                };
                self.seek.position = position;
                vec![PlayerEffect::Seek(position)]
            }
            PlayerEvent::SeekEnd => {
                self.seek.dragging = false;
                Vec::new()
            }
            PlayerEvent::Ended => {
                let effects = self.advance();
                if effects.is_empty() {
                    self.state = PlaybackState::Ended;
                }
                effects
            }
        }
    }

    fn select(&mut self, index: usize) -> Vec<PlayerEffect> {
        let Some(song) = self.tracks.get(index) else {
            return Vec::new();
        };
        let song_path = song.song_path.clone();

        self.current = Some(index);
        self.state = PlaybackState::Stopped;
        self.seek = SeekBar::default();

        vec![PlayerEffect::Load { index, song_path }, PlayerEffect::Play]
    }

    /// Move to the next catalog index; nothing past the last track.
    fn advance(&mut self) -> Vec<PlayerEffect> {
        match self.current {
            Some(index) if index + 1 < self.tracks.len() => self.select(index + 1),
            _ => Vec::new(),
        }
    }
}

/// Render a position as `m:ss`
pub fn format_time(time: Duration) -> String {
    let secs = time.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
