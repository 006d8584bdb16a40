//! Client side of the catalog: an HTTP client plus toolkit-independent
//! state machines for the catalog view and the audio player.

pub mod api;
pub mod player;
pub mod view;

pub use api::CatalogClient;
pub use player::{PlaybackState, Player, PlayerEffect, PlayerEvent};
pub use view::{CatalogState, CatalogView, Rendered, SongCard};
