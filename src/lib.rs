//! Song Catalog - a small media catalog service
//!
//! A JSON-file backed song list exposed over HTTP, with cover and audio
//! uploads served back as static assets, plus a client library that models
//! the catalog view and audio player as event-driven state machines.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod song;
pub mod store;
pub mod upload;
