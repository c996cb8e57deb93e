//! # tonearm
//!
//! Personal audio-playback controller: a headless HTTP daemon that maintains
//! a single "now playing" queue and drives an external `mpv` process through
//! it, keeping the queue consistent as playlists are edited and songs finish.
//!
//! **Architecture:** REST control surface (axum) in front of a single-worker
//! command serializer that owns all queue/history/session state and talks to
//! mpv over its JSON IPC socket.

pub mod api;
pub mod config;
pub mod device;
pub mod error;
pub mod library;
pub mod playback;
pub mod playlist;

pub use error::{Error, Result};
