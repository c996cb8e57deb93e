//! Playback device abstraction
//!
//! The engine never talks to mpv directly; it goes through the [`AudioDevice`]
//! trait so tests can substitute a scripted device. The production
//! implementation is [`mpv::MpvDevice`], which drives one external mpv
//! process over its JSON IPC socket.

pub mod mpv;

// Compiled unconditionally so integration tests can script a device too
pub mod fake;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// One external audio-output process
///
/// Calls are fire-and-forget from the caller's perspective: a failure is
/// surfaced as [`crate::Error::Device`] and never retried here.
#[async_trait]
pub trait AudioDevice: Send + Sync {
    /// Load a media file and start playing it
    async fn load(&self, path: &Path) -> Result<()>;

    /// Stop playback and unload the current file
    async fn stop(&self) -> Result<()>;

    /// Set the pause flag (true = paused)
    async fn set_pause(&self, paused: bool) -> Result<()>;

    /// Seek to an absolute position in seconds
    async fn seek(&self, secs: f64) -> Result<()>;

    /// Current volume (0-100)
    async fn volume(&self) -> Result<f64>;

    /// Set volume (0-100); callers clamp before forwarding
    async fn set_volume(&self, volume: f64) -> Result<()>;

    /// Playback position in seconds, None when nothing is loaded
    async fn time_pos(&self) -> Result<Option<f64>>;

    /// Duration of the loaded file in seconds, None until known
    async fn duration(&self) -> Result<Option<f64>>;

    /// True when no media is loaded or playing
    async fn idle_active(&self) -> Result<bool>;

    /// True when the pause flag is set
    async fn paused(&self) -> Result<bool>;

    /// Tear the device process down
    async fn quit(&self) -> Result<()>;
}
