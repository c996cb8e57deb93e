//! Playback controller
//!
//! Owns the device handle and the notion of "current song". Translates the
//! device's polled idle flag into a single [`PlayerEvent::SongEnded`] per
//! natural end of track; an explicit [`stop`](PlaybackController::stop)
//! never emits one.

use crate::device::AudioDevice;
use crate::error::Result;
use crate::library::Track;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, warn};

/// Poll period for the device's idle flag
const END_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Backoff while waiting for a freshly loaded file to report its duration
const READY_POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Give up waiting for a duration after this many polls (~6 seconds)
const READY_POLL_ATTEMPTS: u32 = 200;

/// Typed event emitted by the end-of-track monitor
///
/// Consumed by the command serializer as a synthetic advance command, so all
/// queue reconciliation still happens inside the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    SongEnded,
}

/// Live transport state, derived from the device on every read
#[derive(Debug, Clone, Serialize)]
pub struct TransportState {
    pub is_playing: bool,
    pub current: Option<Track>,
    pub is_repeating: bool,
    pub position: f64,
    pub duration: f64,
    /// 0-100
    pub volume: f64,
}

/// Drives one audio device through load/play/pause/stop/seek/volume
pub struct PlaybackController {
    device: Arc<dyn AudioDevice>,
    current: RwLock<Option<Track>>,
    repeating: AtomicBool,
}

impl PlaybackController {
    pub fn new(device: Arc<dyn AudioDevice>) -> Self {
        Self {
            device,
            current: RwLock::new(None),
            repeating: AtomicBool::new(false),
        }
    }

    /// Load and play a track, optionally resuming at a saved position
    ///
    /// Stops whatever is playing first. When resuming, the device is polled
    /// with a short backoff until it reports a duration; seeking before that
    /// point races the load and silently lands at zero.
    pub async fn play(&self, track: Track, resume_secs: Option<f64>) -> Result<()> {
        self.stop().await?;

        debug!("Playing song {} ({})", track.id, track.path);
        let path = std::path::PathBuf::from(&track.path);
        *self.current.write().await = Some(track);

        self.device.load(&path).await?;

        if let Some(pos) = resume_secs.filter(|p| *p > 0.0) {
            self.wait_until_ready().await;
            self.device.set_pause(true).await?;
            self.device.seek(pos).await?;
            self.device.set_pause(false).await?;
        }

        Ok(())
    }

    /// Poll until the device reports a duration for the loaded file
    async fn wait_until_ready(&self) {
        for _ in 0..READY_POLL_ATTEMPTS {
            if let Ok(Some(d)) = self.device.duration().await {
                if d > 0.0 {
                    return;
                }
            }
            sleep(READY_POLL_INTERVAL).await;
        }
        warn!("Device never reported a duration; resume seek may be lost");
    }

    /// Pause; a no-op at the device level if already paused
    pub async fn pause(&self) -> Result<()> {
        self.device.set_pause(true).await
    }

    /// Resume; a no-op at the device level if already playing
    pub async fn resume(&self) -> Result<()> {
        self.device.set_pause(false).await
    }

    /// Stop playback and forget the current song
    ///
    /// Clears the current-song reference before touching the device, so a
    /// monitor tick that races the stop finds no song to report as ended.
    pub async fn stop(&self) -> Result<()> {
        *self.current.write().await = None;
        self.device.stop().await
    }

    /// Current transport state; synthesizes the idle shape when no song is
    /// loaded (volume is still read from the device)
    pub async fn get_state(&self) -> Result<TransportState> {
        let current = self.current.read().await.clone();
        let is_repeating = self.is_repeating();
        let volume = self.device.volume().await.unwrap_or(0.0);

        let Some(track) = current else {
            return Ok(TransportState {
                is_playing: false,
                current: None,
                is_repeating,
                position: 0.0,
                duration: 0.0,
                volume,
            });
        };

        Ok(TransportState {
            is_playing: !self.device.paused().await?,
            current: Some(track),
            is_repeating,
            position: self.device.time_pos().await?.unwrap_or(0.0),
            duration: self.device.duration().await?.unwrap_or(0.0),
            volume,
        })
    }

    /// Set volume, clamped to 0-100
    pub async fn set_volume(&self, volume: f64) -> Result<()> {
        self.device.set_volume(volume.clamp(0.0, 100.0)).await
    }

    /// Seek to an absolute position, clamped to the known duration
    pub async fn set_position(&self, secs: f64) -> Result<()> {
        let Some(duration) = self.device.duration().await? else {
            return Ok(());
        };
        self.device.seek(secs.clamp(0.0, duration)).await
    }

    pub fn set_repeating(&self, repeating: bool) {
        self.repeating.store(repeating, Ordering::Relaxed);
    }

    pub fn is_repeating(&self) -> bool {
        self.repeating.load(Ordering::Relaxed)
    }

    /// Spawn the end-of-track monitor
    ///
    /// Fires exactly once per natural end: a rising idle edge (device was
    /// observed active, now idle) while a current song is set clears the
    /// song and emits [`PlayerEvent::SongEnded`].
    pub fn spawn_end_monitor(
        self: &Arc<Self>,
        events: mpsc::Sender<PlayerEvent>,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = interval(END_POLL_INTERVAL);
            let mut was_active = false;

            loop {
                ticker.tick().await;

                if controller.current.read().await.is_none() {
                    // No song means no edge to detect; forget any old one
                    was_active = false;
                    continue;
                }

                let idle = match controller.device.idle_active().await {
                    Ok(idle) => idle,
                    Err(e) => {
                        warn!("Idle poll failed: {}", e);
                        continue;
                    }
                };

                if !idle {
                    was_active = true;
                    continue;
                }

                if was_active {
                    was_active = false;
                    // An explicit stop clears the song first; only a natural
                    // end still holds one here
                    if controller.current.write().await.take().is_some() {
                        debug!("Song ended, notifying serializer");
                        if events.send(PlayerEvent::SongEnded).await.is_err() {
                            // Serializer gone; nothing left to notify
                            return;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake::FakeDevice;

    fn track(id: i64) -> Track {
        Track {
            id,
            name: format!("song-{}", id),
            artist: None,
            duration: 180,
            path: format!("/music/{}.mp3", id),
        }
    }

    fn controller() -> (Arc<FakeDevice>, PlaybackController) {
        let device = Arc::new(FakeDevice::new());
        let controller = PlaybackController::new(device.clone() as Arc<dyn AudioDevice>);
        (device, controller)
    }

    #[tokio::test]
    async fn play_stops_previous_track_first() {
        let (device, controller) = controller();

        controller.play(track(1), None).await.unwrap();
        controller.play(track(2), None).await.unwrap();

        assert_eq!(device.stop_count(), 2);
        assert_eq!(device.loads().len(), 2);
        assert_eq!(device.loaded().unwrap().to_string_lossy(), "/music/2.mp3");
    }

    #[tokio::test]
    async fn play_with_resume_seeks_after_load() {
        let (device, controller) = controller();

        controller.play(track(1), Some(42.5)).await.unwrap();
        assert_eq!(device.seeks(), vec![42.5]);

        // Zero resume position means no seek at all
        controller.play(track(2), Some(0.0)).await.unwrap();
        assert_eq!(device.seeks(), vec![42.5]);
    }

    #[tokio::test]
    async fn idle_state_still_reports_volume() {
        let (device, controller) = controller();
        device.set_volume(60.0).await.unwrap();

        let state = controller.get_state().await.unwrap();
        assert!(!state.is_playing);
        assert!(state.current.is_none());
        assert_eq!(state.volume, 60.0);
        assert_eq!(state.duration, 0.0);
    }

    #[tokio::test]
    async fn playing_state_reflects_device() {
        let (_device, controller) = controller();
        controller.play(track(7), None).await.unwrap();

        let state = controller.get_state().await.unwrap();
        assert!(state.is_playing);
        assert_eq!(state.current.unwrap().id, 7);
        assert_eq!(state.duration, 180.0);

        controller.pause().await.unwrap();
        assert!(!controller.get_state().await.unwrap().is_playing);
    }

    #[tokio::test]
    async fn volume_is_clamped() {
        let (device, controller) = controller();

        controller.set_volume(150.0).await.unwrap();
        assert_eq!(device.volume().await.unwrap(), 100.0);

        controller.set_volume(-3.0).await.unwrap();
        assert_eq!(device.volume().await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn stop_clears_current_song() {
        let (_device, controller) = controller();
        controller.play(track(1), None).await.unwrap();
        controller.stop().await.unwrap();

        let state = controller.get_state().await.unwrap();
        assert!(state.current.is_none());
    }

    #[tokio::test]
    async fn end_monitor_fires_once_on_idle_edge() {
        let (device, controller) = controller();
        let controller = Arc::new(controller);
        let (tx, mut rx) = mpsc::channel(4);
        let handle = controller.spawn_end_monitor(tx);

        controller.play(track(1), None).await.unwrap();

        // Let the monitor observe the active device, then finish the track
        tokio::time::sleep(Duration::from_millis(600)).await;
        device.finish_track();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("monitor should emit")
            .unwrap();
        assert_eq!(event, PlayerEvent::SongEnded);

        // Current song cleared; no second event without a new play
        assert!(controller.get_state().await.unwrap().current.is_none());
        assert!(
            tokio::time::timeout(Duration::from_millis(600), rx.recv())
                .await
                .is_err()
        );

        handle.abort();
    }

    #[tokio::test]
    async fn explicit_stop_does_not_emit_song_ended() {
        let (_device, controller) = controller();
        let controller = Arc::new(controller);
        let (tx, mut rx) = mpsc::channel(4);
        let handle = controller.spawn_end_monitor(tx);

        controller.play(track(1), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        controller.stop().await.unwrap();

        assert!(
            tokio::time::timeout(Duration::from_millis(800), rx.recv())
                .await
                .is_err()
        );

        handle.abort();
    }

    #[tokio::test]
    async fn stop_does_not_suppress_the_next_natural_end() {
        let (device, controller) = controller();
        let controller = Arc::new(controller);
        let (tx, mut rx) = mpsc::channel(4);
        let handle = controller.spawn_end_monitor(tx);

        // The monitor has seen an active device when the stop lands
        controller.play(track(1), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        controller.stop().await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        // A fresh track that finishes naturally still emits exactly once
        controller.play(track(2), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        device.finish_track();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("monitor should emit for the natural end")
            .unwrap();
        assert_eq!(event, PlayerEvent::SongEnded);
        assert!(
            tokio::time::timeout(Duration::from_millis(600), rx.recv())
                .await
                .is_err()
        );

        handle.abort();
    }
}
