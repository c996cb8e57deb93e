//! Playback session state and its persisted snapshot
//!
//! One [`PlaybackSession`] per process, owned exclusively by the command
//! serializer's worker; no other execution context may read-modify-write it.

use crate::error::Result;
use crate::playback::history::HistoryRing;
use crate::playback::queue::{Queue, TrackRef};
use crate::playlist::Playlist;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// All mutable queue-side state
#[derive(Debug, Clone, Default)]
pub struct PlaybackSession {
    pub queue: Queue,
    pub history: HistoryRing,
    pub repeat_enabled: bool,
    pub shuffle_enabled: bool,
    /// None means the queue is driven by direct enqueue/play actions
    pub active_playlist: Option<Playlist>,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the playlist context: a manual queue edit takes over the queue
    pub fn leave_playlist_mode(&mut self) {
        self.shuffle_enabled = false;
        self.active_playlist = None;
        self.history.clear();
    }

    /// Is the named playlist the active queue source?
    pub fn is_active_playlist(&self, name: &str) -> bool {
        self.active_playlist
            .as_ref()
            .map(|p| p.name == name)
            .unwrap_or(false)
    }
}

/// Session state persisted across restarts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub queue: Vec<TrackRef>,
    pub history: Vec<i64>,
    pub repeat_enabled: bool,
    pub shuffle_enabled: bool,
    pub active_playlist: Option<Playlist>,
    pub last_position_secs: f64,
    /// 0-100, restored before playback resumes
    pub volume: f64,
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Capture the session along with the live transport position/volume
    pub fn capture(session: &PlaybackSession, last_position_secs: f64, volume: f64) -> Self {
        Self {
            queue: session.queue.snapshot(),
            history: session.history.entries().to_vec(),
            repeat_enabled: session.repeat_enabled,
            shuffle_enabled: session.shuffle_enabled,
            active_playlist: session.active_playlist.clone(),
            last_position_secs,
            volume,
            saved_at: Utc::now(),
        }
    }

    /// Rebuild a session from this snapshot
    pub fn restore(&self) -> PlaybackSession {
        PlaybackSession {
            queue: Queue::from_entries(self.queue.clone()),
            history: HistoryRing::from_entries(self.history.clone()),
            repeat_enabled: self.repeat_enabled,
            shuffle_enabled: self.shuffle_enabled,
            active_playlist: self.active_playlist.clone(),
        }
    }

    /// Write the snapshot as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        info!("Session snapshot written to {}", path.display());
        Ok(())
    }

    /// Read a snapshot, None when no file exists yet
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::PlaylistEntry;

    #[test]
    fn snapshot_round_trips_through_disk() {
        let mut session = PlaybackSession::new();
        session.queue.enqueue(10, None);
        session.queue.enqueue(20, None);
        session.history.push(5);
        session.repeat_enabled = true;
        session.shuffle_enabled = true;
        session.active_playlist = Some(Playlist {
            name: "mix".to_string(),
            songs: vec![PlaylistEntry { id: 10, position: 1 }],
        });

        let snapshot = SessionSnapshot::capture(&session, 33.5, 80.0);

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        snapshot.save(&path).unwrap();

        let loaded = SessionSnapshot::load(&path).unwrap().unwrap();
        assert_eq!(loaded.last_position_secs, 33.5);
        assert_eq!(loaded.volume, 80.0);

        let restored = loaded.restore();
        assert_eq!(restored.queue.snapshot(), session.queue.snapshot());
        assert_eq!(restored.history.entries(), session.history.entries());
        assert!(restored.repeat_enabled);
        assert!(restored.is_active_playlist("mix"));
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(SessionSnapshot::load(&dir.path().join("none.json"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn leave_playlist_mode_clears_context() {
        let mut session = PlaybackSession::new();
        session.shuffle_enabled = true;
        session.history.push(1);
        session.active_playlist = Some(Playlist {
            name: "mix".to_string(),
            songs: vec![],
        });

        session.leave_playlist_mode();
        assert!(!session.shuffle_enabled);
        assert!(session.active_playlist.is_none());
        assert!(session.history.is_empty());
    }
}
