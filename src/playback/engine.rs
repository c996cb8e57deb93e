//! Player engine
//!
//! Executes every queue-affecting operation. One instance is owned by the
//! command serializer's worker; methods take `&mut self` and are only ever
//! called from that worker, so the session needs no locking.
//!
//! The playlist reconciliation half of the engine lives in
//! [`crate::playback::reconcile`].

use crate::error::{Error, Result};
use crate::library;
use crate::playback::controller::PlaybackController;
use crate::playback::queue::TrackRef;
use crate::playback::selection;
use crate::playback::session::{PlaybackSession, SessionSnapshot};
use crate::playlist::Playlist;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{debug, info};

/// Seeking "previous" within the first seconds restarts the track instead
const PREVIOUS_RESTART_THRESHOLD_SECS: f64 = 5.0;

/// Queue, history and session mutator; drives the playback controller
pub struct PlayerEngine {
    pub(crate) session: PlaybackSession,
    pub(crate) controller: Arc<PlaybackController>,
    pub(crate) db: Pool<Sqlite>,
}

impl PlayerEngine {
    pub fn new(controller: Arc<PlaybackController>, db: Pool<Sqlite>) -> Self {
        Self {
            session: PlaybackSession::new(),
            controller,
            db,
        }
    }

    /// Current queue contents
    pub fn queue_entries(&self) -> Vec<TrackRef> {
        self.session.queue.snapshot()
    }

    /// Insert a song into the queue by hand
    ///
    /// A manual edit takes over the queue: any active playlist context is
    /// dropped. A head insert (or an insert into an empty queue) re-evaluates
    /// what should be playing.
    pub async fn enqueue(&mut self, song_id: i64, position: Option<usize>) -> Result<()> {
        if library::song_by_id(&self.db, song_id).await?.is_none() {
            return Err(Error::NotFound(format!("song {}", song_id)));
        }

        let old = self.session.queue.snapshot();
        self.session.leave_playlist_mode();

        let inserted_at = self.session.queue.enqueue(song_id, position);
        debug!("Enqueued song {} at position {}", song_id, inserted_at);

        if inserted_at == 1 {
            self.queue_changed_play(&old, true, None).await?;
        }
        Ok(())
    }

    /// Remove a song from the queue by hand
    ///
    /// Resolves the position from the first matching entry when unspecified;
    /// silently a no-op when the song is not queued.
    pub async fn dequeue(&mut self, song_id: i64, position: Option<usize>) -> Result<()> {
        let old = self.session.queue.snapshot();
        self.session.leave_playlist_mode();

        let position = match position.or_else(|| self.session.queue.position_of(song_id)) {
            Some(p) => p,
            None => return Ok(()),
        };

        self.session.queue.dequeue(song_id, Some(position));
        debug!("Dequeued song {} from position {}", song_id, position);

        if position == 1 {
            self.queue_changed_play(&old, true, None).await?;
        }
        Ok(())
    }

    /// Play a specific song now (insert at queue head)
    pub async fn play(&mut self, song_id: i64) -> Result<()> {
        if library::song_by_id(&self.db, song_id).await?.is_none() {
            return Err(Error::NotFound(format!("song {}", song_id)));
        }

        let old = self.session.queue.snapshot();

        // Playing a single song replaces a playlist-driven queue wholesale
        if self.session.active_playlist.is_some() {
            self.session.queue.clear();
            self.session.leave_playlist_mode();
        }

        self.session.queue.enqueue(song_id, Some(1));
        self.controller.resume().await?;
        self.queue_changed_play(&old, true, None).await
    }

    /// Go back: restart the track when well into it, otherwise replay the
    /// most recent history entry
    pub async fn previous(&mut self) -> Result<()> {
        let state = self.controller.get_state().await?;
        if state.position > PREVIOUS_RESTART_THRESHOLD_SECS {
            return self.controller.set_position(0.0).await;
        }

        let Some(last_id) = self.session.history.pop() else {
            return Ok(());
        };

        let old = self.session.queue.snapshot();
        self.session.queue.enqueue(last_id, Some(1));

        // A shuffled queue keeps its window size; the head insert pushes one out
        if self.session.shuffle_enabled {
            self.session.queue.dequeue_tail();
        }

        self.queue_changed_play(&old, true, None).await
    }

    /// Consume the queue head and move on
    ///
    /// Runs for both the natural song-end event and an explicit "next".
    /// Repeat mode refills the tail: without shuffle the just-played song
    /// comes back, with shuffle a random not-yet-queued playlist track does.
    pub async fn advance(&mut self) -> Result<()> {
        if let Some(head) = self.session.queue.head().copied() {
            self.session.history.push(head.song_id);
        }

        let old = self.session.queue.snapshot();

        if let Some(head) = self.session.queue.head().copied() {
            self.session.queue.dequeue(head.song_id, Some(1));
        }

        if self.session.repeat_enabled && !self.session.shuffle_enabled {
            if let Some(last_id) = self.session.history.pop() {
                self.session.queue.enqueue(last_id, None);
            }
        }

        if self.session.repeat_enabled && self.session.shuffle_enabled {
            if let Some(playlist) = &self.session.active_playlist {
                // Exclude everything queued before the advance, including the
                // consumed head, so the same song is not drawn right back
                let exclude: Vec<i64> = old.iter().map(|e| e.song_id).collect();
                if let Some(entry) = selection::pick_random_unique(&playlist.songs, &exclude) {
                    self.session.queue.enqueue(entry.id, None);
                }
            }
        }

        self.queue_changed_play(&old, true, None).await
    }

    /// Replace the queue with a playlist
    ///
    /// Non-shuffle activations mirror the playlist 1:1; shuffled ones seed
    /// the queue with a random half-window. Repeat is switched on.
    pub async fn activate_playlist(&mut self, playlist: Playlist, shuffle: bool) -> Result<()> {
        info!(
            "Activating playlist '{}' ({} songs, shuffle={})",
            playlist.name,
            playlist.songs.len(),
            shuffle
        );

        let old = self.session.queue.snapshot();

        self.session.history.clear();
        self.toggle_repeat(Some(true));
        self.session.shuffle_enabled = shuffle;
        self.session.queue.clear();

        let seed = if shuffle {
            selection::sample_half(&playlist.songs)
        } else {
            playlist.songs.clone()
        };
        for entry in &seed {
            self.session.queue.enqueue(entry.id, None);
        }
        self.session.active_playlist = Some(playlist);

        self.controller.resume().await?;
        self.queue_changed_play(&old, true, None).await
    }

    /// Toggle (or force) repeat mode, returning the new value
    pub fn toggle_repeat(&mut self, force: Option<bool>) -> bool {
        let repeat = force.unwrap_or(!self.session.repeat_enabled);
        self.session.repeat_enabled = repeat;
        self.controller.set_repeating(repeat);
        repeat
    }

    /// Restore a persisted session and resume playback where it left off
    pub async fn restore(&mut self, snapshot: SessionSnapshot) -> Result<()> {
        let old = self.session.queue.snapshot();
        let resume = snapshot.last_position_secs;
        self.session = snapshot.restore();
        self.controller.set_repeating(self.session.repeat_enabled);
        self.queue_changed_play(&old, true, Some(resume)).await
    }

    /// Capture the session for shutdown persistence
    pub fn snapshot(&self, last_position_secs: f64, volume: f64) -> SessionSnapshot {
        SessionSnapshot::capture(&self.session, last_position_secs, volume)
    }

    /// Queue-head-changed check
    ///
    /// Decides whether a queue mutation requires touching playback:
    /// - empty queue stops playback;
    /// - an empty pre-mutation snapshot, a `force` flag, or a different head
    ///   song starts the new head (optionally seeking to `resume`);
    /// - a head that merely *looks* unchanged gets one tie-break: when the
    ///   snapshot's second entry equals the new head and the queue did not
    ///   simply grow by one, the old head was consumed and the new head must
    ///   start;
    /// - anything else leaves playback undisturbed.
    pub(crate) async fn queue_changed_play(
        &mut self,
        old: &[TrackRef],
        force: bool,
        resume: Option<f64>,
    ) -> Result<()> {
        let Some(head) = self.session.queue.head().copied() else {
            debug!("Queue emptied, stopping playback");
            return self.controller.stop().await;
        };

        let should_play = if old.is_empty() || force {
            true
        } else if old[0].song_id != head.song_id {
            true
        } else {
            old.get(1).map(|e| e.song_id) == Some(head.song_id)
                && self.session.queue.len() != old.len() + 1
        };

        if !should_play {
            return Ok(());
        }

        // A head pointing at a song the library no longer knows is left alone
        let Some(track) = library::song_by_id(&self.db, head.song_id).await? else {
            debug!("Queue head {} not in library, skipping play", head.song_id);
            return Ok(());
        };

        self.controller.play(track, resume).await
    }
}
