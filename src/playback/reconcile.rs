//! Playlist reconciliation
//!
//! When the active playlist is edited while it is driving the queue, the
//! live queue must follow the playlist's new shape without needlessly
//! restarting the currently playing track. Only edits that touch queue
//! position 1 may re-evaluate playback; interior edits never do.

use crate::error::Result;
use crate::playback::engine::PlayerEngine;
use crate::playback::selection;
use crate::playlist::Playlist;
use tracing::debug;

/// The song a playlist mutation added or removed
#[derive(Debug, Clone, Copy)]
pub struct ChangedSong {
    pub id: i64,
    /// Explicit playlist position of an addition; removals and plain appends
    /// leave this unset
    pub position: Option<usize>,
}

impl PlayerEngine {
    /// Reconcile the live queue with a mutated playlist
    ///
    /// A no-op unless the mutated playlist is the active queue source.
    /// `new_playlist` must be the complete post-mutation playlist as returned
    /// by the playlist store.
    pub async fn playlist_changed(
        &mut self,
        new_playlist: Playlist,
        changed: ChangedSong,
    ) -> Result<()> {
        if !self.session.is_active_playlist(&new_playlist.name) {
            return Ok(());
        }

        let old_len = self
            .session
            .active_playlist
            .as_ref()
            .map(|p| p.songs.len())
            .unwrap_or(0);
        let new_len = new_playlist.songs.len();

        // A rejected or redundant edit (duplicate add) changes nothing
        if new_len == old_len {
            self.session.active_playlist = Some(new_playlist);
            return Ok(());
        }

        debug!(
            "Reconciling playlist '{}': {} -> {} songs (changed song {})",
            new_playlist.name, old_len, new_len, changed.id
        );

        if self.session.shuffle_enabled {
            if new_len < old_len {
                self.reconcile_shuffle_removal(new_playlist, changed).await
            } else {
                self.reconcile_shuffle_growth(new_playlist, old_len).await
            }
        } else if new_len < old_len {
            self.reconcile_removal(new_playlist, changed).await
        } else {
            self.reconcile_addition(new_playlist, changed).await
        }
    }

    /// Non-shuffle removal: drop the song from the queue; playback is only
    /// re-evaluated when the removed entry was the queue head
    async fn reconcile_removal(
        &mut self,
        new_playlist: Playlist,
        changed: ChangedSong,
    ) -> Result<()> {
        self.session.active_playlist = Some(new_playlist);

        let old = self.session.queue.snapshot();
        let removed_pos = changed
            .position
            .or_else(|| self.session.queue.position_of(changed.id));

        self.session.queue.dequeue(changed.id, None);

        if removed_pos == Some(1) {
            self.queue_changed_play(&old, false, None).await?;
        }
        Ok(())
    }

    /// Non-shuffle addition: insert next to the playlist neighbour so
    /// interior ordering is preserved and the playing head is untouched
    async fn reconcile_addition(
        &mut self,
        new_playlist: Playlist,
        changed: ChangedSong,
    ) -> Result<()> {
        // The anchor is the playlist predecessor of the new song: for an
        // append that is the playlist's previous last entry; for an explicit
        // position it is position-1, wrapping to the playlist tail at the top.
        let anchor_pos = match changed.position {
            None => new_playlist.songs.len().saturating_sub(1),
            Some(p) if p <= 1 => new_playlist.songs.len(),
            Some(p) => p - 1,
        };
        let anchor_id = new_playlist.entry_at(anchor_pos).map(|e| e.id);

        self.session.active_playlist = Some(new_playlist);
        let old = self.session.queue.snapshot();

        let queue_pos = anchor_id
            .and_then(|id| self.session.queue.position_of(id))
            .map(|p| p + 1);

        // Anchor missing from the live queue: fall back to a tail append
        let inserted_at = self.session.queue.enqueue(changed.id, queue_pos);
        debug!(
            "Playlist addition: song {} inserted at queue position {}",
            changed.id, inserted_at
        );

        self.queue_changed_play(&old, false, None).await
    }

    /// Shuffle removal: mirror the non-shuffle removal, then shrink the
    /// queue tail when the shuffled window target got smaller
    async fn reconcile_shuffle_removal(
        &mut self,
        new_playlist: Playlist,
        changed: ChangedSong,
    ) -> Result<()> {
        let target = new_playlist.songs.len().div_ceil(2);
        self.session.active_playlist = Some(new_playlist);

        let old = self.session.queue.snapshot();
        let removed_pos = changed
            .position
            .or_else(|| self.session.queue.position_of(changed.id));

        self.session.queue.dequeue(changed.id, None);

        if target < self.session.queue.len() {
            self.session.queue.dequeue_tail();
        }

        if removed_pos == Some(1) {
            self.queue_changed_play(&old, false, None).await?;
        }
        Ok(())
    }

    /// Shuffle growth: only reacts when the shuffled window target actually
    /// grew, drawing one not-yet-queued track from the playlist
    async fn reconcile_shuffle_growth(
        &mut self,
        new_playlist: Playlist,
        old_len: usize,
    ) -> Result<()> {
        let grew = new_playlist.songs.len().div_ceil(2) > old_len.div_ceil(2);
        let songs = new_playlist.songs.clone();
        self.session.active_playlist = Some(new_playlist);

        if !grew {
            return Ok(());
        }

        let old = self.session.queue.snapshot();
        let exclude: Vec<i64> = old.iter().map(|e| e.song_id).collect();

        if let Some(entry) = selection::pick_random_unique(&songs, &exclude) {
            self.session.queue.enqueue(entry.id, None);
            debug!("Shuffle window grew, drew song {}", entry.id);

            // A tail append only matters to playback when it became the head
            if old.is_empty() {
                self.queue_changed_play(&old, false, None).await?;
            }
        }
        Ok(())
    }
}
