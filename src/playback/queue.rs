//! Queue model
//!
//! An ordered list of track references with dense 1-based positions. After
//! every mutation the positions are exactly `1..=len`, sorted ascending;
//! position 1 is the track the controller should be playing.

use serde::{Deserialize, Serialize};

/// One queued track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub song_id: i64,
    pub position: usize,
}

/// The live playback queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Queue {
    entries: Vec<TrackRef>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries, restoring the sort order
    pub fn from_entries(mut entries: Vec<TrackRef>) -> Self {
        entries.sort_by_key(|e| e.position);
        Self { entries }
    }

    /// Insert a track, shifting positions at and above the target up by one
    ///
    /// Appends when no position is given. Positions beyond the end are
    /// clamped to an append so the dense range is preserved. Returns the
    /// position the track actually landed at.
    pub fn enqueue(&mut self, song_id: i64, position: Option<usize>) -> usize {
        let append_at = self.entries.len() + 1;
        let position = position
            .filter(|p| *p >= 1)
            .map(|p| p.min(append_at))
            .unwrap_or(append_at);

        for entry in &mut self.entries {
            if entry.position >= position {
                entry.position += 1;
            }
        }

        self.entries.push(TrackRef { song_id, position });
        self.entries.sort_by_key(|e| e.position);
        position
    }

    /// Remove a `(song_id, position)` pair, closing the gap it leaves
    ///
    /// With no position the first entry matching the song id is removed.
    /// Silently a no-op when nothing matches.
    pub fn dequeue(&mut self, song_id: i64, position: Option<usize>) {
        let position = match position {
            Some(p) => p,
            None => match self.entries.iter().find(|e| e.song_id == song_id) {
                Some(entry) => entry.position,
                None => return,
            },
        };

        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.song_id == song_id && e.position == position));
        if self.entries.len() == before {
            return;
        }

        for entry in &mut self.entries {
            if entry.position > position {
                entry.position -= 1;
            }
        }
        self.entries.sort_by_key(|e| e.position);
    }

    /// Drop the entry at the maximum position
    pub fn dequeue_tail(&mut self) {
        self.entries.pop();
    }

    /// The track at position 1, if any
    pub fn head(&self) -> Option<&TrackRef> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[TrackRef] {
        &self.entries
    }

    /// Shallow copy taken before a mutation, for head-change diffing
    pub fn snapshot(&self) -> Vec<TrackRef> {
        self.entries.clone()
    }

    pub fn contains(&self, song_id: i64) -> bool {
        self.entries.iter().any(|e| e.song_id == song_id)
    }

    /// Position of the first entry with this song id
    pub fn position_of(&self, song_id: i64) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.song_id == song_id)
            .map(|e| e.position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
