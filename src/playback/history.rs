//! Bounded history of recently played songs
//!
//! Feeds the "previous" action and repeat-without-shuffle refill. Capacity
//! is fixed at 5; pushing evicts the oldest entry.

use serde::{Deserialize, Serialize};

const CAPACITY: usize = 5;

/// Last-played song ids, most recent last
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryRing {
    entries: Vec<i64>,
}

impl HistoryRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted snapshot, keeping only the newest entries
    pub fn from_entries(mut entries: Vec<i64>) -> Self {
        if entries.len() > CAPACITY {
            entries.drain(..entries.len() - CAPACITY);
        }
        Self { entries }
    }

    /// Record a played song, evicting the oldest past capacity
    pub fn push(&mut self, song_id: i64) {
        self.entries.push(song_id);
        if self.entries.len() > CAPACITY {
            self.entries.remove(0);
        }
    }

    /// Remove and return the most recently played song
    pub fn pop(&mut self) -> Option<i64> {
        self.entries.pop()
    }

    pub fn entries(&self) -> &[i64] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
