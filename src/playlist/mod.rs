//! Playlist store
//!
//! One JSON file per playlist under the configured playlist folder. Every
//! mutating call returns the complete new playlist; the reconciler needs the
//! post-mutation shape to adjust a live queue.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// One playlist entry; positions are dense and 1-based
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub id: i64,
    pub position: usize,
}

/// A named, ordered set of songs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub songs: Vec<PlaylistEntry>,
}

impl Playlist {
    /// Entry for a given song id, if present
    pub fn entry(&self, song_id: i64) -> Option<&PlaylistEntry> {
        self.songs.iter().find(|e| e.id == song_id)
    }

    /// Entry at a given 1-based position, if present
    pub fn entry_at(&self, position: usize) -> Option<&PlaylistEntry> {
        self.songs.iter().find(|e| e.position == position)
    }
}

/// File-backed playlist storage
#[derive(Debug, Clone)]
pub struct PlaylistStore {
    dir: PathBuf,
}

/// Collapse anything outside `[a-z0-9_-]` so names stay valid filenames
fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl PlaylistStore {
    /// Open the store, creating the folder if missing
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", safe_name(name)))
    }

    fn read(&self, path: &Path) -> Result<Playlist> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn write(&self, playlist: &Playlist) -> Result<()> {
        let data = serde_json::to_string_pretty(playlist)?;
        std::fs::write(self.file_path(&playlist.name), data)?;
        Ok(())
    }

    /// All playlists on disk
    pub fn list_all(&self) -> Result<Vec<Playlist>> {
        let mut playlists = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                playlists.push(self.read(&path)?);
            }
        }
        playlists.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(playlists)
    }

    /// Load one playlist, None when absent
    pub fn load(&self, name: &str) -> Result<Option<Playlist>> {
        let path = self.file_path(name);
        if !path.exists() {
            return Ok(None);
        }
        self.read(&path).map(Some)
    }

    /// Create an empty playlist
    pub fn create(&self, name: &str) -> Result<Playlist> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("playlist name is empty".to_string()));
        }
        if self.file_path(name).exists() {
            return Err(Error::AlreadyExists(format!("playlist '{}'", name)));
        }

        let playlist = Playlist {
            name: name.to_string(),
            songs: Vec::new(),
        };
        self.write(&playlist)?;
        info!("Created playlist '{}'", name);
        Ok(playlist)
    }

    /// Add a song, shifting later positions up by one
    ///
    /// Appends when no position is given. Adding a song already present is a
    /// no-op that returns the unchanged playlist.
    pub fn add_track(
        &self,
        name: &str,
        song_id: i64,
        position: Option<usize>,
    ) -> Result<Playlist> {
        let mut playlist = self
            .load(name)?
            .ok_or_else(|| Error::NotFound(format!("playlist '{}'", name)))?;

        if playlist.entry(song_id).is_some() {
            return Ok(playlist);
        }

        let position = position.unwrap_or(playlist.songs.len() + 1);
        if position == 0 {
            return Err(Error::InvalidInput("position must be >= 1".to_string()));
        }

        for entry in &mut playlist.songs {
            if entry.position >= position {
                entry.position += 1;
            }
        }
        playlist.songs.push(PlaylistEntry {
            id: song_id,
            position,
        });
        playlist.songs.sort_by_key(|e| e.position);

        self.write(&playlist)?;
        Ok(playlist)
    }

    /// Remove a song, closing the gap it leaves
    pub fn remove_track(&self, name: &str, song_id: i64) -> Result<Playlist> {
        let mut playlist = self
            .load(name)?
            .ok_or_else(|| Error::NotFound(format!("playlist '{}'", name)))?;

        if let Some(removed_pos) = playlist.entry(song_id).map(|e| e.position) {
            playlist.songs.retain(|e| e.id != song_id);
            for entry in &mut playlist.songs {
                if entry.position > removed_pos {
                    entry.position -= 1;
                }
            }
        }

        self.write(&playlist)?;
        Ok(playlist)
    }

    /// Delete a playlist file
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.file_path(name);
        if !path.exists() {
            return Err(Error::NotFound(format!("playlist '{}'", name)));
        }
        std::fs::remove_file(path)?;
        info!("Removed playlist '{}'", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, PlaylistStore) {
        let dir = TempDir::new().unwrap();
        let store = PlaylistStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn create_then_load_round_trips() {
        let (_dir, store) = store();

        store.create("morning").unwrap();
        let loaded = store.load("morning").unwrap().unwrap();
        assert_eq!(loaded.name, "morning");
        assert!(loaded.songs.is_empty());

        assert!(store.load("missing").unwrap().is_none());
    }

    #[test]
    fn create_collision_is_already_exists() {
        let (_dir, store) = store();

        store.create("mix").unwrap();
        assert!(matches!(store.create("mix"), Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn empty_name_rejected() {
        let (_dir, store) = store();
        assert!(matches!(store.create("  "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn add_keeps_positions_dense() {
        let (_dir, store) = store();
        store.create("mix").unwrap();

        store.add_track("mix", 10, None).unwrap();
        store.add_track("mix", 20, None).unwrap();
        let pl = store.add_track("mix", 30, Some(2)).unwrap();

        let ids: Vec<i64> = pl.songs.iter().map(|e| e.id).collect();
        let positions: Vec<usize> = pl.songs.iter().map(|e| e.position).collect();
        assert_eq!(ids, vec![10, 30, 20]);
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_add_is_noop() {
        let (_dir, store) = store();
        store.create("mix").unwrap();

        store.add_track("mix", 10, None).unwrap();
        let pl = store.add_track("mix", 10, None).unwrap();
        assert_eq!(pl.songs.len(), 1);
    }

    #[test]
    fn remove_compacts_positions() {
        let (_dir, store) = store();
        store.create("mix").unwrap();
        store.add_track("mix", 1, None).unwrap();
        store.add_track("mix", 2, None).unwrap();
        store.add_track("mix", 3, None).unwrap();

        let pl = store.remove_track("mix", 2).unwrap();
        let positions: Vec<usize> = pl.songs.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1, 2]);
        assert!(pl.entry(2).is_none());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.delete("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn names_are_sanitized_on_disk() {
        let (dir, store) = store();
        store.create("week end/mix").unwrap();
        assert!(dir.path().join("week_end_mix.json").exists());
    }
}
