//! Music folder scanner
//!
//! Walks the configured music folder at startup and inserts files the
//! library has not seen yet, reading title/artist/duration from their tags.
//! Files whose tags cannot be read fall back to the file stem as the title.

use crate::error::Result;
use crate::library;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::read_from_path;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "m4a", "wav"];

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Scan the music folder, inserting files not yet in the library
///
/// Returns the number of newly added songs.
pub async fn scan_folder(db: &Pool<Sqlite>, folder: &Path) -> Result<usize> {
    info!("Scanning music folder {}", folder.display());

    let mut added = 0;

    for entry in WalkDir::new(folder).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_audio_file(path) {
            continue;
        }

        let path_str = path.to_string_lossy().to_string();
        if library::song_by_path(db, &path_str).await?.is_some() {
            continue;
        }

        let (name, artist, duration) = read_tags(path);
        library::insert_song(db, &name, artist.as_deref(), duration, &path_str).await?;
        debug!("Added {} ({})", name, path_str);
        added += 1;
    }

    info!("Scan complete, {} new songs", added);
    Ok(added)
}

/// Best-effort tag read; falls back to the file stem on failure
fn read_tags(path: &Path) -> (String, Option<String>, i64) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match read_from_path(path) {
        Ok(tagged) => {
            let duration = tagged.properties().duration().as_secs() as i64;
            let (name, artist) = match tagged.primary_tag() {
                Some(tag) => (
                    tag.title().map(|t| t.to_string()).unwrap_or(stem),
                    tag.artist().map(|a| a.to_string()),
                ),
                None => (stem, None),
            };
            (name, artist, duration)
        }
        Err(e) => {
            warn!("Could not read tags from {}: {}", path.display(), e);
            (stem, None, 0)
        }
    }
}
