//! Song library (SQLite)
//!
//! Read/write access to the `songs` table. The playback core only ever calls
//! [`song_by_id`]; the rest serves the HTTP surface and the startup scanner.

pub mod scan;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::info;

/// One library entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Track {
    pub id: i64,
    pub name: String,
    pub artist: Option<String>,
    /// Whole seconds, as reported by the tag reader
    pub duration: i64,
    pub path: String,
}

/// Open (creating if missing) the library database and ensure its schema
pub async fn connect(database_path: &Path) -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            artist TEXT,
            duration INTEGER NOT NULL DEFAULT 0,
            path TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(&pool)
    .await?;

    info!("Song library ready at {}", database_path.display());
    Ok(pool)
}

/// Look a song up by id
pub async fn song_by_id(db: &Pool<Sqlite>, id: i64) -> Result<Option<Track>> {
    let track = sqlx::query_as::<_, Track>(
        "SELECT id, name, artist, duration, path FROM songs WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;

    Ok(track)
}

/// Look a song up by file path
pub async fn song_by_path(db: &Pool<Sqlite>, path: &str) -> Result<Option<Track>> {
    let track = sqlx::query_as::<_, Track>(
        "SELECT id, name, artist, duration, path FROM songs WHERE path = ?",
    )
    .bind(path)
    .fetch_optional(db)
    .await?;

    Ok(track)
}

/// All songs, sorted for display (artist, then title, case-insensitive)
pub async fn all_songs(db: &Pool<Sqlite>) -> Result<Vec<Track>> {
    let tracks = sqlx::query_as::<_, Track>(
        r#"
        SELECT id, name, artist, duration, path FROM songs
        ORDER BY artist COLLATE NOCASE ASC, name COLLATE NOCASE ASC
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(tracks)
}

/// Case-insensitive substring search over title and artist
pub async fn search_songs(db: &Pool<Sqlite>, query: &str) -> Result<Vec<Track>> {
    let pattern = format!("%{}%", query);
    let tracks = sqlx::query_as::<_, Track>(
        r#"
        SELECT id, name, artist, duration, path FROM songs
        WHERE name LIKE ? COLLATE NOCASE OR artist LIKE ? COLLATE NOCASE
        ORDER BY artist COLLATE NOCASE ASC, name COLLATE NOCASE ASC
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(db)
    .await?;

    Ok(tracks)
}

/// Insert a new song, returning its id
pub async fn insert_song(
    db: &Pool<Sqlite>,
    name: &str,
    artist: Option<&str>,
    duration: i64,
    path: &str,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO songs (name, artist, duration, path) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(artist)
    .bind(duration)
    .bind(path)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}
