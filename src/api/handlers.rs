//! HTTP request handlers
//!
//! REST endpoints for the song catalog, the playlist store, the queue and
//! the player transport. Anything that mutates queue or session state is
//! submitted to the command serializer; transport reads, pause toggling and
//! volume go straight to the controller.

use crate::api::server::AppContext;
use crate::error::Error;
use crate::library::{self, Track};
use crate::playback::queue::TrackRef;
use crate::playback::reconcile::ChangedSong;
use crate::playback::TransportState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

type ApiError = (StatusCode, Json<StatusResponse>);

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct SongsResponse {
    songs: Vec<Track>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddPlaylistTrackRequest {
    song_id: i64,
    position: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RemovePlaylistTrackRequest {
    song_id: i64,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    queue: Vec<TrackRef>,
}

#[derive(Debug, Deserialize)]
pub struct QueueEntryRequest {
    song_id: i64,
    position: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ActivatePlaylistRequest {
    name: String,
    #[serde(default)]
    shuffle: bool,
}

#[derive(Debug, Serialize)]
pub struct RepeatResponse {
    repeat: bool,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    song_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    volume: f64,
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    volume: f64,
}

/// Map a domain error onto a status code and an error body
fn error_response(e: Error) -> ApiError {
    let code = match &e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::AlreadyExists(_) => StatusCode::CONFLICT,
        Error::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if code == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Request failed: {}", e);
    }
    (
        code,
        Json(StatusResponse {
            status: format!("error: {}", e),
        }),
    )
}

fn ok() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "tonearm".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Songs
// ============================================================================

/// GET /api/songs
pub async fn list_songs(State(ctx): State<AppContext>) -> Result<Json<SongsResponse>, ApiError> {
    let songs = library::all_songs(&ctx.db).await.map_err(error_response)?;
    Ok(Json(SongsResponse { songs }))
}

/// GET /api/songs/:id
pub async fn get_song(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Track>, ApiError> {
    let song = library::song_by_id(&ctx.db, id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(Error::NotFound(format!("song {}", id))))?;
    Ok(Json(song))
}

/// GET /api/songs/search?q=
pub async fn search_songs(
    State(ctx): State<AppContext>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SongsResponse>, ApiError> {
    let songs = library::search_songs(&ctx.db, &params.q)
        .await
        .map_err(error_response)?;
    Ok(Json(SongsResponse { songs }))
}

// ============================================================================
// Playlists
// ============================================================================

/// GET /api/playlists
pub async fn list_playlists(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<crate::playlist::Playlist>>, ApiError> {
    let playlists = ctx.playlists.list_all().map_err(error_response)?;
    Ok(Json(playlists))
}

/// POST /api/playlists
pub async fn create_playlist(
    State(ctx): State<AppContext>,
    Json(req): Json<CreatePlaylistRequest>,
) -> Result<Json<crate::playlist::Playlist>, ApiError> {
    let playlist = ctx.playlists.create(&req.name).map_err(error_response)?;
    Ok(Json(playlist))
}

/// GET /api/playlists/:name
pub async fn get_playlist(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> Result<Json<crate::playlist::Playlist>, ApiError> {
    let playlist = ctx
        .playlists
        .load(&name)
        .map_err(error_response)?
        .ok_or_else(|| error_response(Error::NotFound(format!("playlist '{}'", name))))?;
    Ok(Json(playlist))
}

/// DELETE /api/playlists/:name
pub async fn delete_playlist(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    ctx.playlists.delete(&name).map_err(error_response)?;
    Ok(ok())
}

/// POST /api/playlists/:name/add
///
/// Adds a song to the playlist file, then submits the mutated playlist to
/// the reconciler so a live queue built from it follows the edit.
pub async fn add_playlist_track(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
    Json(req): Json<AddPlaylistTrackRequest>,
) -> Result<Json<crate::playlist::Playlist>, ApiError> {
    if library::song_by_id(&ctx.db, req.song_id)
        .await
        .map_err(error_response)?
        .is_none()
    {
        return Err(error_response(Error::NotFound(format!(
            "song {}",
            req.song_id
        ))));
    }

    let playlist = ctx
        .playlists
        .add_track(&name, req.song_id, req.position)
        .map_err(error_response)?;

    ctx.serializer
        .playlist_changed(
            playlist.clone(),
            ChangedSong {
                id: req.song_id,
                position: req.position,
            },
        )
        .await
        .map_err(error_response)?;

    Ok(Json(playlist))
}

/// POST /api/playlists/:name/remove
pub async fn remove_playlist_track(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
    Json(req): Json<RemovePlaylistTrackRequest>,
) -> Result<Json<crate::playlist::Playlist>, ApiError> {
    let playlist = ctx
        .playlists
        .remove_track(&name, req.song_id)
        .map_err(error_response)?;

    ctx.serializer
        .playlist_changed(
            playlist.clone(),
            ChangedSong {
                id: req.song_id,
                position: None,
            },
        )
        .await
        .map_err(error_response)?;

    Ok(Json(playlist))
}

// ============================================================================
// Queue
// ============================================================================

/// GET /api/queue
pub async fn get_queue(State(ctx): State<AppContext>) -> Result<Json<QueueResponse>, ApiError> {
    let queue = ctx.serializer.get_queue().await.map_err(error_response)?;
    Ok(Json(QueueResponse { queue }))
}

/// POST /api/queue/add
pub async fn add_to_queue(
    State(ctx): State<AppContext>,
    Json(req): Json<QueueEntryRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    ctx.serializer
        .enqueue(req.song_id, req.position)
        .await
        .map_err(error_response)?;
    Ok(ok())
}

/// POST /api/queue/remove
pub async fn remove_from_queue(
    State(ctx): State<AppContext>,
    Json(req): Json<QueueEntryRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    ctx.serializer
        .dequeue(req.song_id, req.position)
        .await
        .map_err(error_response)?;
    Ok(ok())
}

/// POST /api/queue/playlist - rebuild the queue from a stored playlist
pub async fn activate_playlist(
    State(ctx): State<AppContext>,
    Json(req): Json<ActivatePlaylistRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let playlist = ctx
        .playlists
        .load(&req.name)
        .map_err(error_response)?
        .ok_or_else(|| error_response(Error::NotFound(format!("playlist '{}'", req.name))))?;

    info!(
        "Activating playlist '{}' (shuffle: {})",
        req.name, req.shuffle
    );
    ctx.serializer
        .activate_playlist(playlist, req.shuffle)
        .await
        .map_err(error_response)?;
    Ok(ok())
}

/// POST /api/queue/repeat
pub async fn toggle_repeat(
    State(ctx): State<AppContext>,
) -> Result<Json<RepeatResponse>, ApiError> {
    let repeat = ctx
        .serializer
        .toggle_repeat()
        .await
        .map_err(error_response)?;
    Ok(Json(RepeatResponse { repeat }))
}

// ============================================================================
// Player
// ============================================================================

/// POST /api/player/play - clear the queue and play one song immediately
pub async fn play(
    State(ctx): State<AppContext>,
    Json(req): Json<PlayRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    ctx.serializer
        .play(req.song_id)
        .await
        .map_err(error_response)?;
    Ok(ok())
}

/// POST /api/player/toggle - flip between paused and playing
pub async fn toggle_pause(
    State(ctx): State<AppContext>,
) -> Result<Json<TransportState>, ApiError> {
    let state = ctx.controller.get_state().await.map_err(error_response)?;

    if state.is_playing {
        ctx.controller.pause().await.map_err(error_response)?;
    } else {
        ctx.controller.resume().await.map_err(error_response)?;
    }

    let state = ctx.controller.get_state().await.map_err(error_response)?;
    Ok(Json(state))
}

/// POST /api/player/stop
///
/// Only stops when the transport already reports nothing in flight, so a
/// stray stop cannot cut off an active track.
pub async fn stop_if_idle(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, ApiError> {
    let state = ctx.controller.get_state().await.map_err(error_response)?;

    if state.duration == 0.0 && state.position == 0.0 {
        ctx.controller.stop().await.map_err(error_response)?;
    }

    Ok(ok())
}

/// POST /api/player/next
pub async fn next_song(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, ApiError> {
    ctx.serializer.advance().await.map_err(error_response)?;
    Ok(ok())
}

/// POST /api/player/prev
pub async fn previous_song(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, ApiError> {
    ctx.serializer.previous().await.map_err(error_response)?;
    Ok(ok())
}

/// GET /api/player/state
pub async fn get_state(State(ctx): State<AppContext>) -> Result<Json<TransportState>, ApiError> {
    let state = ctx.controller.get_state().await.map_err(error_response)?;
    Ok(Json(state))
}

/// GET /api/player/volume
pub async fn get_volume(State(ctx): State<AppContext>) -> Result<Json<VolumeResponse>, ApiError> {
    let state = ctx.controller.get_state().await.map_err(error_response)?;
    Ok(Json(VolumeResponse {
        volume: state.volume,
    }))
}

/// POST /api/player/volume
pub async fn set_volume(
    State(ctx): State<AppContext>,
    Json(req): Json<VolumeRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    ctx.controller
        .set_volume(req.volume)
        .await
        .map_err(error_response)?;
    Ok(ok())
}
