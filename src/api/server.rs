//! HTTP server setup and routing
//!
//! Builds the Axum router over the command serializer and the playback
//! controller. Queue and playlist mutation goes through the serializer;
//! transport reads and pause/volume tweaks talk to the controller directly.

use crate::error::{Error, Result};
use crate::playback::{CommandSerializer, PlaybackController};
use crate::playlist::PlaylistStore;
use axum::{
    routing::{delete, get, post},
    Router,
};
use sqlx::{Pool, Sqlite};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
///
/// Clone is cheap: every field is an Arc, a channel handle or a pool.
#[derive(Clone)]
pub struct AppContext {
    pub serializer: CommandSerializer,
    pub controller: Arc<PlaybackController>,
    pub db: Pool<Sqlite>,
    pub playlists: Arc<PlaylistStore>,
}

/// Build the application router
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Song catalog
        .route("/api/songs", get(super::handlers::list_songs))
        .route("/api/songs/search", get(super::handlers::search_songs))
        .route("/api/songs/:id", get(super::handlers::get_song))
        // Playlist store
        .route("/api/playlists", get(super::handlers::list_playlists))
        .route("/api/playlists", post(super::handlers::create_playlist))
        .route("/api/playlists/:name", get(super::handlers::get_playlist))
        .route(
            "/api/playlists/:name",
            delete(super::handlers::delete_playlist),
        )
        .route(
            "/api/playlists/:name/add",
            post(super::handlers::add_playlist_track),
        )
        .route(
            "/api/playlists/:name/remove",
            post(super::handlers::remove_playlist_track),
        )
        // Queue control
        .route("/api/queue", get(super::handlers::get_queue))
        .route("/api/queue/add", post(super::handlers::add_to_queue))
        .route("/api/queue/remove", post(super::handlers::remove_from_queue))
        .route(
            "/api/queue/playlist",
            post(super::handlers::activate_playlist),
        )
        .route("/api/queue/repeat", post(super::handlers::toggle_repeat))
        // Player transport
        .route("/api/player/play", post(super::handlers::play))
        .route("/api/player/toggle", post(super::handlers::toggle_pause))
        .route("/api/player/stop", post(super::handlers::stop_if_idle))
        .route("/api/player/next", post(super::handlers::next_song))
        .route("/api/player/prev", post(super::handlers::previous_song))
        .route("/api/player/state", get(super::handlers::get_state))
        .route("/api/player/volume", get(super::handlers::get_volume))
        .route("/api/player/volume", post(super::handlers::set_volume))
        // Attach application context
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Run the HTTP server until the shutdown future resolves
pub async fn run(
    port: u16,
    ctx: AppContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
