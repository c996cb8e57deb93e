//! Integration tests for the tonearm HTTP API
//!
//! Drives the full stack (router, command serializer, engine, playlist
//! store, song library) against a scripted in-memory audio device.

use axum::body::Body;
use axum::http::StatusCode;
use http::{Method, Request};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use tonearm::api::server::{router, AppContext};
use tonearm::device::fake::FakeDevice;
use tonearm::device::AudioDevice;
use tonearm::library;
use tonearm::playback::{CommandSerializer, PlaybackController, PlayerEngine};
use tonearm::playlist::PlaylistStore;

/// Build a full application with three known songs and a scripted device
async fn setup() -> (axum::Router, Arc<FakeDevice>, TempDir) {
    let dir = TempDir::new().unwrap();

    let db = library::connect(&dir.path().join("music.db")).await.unwrap();
    for (name, path) in [
        ("Alpha", "/music/alpha.mp3"),
        ("Beta", "/music/beta.mp3"),
        ("Gamma", "/music/gamma.mp3"),
    ] {
        library::insert_song(&db, name, Some("Tester"), 180, path)
            .await
            .unwrap();
    }

    let playlists = Arc::new(PlaylistStore::new(&dir.path().join("playlists")).unwrap());

    let device = Arc::new(FakeDevice::new());
    let controller = Arc::new(PlaybackController::new(
        Arc::clone(&device) as Arc<dyn AudioDevice>
    ));

    let engine = PlayerEngine::new(Arc::clone(&controller), db.clone());
    let serializer = CommandSerializer::spawn(engine);

    let ctx = AppContext {
        serializer,
        controller,
        db,
        playlists,
    };

    (router(ctx), device, dir)
}

async fn request(
    app: &axum::Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(match body {
            Some(json) => Body::from(json.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

#[tokio::test]
async fn health_reports_module_and_version() {
    let (app, _device, _dir) = setup().await;

    let (status, body) = request(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "tonearm");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn song_catalog_endpoints() {
    let (app, _device, _dir) = setup().await;

    let (status, body) = request(&app, Method::GET, "/api/songs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["songs"].as_array().unwrap().len(), 3);

    let (status, body) = request(&app, Method::GET, "/api/songs/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alpha");

    let (status, _) = request(&app, Method::GET, "/api/songs/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = request(&app, Method::GET, "/api/songs/search?q=bet", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["songs"][0]["name"], "Beta");
}

#[tokio::test]
async fn enqueue_on_empty_queue_starts_playback() {
    let (app, device, _dir) = setup().await;

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/queue/add",
        Some(json!({ "song_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(&app, Method::GET, "/api/queue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queue"].as_array().unwrap().len(), 1);
    assert_eq!(body["queue"][0]["song_id"], 1);
    assert_eq!(body["queue"][0]["position"], 1);

    assert_eq!(device.loads(), vec![std::path::PathBuf::from("/music/alpha.mp3")]);

    let (status, body) = request(&app, Method::GET, "/api/player/state", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_playing"], true);
    assert_eq!(body["current"]["id"], 1);
}

#[tokio::test]
async fn enqueue_unknown_song_is_rejected() {
    let (app, device, _dir) = setup().await;

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/queue/add",
        Some(json!({ "song_id": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(device.loads().is_empty());
}

#[tokio::test]
async fn appending_behind_playing_head_does_not_interrupt() {
    let (app, device, _dir) = setup().await;

    for id in [1, 2] {
        let (status, _) = request(
            &app,
            Method::POST,
            "/api/queue/add",
            Some(json!({ "song_id": id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // Only the first add touched the device
    assert_eq!(device.loads().len(), 1);

    let (_, body) = request(&app, Method::GET, "/api/queue", None).await;
    let positions: Vec<u64> = body["queue"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["position"].as_u64().unwrap())
        .collect();
    assert_eq!(positions, vec![1, 2]);
}

#[tokio::test]
async fn playlist_lifecycle() {
    let (app, _device, _dir) = setup().await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/playlists",
        Some(json!({ "name": "morning" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "morning");

    // Duplicate creation is a conflict
    let (status, _) = request(
        &app,
        Method::POST,
        "/api/playlists",
        Some(json!({ "name": "morning" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/playlists/morning/add",
        Some(json!({ "song_id": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["songs"][0]["id"], 2);

    // Unknown songs never reach the playlist file
    let (status, _) = request(
        &app,
        Method::POST,
        "/api/playlists/morning/add",
        Some(json!({ "song_id": 99 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = request(&app, Method::GET, "/api/playlists/morning", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["songs"].as_array().unwrap().len(), 1);

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/playlists/morning/remove",
        Some(json!({ "song_id": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["songs"].as_array().unwrap().is_empty());

    let (status, _) = request(&app, Method::DELETE, "/api/playlists/morning", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request(&app, Method::GET, "/api/playlists/morning", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn activating_a_playlist_fills_the_queue_and_plays() {
    let (app, device, _dir) = setup().await;

    request(
        &app,
        Method::POST,
        "/api/playlists",
        Some(json!({ "name": "all" })),
    )
    .await;
    for id in [1, 2, 3] {
        request(
            &app,
            Method::POST,
            "/api/playlists/all/add",
            Some(json!({ "song_id": id })),
        )
        .await;
    }

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/queue/playlist",
        Some(json!({ "name": "all" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(&app, Method::GET, "/api/queue", None).await;
    let ids: Vec<i64> = body["queue"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["song_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(device.loads().len(), 1);

    // Activation switches repeat on; the next toggle turns it off
    let (status, body) = request(&app, Method::POST, "/api/queue/repeat", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["repeat"], false);
}

#[tokio::test]
async fn editing_the_active_playlist_updates_the_queue() {
    let (app, device, _dir) = setup().await;

    request(
        &app,
        Method::POST,
        "/api/playlists",
        Some(json!({ "name": "live" })),
    )
    .await;
    for id in [1, 2] {
        request(
            &app,
            Method::POST,
            "/api/playlists/live/add",
            Some(json!({ "song_id": id })),
        )
        .await;
    }
    request(
        &app,
        Method::POST,
        "/api/queue/playlist",
        Some(json!({ "name": "live" })),
    )
    .await;
    assert_eq!(device.loads().len(), 1);

    // Appending to the active playlist lands in the queue without
    // interrupting the playing head
    let (status, _) = request(
        &app,
        Method::POST,
        "/api/playlists/live/add",
        Some(json!({ "song_id": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(&app, Method::GET, "/api/queue", None).await;
    let ids: Vec<i64> = body["queue"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["song_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(device.loads().len(), 1);

    // Removing the playing head re-evaluates playback
    let (status, _) = request(
        &app,
        Method::POST,
        "/api/playlists/live/remove",
        Some(json!({ "song_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(&app, Method::GET, "/api/queue", None).await;
    assert_eq!(body["queue"][0]["song_id"], 2);
    assert_eq!(device.loads().len(), 2);
}

#[tokio::test]
async fn play_replaces_the_queue_with_one_song() {
    let (app, device, _dir) = setup().await;

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/player/play",
        Some(json!({ "song_id": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        device.loaded().unwrap(),
        std::path::PathBuf::from("/music/gamma.mp3")
    );

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/player/play",
        Some(json!({ "song_id": 404 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn next_consumes_the_head() {
    let (app, device, _dir) = setup().await;

    for id in [1, 2] {
        request(
            &app,
            Method::POST,
            "/api/queue/add",
            Some(json!({ "song_id": id })),
        )
        .await;
    }

    let (status, _) = request(&app, Method::POST, "/api/player/next", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(&app, Method::GET, "/api/queue", None).await;
    assert_eq!(body["queue"].as_array().unwrap().len(), 1);
    assert_eq!(body["queue"][0]["song_id"], 2);
    assert_eq!(
        device.loaded().unwrap(),
        std::path::PathBuf::from("/music/beta.mp3")
    );
}

#[tokio::test]
async fn toggle_flips_pause_state() {
    let (app, _device, _dir) = setup().await;

    request(
        &app,
        Method::POST,
        "/api/queue/add",
        Some(json!({ "song_id": 1 })),
    )
    .await;

    let (status, body) = request(&app, Method::POST, "/api/player/toggle", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_playing"], false);

    let (status, body) = request(&app, Method::POST, "/api/player/toggle", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_playing"], true);
}

#[tokio::test]
async fn stop_does_not_interrupt_an_active_track() {
    let (app, device, _dir) = setup().await;

    request(
        &app,
        Method::POST,
        "/api/queue/add",
        Some(json!({ "song_id": 1 })),
    )
    .await;
    let stops_before = device.stop_count();

    let (status, _) = request(&app, Method::POST, "/api/player/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(device.stop_count(), stops_before);
}

#[tokio::test]
async fn volume_is_clamped_to_percent_range() {
    let (app, _device, _dir) = setup().await;

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/player/volume",
        Some(json!({ "volume": 150.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(&app, Method::GET, "/api/player/volume", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["volume"], 100.0);
}
