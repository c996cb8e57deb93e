//! tonearm - personal audio-playback daemon
//!
//! Wires the pieces together: song library, playlist store, mpv device,
//! playback controller, command serializer and the HTTP API. On shutdown the
//! session is snapshotted to disk so the next start resumes mid-track.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tonearm::api::{self, AppContext};
use tonearm::config::Config;
use tonearm::device::mpv::MpvDevice;
use tonearm::device::AudioDevice;
use tonearm::library;
use tonearm::playback::{CommandSerializer, PlaybackController, PlayerEngine, SessionSnapshot};
use tonearm::playlist::PlaylistStore;

/// Everything after SIGTERM must finish inside this window
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(2);

/// Command-line arguments for tonearm
#[derive(Parser, Debug)]
#[command(name = "tonearm")]
#[command(about = "Personal audio playback daemon driving mpv")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "tonearm.toml", env = "TONEARM_CONFIG")]
    config: PathBuf,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "TONEARM_PORT")]
    port: Option<u16>,

    /// Folder containing music files (overrides the config file)
    #[arg(short, long, env = "TONEARM_MUSIC_FOLDER")]
    music_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(folder) = args.music_folder {
        config.music_folder = folder;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tonearm={},tower_http=warn", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tonearm on port {}", config.port);
    info!("Music folder: {}", config.music_folder.display());

    // Song library
    let db = library::connect(&config.database_path)
        .await
        .context("Failed to open the song database")?;
    library::scan::scan_folder(&db, &config.music_folder)
        .await
        .context("Music folder scan failed")?;

    // Playlist store
    let playlists = Arc::new(
        PlaylistStore::new(&config.playlist_folder).context("Failed to open playlist folder")?,
    );

    // mpv device and playback controller
    let socket_path = std::env::temp_dir().join(format!("tonearm-mpv-{}.sock", std::process::id()));
    let device: Arc<dyn AudioDevice> = Arc::new(
        MpvDevice::start(&socket_path)
            .await
            .context("Failed to start mpv")?,
    );
    let controller = Arc::new(PlaybackController::new(Arc::clone(&device)));

    let (events_tx, events_rx) = tokio::sync::mpsc::channel(16);
    controller.spawn_end_monitor(events_tx);

    // Command serializer owns the engine
    let engine = PlayerEngine::new(Arc::clone(&controller), db.clone());
    let serializer = CommandSerializer::spawn(engine);
    serializer.spawn_event_pump(events_rx);

    // Resume the previous session: volume first, then the queue itself
    match SessionSnapshot::load(&config.state_path) {
        Ok(Some(snapshot)) => {
            controller.set_volume(snapshot.volume).await.ok();
            if let Err(e) = serializer.restore(snapshot).await {
                warn!("Session restore failed, starting fresh: {}", e);
            }
        }
        Ok(None) => info!("No previous session to restore"),
        Err(e) => warn!("Ignoring unreadable session snapshot: {}", e),
    }

    let ctx = AppContext {
        serializer: serializer.clone(),
        controller: Arc::clone(&controller),
        db,
        playlists,
    };

    api::server::run(config.port, ctx, shutdown_signal())
        .await
        .context("HTTP server error")?;

    // The listener is down; persist and tear down under a hard deadline
    if tokio::time::timeout(
        SHUTDOWN_DEADLINE,
        save_and_quit(&serializer, &controller, &device, &config.state_path),
    )
    .await
    .is_err()
    {
        warn!("Shutdown deadline hit, exiting anyway");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Capture the session, stop playback and quit mpv
///
/// Each step is best-effort: a dead mpv must not prevent the snapshot from
/// being written.
async fn save_and_quit(
    serializer: &CommandSerializer,
    controller: &Arc<PlaybackController>,
    device: &Arc<dyn AudioDevice>,
    state_path: &std::path::Path,
) {
    info!("Saving session");

    let (position, volume) = match controller.get_state().await {
        Ok(state) => (state.position, state.volume),
        Err(e) => {
            warn!("Could not read transport state at shutdown: {}", e);
            (0.0, 100.0)
        }
    };

    if let Err(e) = controller.stop().await {
        warn!("Stop at shutdown failed: {}", e);
    }
    if let Err(e) = device.quit().await {
        warn!("mpv quit failed: {}", e);
    }

    match serializer.snapshot(position, volume).await {
        Ok(snapshot) => {
            if let Err(e) = snapshot.save(state_path) {
                error!("Failed to write session snapshot: {}", e);
            }
        }
        Err(e) => error!("Failed to capture session snapshot: {}", e),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
