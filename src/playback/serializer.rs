//! Command serializer
//!
//! Single-worker FIFO in front of the player engine. The worker task owns
//! the engine outright, so exactly one operation is ever mutating queue,
//! history or session state; everything external (API calls, song-end
//! events, shutdown) is submitted as a command and executed strictly in
//! submission order, end-to-end.
//!
//! Admission is bounded: once the pending queue is full, external
//! submissions are rejected with [`Error::Busy`] instead of queueing
//! unboundedly. Internal song-end transitions instead wait for a slot; a
//! dropped end event would strand the finished track at the queue head.

use crate::error::{Error, Result};
use crate::playback::controller::PlayerEvent;
use crate::playback::engine::PlayerEngine;
use crate::playback::queue::TrackRef;
use crate::playback::reconcile::ChangedSong;
use crate::playback::session::SessionSnapshot;
use crate::playlist::Playlist;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Pending commands admitted before callers start seeing Busy
const COMMAND_QUEUE_CAPACITY: usize = 100;

/// Everything the engine can be asked to do
#[derive(Debug)]
pub enum CommandOp {
    GetQueue,
    Enqueue {
        song_id: i64,
        position: Option<usize>,
    },
    Dequeue {
        song_id: i64,
        position: Option<usize>,
    },
    Play {
        song_id: i64,
    },
    Previous,
    Advance,
    ToggleRepeat,
    ActivatePlaylist {
        playlist: Playlist,
        shuffle: bool,
    },
    PlaylistChanged {
        playlist: Playlist,
        changed: ChangedSong,
    },
    Restore {
        snapshot: SessionSnapshot,
    },
    Snapshot {
        last_position_secs: f64,
        volume: f64,
    },
}

/// Result payload of a completed command
#[derive(Debug)]
pub enum CommandOutcome {
    Done,
    Repeat(bool),
    Queue(Vec<TrackRef>),
    Snapshot(SessionSnapshot),
}

struct Command {
    op: CommandOp,
    reply: oneshot::Sender<Result<CommandOutcome>>,
}

/// Cloneable handle for submitting commands
#[derive(Clone)]
pub struct CommandSerializer {
    tx: mpsc::Sender<Command>,
}

impl CommandSerializer {
    /// Spawn the worker that owns the engine and return the handle
    pub fn spawn(engine: PlayerEngine) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        tokio::spawn(Self::run(engine, rx));
        Self { tx }
    }

    #[cfg(test)]
    fn unspawned() -> (Self, mpsc::Receiver<Command>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        (Self { tx }, rx)
    }

    /// Worker loop: one command at a time, in submission order
    async fn run(mut engine: PlayerEngine, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            debug!("Executing command {:?}", command.op);
            let result = Self::execute(&mut engine, command.op).await;
            if let Err(e) = &result {
                error!("Command failed: {}", e);
            }
            // A dropped reply receiver just means the caller gave up waiting
            let _ = command.reply.send(result);
        }
        debug!("Command serializer worker stopped");
    }

    async fn execute(engine: &mut PlayerEngine, op: CommandOp) -> Result<CommandOutcome> {
        match op {
            CommandOp::GetQueue => Ok(CommandOutcome::Queue(engine.queue_entries())),
            CommandOp::Enqueue { song_id, position } => {
                engine.enqueue(song_id, position).await?;
                Ok(CommandOutcome::Done)
            }
            CommandOp::Dequeue { song_id, position } => {
                engine.dequeue(song_id, position).await?;
                Ok(CommandOutcome::Done)
            }
            CommandOp::Play { song_id } => {
                engine.play(song_id).await?;
                Ok(CommandOutcome::Done)
            }
            CommandOp::Previous => {
                engine.previous().await?;
                Ok(CommandOutcome::Done)
            }
            CommandOp::Advance => {
                engine.advance().await?;
                Ok(CommandOutcome::Done)
            }
            CommandOp::ToggleRepeat => Ok(CommandOutcome::Repeat(engine.toggle_repeat(None))),
            CommandOp::ActivatePlaylist { playlist, shuffle } => {
                engine.activate_playlist(playlist, shuffle).await?;
                Ok(CommandOutcome::Done)
            }
            CommandOp::PlaylistChanged { playlist, changed } => {
                engine.playlist_changed(playlist, changed).await?;
                Ok(CommandOutcome::Done)
            }
            CommandOp::Restore { snapshot } => {
                engine.restore(snapshot).await?;
                Ok(CommandOutcome::Done)
            }
            CommandOp::Snapshot {
                last_position_secs,
                volume,
            } => Ok(CommandOutcome::Snapshot(
                engine.snapshot(last_position_secs, volume),
            )),
        }
    }

    /// Admit a command without waiting for it to execute
    fn try_submit(&self, op: CommandOp) -> Result<oneshot::Receiver<Result<CommandOutcome>>> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .try_send(Command { op, reply })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    Error::Busy("command queue full, retry later".to_string())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    Error::Internal("command serializer stopped".to_string())
                }
            })?;
        Ok(reply_rx)
    }

    /// Admit a command and wait for its outcome
    async fn submit(&self, op: CommandOp) -> Result<CommandOutcome> {
        let reply_rx = self.try_submit(op)?;
        reply_rx
            .await
            .map_err(|_| Error::Internal("command serializer stopped".to_string()))?
    }

    /// Submit a command, waiting for queue space instead of rejecting
    ///
    /// Only for internally generated commands. External callers go through
    /// [`Self::submit`] and get `Busy` back-pressure.
    async fn submit_waiting(&self, op: CommandOp) -> Result<CommandOutcome> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(Command { op, reply })
            .await
            .map_err(|_| Error::Internal("command serializer stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| Error::Internal("command serializer stopped".to_string()))?
    }

    /// Forward song-end events as synthetic advance commands
    ///
    /// Uses the waiting submission path: the monitor fires exactly once per
    /// track, so a rejected advance could never be re-issued.
    pub fn spawn_event_pump(&self, mut events: mpsc::Receiver<PlayerEvent>) -> JoinHandle<()> {
        let serializer = self.clone();
        tokio::spawn(async move {
            while let Some(PlayerEvent::SongEnded) = events.recv().await {
                if let Err(e) = serializer.submit_waiting(CommandOp::Advance).await {
                    error!("Auto-advance after song end failed: {}", e);
                }
            }
        })
    }

    // ------------------------------------------------------------------
    // Typed submission surface
    // ------------------------------------------------------------------

    pub async fn get_queue(&self) -> Result<Vec<TrackRef>> {
        match self.submit(CommandOp::GetQueue).await? {
            CommandOutcome::Queue(entries) => Ok(entries),
            _ => Err(Error::Internal("unexpected command outcome".to_string())),
        }
    }

    pub async fn enqueue(&self, song_id: i64, position: Option<usize>) -> Result<()> {
        self.submit(CommandOp::Enqueue { song_id, position }).await?;
        Ok(())
    }

    pub async fn dequeue(&self, song_id: i64, position: Option<usize>) -> Result<()> {
        self.submit(CommandOp::Dequeue { song_id, position }).await?;
        Ok(())
    }

    pub async fn play(&self, song_id: i64) -> Result<()> {
        self.submit(CommandOp::Play { song_id }).await?;
        Ok(())
    }

    pub async fn previous(&self) -> Result<()> {
        self.submit(CommandOp::Previous).await?;
        Ok(())
    }

    pub async fn advance(&self) -> Result<()> {
        self.submit(CommandOp::Advance).await?;
        Ok(())
    }

    pub async fn toggle_repeat(&self) -> Result<bool> {
        match self.submit(CommandOp::ToggleRepeat).await? {
            CommandOutcome::Repeat(repeat) => Ok(repeat),
            _ => Err(Error::Internal("unexpected command outcome".to_string())),
        }
    }

    pub async fn activate_playlist(&self, playlist: Playlist, shuffle: bool) -> Result<()> {
        self.submit(CommandOp::ActivatePlaylist { playlist, shuffle })
            .await?;
        Ok(())
    }

    pub async fn playlist_changed(&self, playlist: Playlist, changed: ChangedSong) -> Result<()> {
        self.submit(CommandOp::PlaylistChanged { playlist, changed })
            .await?;
        Ok(())
    }

    pub async fn restore(&self, snapshot: SessionSnapshot) -> Result<()> {
        self.submit(CommandOp::Restore { snapshot }).await?;
        Ok(())
    }

    pub async fn snapshot(&self, last_position_secs: f64, volume: f64) -> Result<SessionSnapshot> {
        match self
            .submit(CommandOp::Snapshot {
                last_position_secs,
                volume,
            })
            .await?
        {
            CommandOutcome::Snapshot(snapshot) => Ok(snapshot),
            _ => Err(Error::Internal("unexpected command outcome".to_string())),
        }
    }
}
