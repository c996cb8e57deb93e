//! mpv JSON IPC adapter
//!
//! Spawns one `mpv --idle` process and speaks its JSON IPC protocol over a
//! UNIX socket. Requests carry a `request_id`; replies are matched on it and
//! asynchronous event lines are skipped. All IPC round-trips are serialized
//! behind one mutex, so responses for a given request cannot interleave.

use crate::device::AudioDevice;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// How many 100ms connection attempts to make after spawning mpv
const CONNECT_ATTEMPTS: u32 = 50;

struct IpcConn {
    writer: OwnedWriteHalf,
    reader: BufReader<OwnedReadHalf>,
}

/// Handle to one external mpv process
pub struct MpvDevice {
    child: Mutex<Option<Child>>,
    conn: Mutex<IpcConn>,
    next_request_id: AtomicU64,
}

impl MpvDevice {
    /// Spawn mpv and connect to its IPC socket
    pub async fn start(socket_path: &Path) -> Result<Self> {
        // Stale socket from a previous run would make mpv fail to bind
        let _ = std::fs::remove_file(socket_path);

        let child = Command::new("mpv")
            .arg("--idle=yes")
            .arg("--no-video")
            .arg("--no-terminal")
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Device(format!("Failed to spawn mpv: {}", e)))?;

        info!("Spawned mpv (pid {:?})", child.id());

        let stream = Self::connect(socket_path).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            child: Mutex::new(Some(child)),
            conn: Mutex::new(IpcConn {
                writer: write_half,
                reader: BufReader::new(read_half),
            }),
            next_request_id: AtomicU64::new(1),
        })
    }

    /// Connect to the IPC socket, retrying while mpv starts up
    async fn connect(socket_path: &Path) -> Result<UnixStream> {
        for attempt in 0..CONNECT_ATTEMPTS {
            match UnixStream::connect(socket_path).await {
                Ok(stream) => {
                    debug!("Connected to mpv IPC socket after {} attempts", attempt + 1);
                    return Ok(stream);
                }
                Err(_) => sleep(Duration::from_millis(100)).await,
            }
        }

        Err(Error::Device(format!(
            "mpv IPC socket {} never became connectable",
            socket_path.display()
        )))
    }

    /// Run one IPC command and return its `data` field
    async fn command(&self, args: Vec<Value>) -> Result<Value> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({ "command": args, "request_id": request_id });

        let mut conn = self.conn.lock().await;

        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        conn.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::Device(format!("mpv IPC write failed: {}", e)))?;

        // Read until the reply with our request_id; everything else on the
        // socket is an asynchronous event line.
        loop {
            let mut reply = String::new();
            let n = conn
                .reader
                .read_line(&mut reply)
                .await
                .map_err(|e| Error::Device(format!("mpv IPC read failed: {}", e)))?;
            if n == 0 {
                return Err(Error::Device("mpv IPC socket closed".to_string()));
            }

            let value: Value = match serde_json::from_str(reply.trim()) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Skipping unparseable mpv IPC line: {}", e);
                    continue;
                }
            };

            if value.get("event").is_some() {
                continue;
            }

            if value.get("request_id").and_then(Value::as_u64) != Some(request_id) {
                continue;
            }

            let error = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("missing error field");

            if error == "success" {
                return Ok(value.get("data").cloned().unwrap_or(Value::Null));
            }

            // Asking for time-pos/duration while idle is routine, not a fault
            if error == "property unavailable" {
                return Ok(Value::Null);
            }

            return Err(Error::Device(format!("mpv: {}", error)));
        }
    }

    async fn get_property(&self, name: &str) -> Result<Value> {
        self.command(vec![json!("get_property"), json!(name)]).await
    }

    async fn set_property(&self, name: &str, value: Value) -> Result<()> {
        self.command(vec![json!("set_property"), json!(name), value])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AudioDevice for MpvDevice {
    async fn load(&self, path: &Path) -> Result<()> {
        self.command(vec![json!("loadfile"), json!(path.to_string_lossy())])
            .await?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.command(vec![json!("stop")]).await?;
        Ok(())
    }

    async fn set_pause(&self, paused: bool) -> Result<()> {
        self.set_property("pause", json!(paused)).await
    }

    async fn seek(&self, secs: f64) -> Result<()> {
        self.set_property("time-pos", json!(secs)).await
    }

    async fn volume(&self) -> Result<f64> {
        Ok(self.get_property("volume").await?.as_f64().unwrap_or(0.0))
    }

    async fn set_volume(&self, volume: f64) -> Result<()> {
        self.set_property("volume", json!(volume)).await
    }

    async fn time_pos(&self) -> Result<Option<f64>> {
        Ok(self.get_property("time-pos").await?.as_f64())
    }

    async fn duration(&self) -> Result<Option<f64>> {
        Ok(self.get_property("duration").await?.as_f64())
    }

    async fn idle_active(&self) -> Result<bool> {
        Ok(self
            .get_property("idle-active")
            .await?
            .as_bool()
            .unwrap_or(true))
    }

    async fn paused(&self) -> Result<bool> {
        Ok(self.get_property("pause").await?.as_bool().unwrap_or(false))
    }

    async fn quit(&self) -> Result<()> {
        // Best effort: ask nicely, then make sure the process is gone
        if let Err(e) = self.command(vec![json!("quit")]).await {
            warn!("mpv quit command failed: {}", e);
        }

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                debug!("mpv process already exited: {}", e);
            }
        }

        Ok(())
    }
}
