/// mpv IPC driver backing the player's media element.
///
/// Architecture:
///
/// ```text
///   MpvMedia::command()  ── unbounded mpsc ──►  player_task
///                                                  │ (spawns mpv on first Load)
///                                                  ├── writer_task ← MpvRequest → socket
///                                                  └── reader_task ← JSON lines
///                                                        ├── response (request_id) → oneshot
///                                                        └── property-change / end-file
///                                                              → MediaEvent channel
/// ```
///
/// Platform notes:
/// - Unix:    Unix domain sockets
/// - Windows: Named pipes  \\.\pipe\<name>
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

use crate::media::{MediaCommand, MediaElement, MediaEvent};

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

// ── observation property IDs ──────────────────────────────────────────────────

pub const OBS_PAUSE: u64 = 1;
pub const OBS_TIME_POS: u64 = 2;
pub const OBS_DURATION: u64 = 3;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String, // serialised JSON line (already has '\n')
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// An mpv event / property-change that arrived unsolicited (no request_id).
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    /// Returns `Some((obs_id, data))` if this is a property-change event.
    pub fn as_property_change(&self) -> Option<(u64, &Value)> {
        if self.raw.get("event")?.as_str()? == "property-change" {
            let id = self.raw.get("id")?.as_u64()?;
            let data = self.raw.get("data").unwrap_or(&Value::Null);
            Some((id, data))
        } else {
            None
        }
    }

    /// Returns the event name, e.g. "end-file", "start-file", "file-loaded".
    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    /// Translate into what the transport cares about. Property changes with
    /// `null` data (nothing loaded) and unrelated events map to `None`.
    pub fn to_media_event(&self) -> Option<MediaEvent> {
        if let Some((id, data)) = self.as_property_change() {
            return match id {
                OBS_PAUSE => data.as_bool().map(MediaEvent::PauseChanged),
                OBS_TIME_POS => data.as_f64().map(MediaEvent::TimeChanged),
                OBS_DURATION => data.as_f64().map(MediaEvent::DurationChanged),
                _ => None,
            };
        }
        match self.event_name()? {
            "end-file" => match self.raw.get("reason").and_then(Value::as_str) {
                Some("eof") => Some(MediaEvent::Ended),
                Some("error") => Some(MediaEvent::Failed(
                    self.raw
                        .get("file_error")
                        .and_then(Value::as_str)
                        .unwrap_or("could not open audio")
                        .to_string(),
                )),
                _ => None,
            },
            _ => None,
        }
    }
}

// ── handle ────────────────────────────────────────────────────────────────────

/// Cloneable handle to the mpv writer task.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(tokio::time::Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    /// Replace the current file, paused, with volume and mute applied first.
    pub async fn load_paused(&self, url: &str, volume: f32, muted: bool) -> anyhow::Result<()> {
        self.set_pause(true).await?;
        self.set_volume(volume).await?;
        self.set_mute(muted).await?;
        debug!("mpv: loadfile {}", url);
        self.send(json!(["loadfile", url, "replace"])).await?;
        Ok(())
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(json!(["stop"])).await?;
        Ok(())
    }

    pub async fn set_volume(&self, vol: f32) -> anyhow::Result<()> {
        let vol_pct = (vol * 100.0).clamp(0.0, 100.0);
        self.send(json!(["set_property", "volume", vol_pct])).await?;
        Ok(())
    }

    pub async fn set_mute(&self, muted: bool) -> anyhow::Result<()> {
        self.send(json!(["set_property", "mute", muted])).await?;
        Ok(())
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.send(json!(["set_property", "pause", paused])).await?;
        Ok(())
    }

    pub async fn seek_to(&self, secs: f64) -> anyhow::Result<()> {
        self.send(json!(["seek", secs, "absolute"])).await?;
        Ok(())
    }

    /// Register observe_property for the transport's properties. Must be
    /// called after every fresh connection.
    pub async fn observe_properties(&self) {
        let props = [
            (OBS_PAUSE, "pause"),
            (OBS_TIME_POS, "time-pos"),
            (OBS_DURATION, "duration"),
        ];
        for (id, name) in &props {
            match self.send(json!(["observe_property", id, name])).await {
                Ok(_) => debug!("mpv: observe_property id={} name={}", id, name),
                Err(e) => warn!("mpv: observe_property {} failed: {}", name, e),
            }
        }
    }

    async fn execute(&self, cmd: &MediaCommand) -> anyhow::Result<()> {
        match cmd {
            MediaCommand::Load { url, volume, muted } => self.load_paused(url, *volume, *muted).await,
            MediaCommand::SetPause(paused) => self.set_pause(*paused).await,
            MediaCommand::SeekTo(secs) => self.seek_to(*secs).await,
            MediaCommand::SetVolume(vol) => self.set_volume(*vol).await,
            MediaCommand::SetMute(muted) => self.set_mute(*muted).await,
            MediaCommand::Stop => self.stop().await,
        }
    }
}

// ── driver ────────────────────────────────────────────────────────────────────

/// Owns the mpv child process.
pub struct MpvDriver {
    pub socket_name: String,
    process: Option<tokio::process::Child>,
    pub last_volume: f32,
}

impl MpvDriver {
    pub fn new(volume: f32) -> Self {
        Self {
            socket_name: notecast_proto::platform::mpv_socket_name(),
            process: None,
            last_volume: volume,
        }
    }

    pub fn process_alive(&mut self) -> bool {
        if let Some(ref mut child) = self.process {
            match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    if let Some(code) = status.code() {
                        warn!("mpv process exited with code: {}", code);
                    } else {
                        warn!("mpv process terminated by signal");
                    }
                    false
                }
                Err(e) => {
                    warn!("mpv process_alive check failed: {}", e);
                    false
                }
            }
        } else {
            false
        }
    }

    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
    }

    fn command(&self) -> anyhow::Result<tokio::process::Command> {
        let mpv_binary = notecast_proto::platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;
        let vol_arg = format!(
            "--volume={}",
            (self.last_volume * 100.0).clamp(0.0, 100.0).round() as i64
        );
        let mut cmd = tokio::process::Command::new(mpv_binary);
        cmd.arg("--no-video")
            .arg("--idle=yes")
            .arg("--keep-open=no")
            .arg(notecast_proto::platform::mpv_socket_arg())
            .arg("--quiet")
            .arg(vol_arg)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .kill_on_drop(true);
        Ok(cmd)
    }

    #[cfg(unix)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;

        let socket_path = std::path::PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;

        info!("mpv: spawning new process");
        let stderr_path = notecast_proto::platform::data_dir().join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;
        info!("mpv: logging stderr to {:?}", stderr_path);

        let child = self.command()?.stderr(stderr_file).spawn()?;
        info!("mpv: spawned process with pid {:?}", child.id());
        self.process = Some(child);

        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to IPC socket");
        let (read_half, write_half) = stream.into_split();
        Ok(start_io_tasks(read_half, write_half, event_tx))
    }

    #[cfg(windows)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;

        info!("mpv: spawning new process");
        let child = self
            .command()?
            .stderr(std::process::Stdio::null())
            .spawn()?;
        self.process = Some(child);

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                info!("mpv: connected to named pipe");
                let (read_half, write_half) = tokio::io::split(client);
                return Ok(start_io_tasks(read_half, write_half, event_tx));
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }
}

fn start_io_tasks<R, W>(read_half: R, write_half: W, event_tx: mpsc::Sender<MpvEvent>) -> MpvHandle
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

    tokio::spawn(writer_task(write_half, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(BufReader::new(read_half), pending, event_tx));

    MpvHandle { tx: cmd_tx }
}

// ── reader task ───────────────────────────────────────────────────────────────

async fn reader_task<R>(mut reader: BufReader<R>, pending: PendingMap, event_tx: mpsc::Sender<MpvEvent>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                let mut map = pending.lock().await;
                for (_, tx) in map.drain() {
                    let _ = tx.send(Err(anyhow::anyhow!("mpv IPC connection closed")));
                }
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    let mut map = pending.lock().await;
                    if let Some(tx) = map.remove(&req_id) {
                        let result = if val["error"].as_str() == Some("success") {
                            Ok(val)
                        } else {
                            let err = val["error"].as_str().unwrap_or("unknown error").to_string();
                            debug!("mpv reader: response req={} err={}", req_id, err);
                            Err(anyhow::anyhow!("mpv error: {}", err))
                        };
                        let _ = tx.send(result);
                    }
                } else if event_tx.send(MpvEvent { raw: val }).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                let mut map = pending.lock().await;
                for (_, tx) in map.drain() {
                    let _ = tx.send(Err(anyhow::anyhow!("mpv IPC read error: {}", e)));
                }
                break;
            }
        }
    }
}

// ── writer task ───────────────────────────────────────────────────────────────

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register before writing so the reader can match the reply.
        pending.lock().await.insert(req.req_id, req.reply);
        debug!("mpv writer: send req={} payload={}", req.req_id, req.payload.trim());
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── media element ─────────────────────────────────────────────────────────────

/// [`MediaElement`] backed by an mpv child process.
///
/// Commands are queued and executed in order by a background task. mpv is
/// spawned lazily on the first `Load` and respawned if it has died.
pub struct MpvMedia {
    tx: mpsc::UnboundedSender<MediaCommand>,
}

impl MpvMedia {
    pub fn spawn(default_volume: f32, events: mpsc::Sender<MediaEvent>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(player_task(MpvDriver::new(default_volume), rx, events));
        Self { tx }
    }
}

impl MediaElement for MpvMedia {
    fn command(&mut self, cmd: MediaCommand) {
        if self.tx.send(cmd).is_err() {
            warn!("mpv: player task gone, dropping command");
        }
    }
}

async fn player_task(
    mut driver: MpvDriver,
    mut rx: mpsc::UnboundedReceiver<MediaCommand>,
    events: mpsc::Sender<MediaEvent>,
) {
    let mut handle: Option<MpvHandle> = None;

    while let Some(cmd) = rx.recv().await {
        if let MediaCommand::SetVolume(v) = cmd {
            driver.last_volume = v;
        }
        if handle.is_some() && !driver.process_alive() {
            handle = None;
        }
        if handle.is_none() {
            // Nothing to control until a source is loaded.
            if !matches!(cmd, MediaCommand::Load { .. }) {
                continue;
            }
            match connect(&mut driver, events.clone()).await {
                Ok(h) => handle = Some(h),
                Err(e) => {
                    warn!("mpv: unavailable: {}", e);
                    let _ = events.send(MediaEvent::Failed(e.to_string())).await;
                    continue;
                }
            }
        }
        if let Some(h) = &handle {
            if let Err(e) = h.execute(&cmd).await {
                warn!("mpv: {:?} failed: {}", cmd, e);
            }
        }
    }

    driver.kill().await;
    debug!("mpv: player task exiting");
}

async fn connect(driver: &mut MpvDriver, events: mpsc::Sender<MediaEvent>) -> anyhow::Result<MpvHandle> {
    let (raw_tx, mut raw_rx) = mpsc::channel::<MpvEvent>(256);
    let handle = driver.spawn_and_connect(raw_tx).await?;
    tokio::spawn(async move {
        while let Some(ev) = raw_rx.recv().await {
            if let Some(media) = ev.to_media_event() {
                if events.send(media).await.is_err() {
                    break;
                }
            }
        }
    });
    handle.observe_properties().await;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(raw: Value) -> Option<MediaEvent> {
        MpvEvent { raw }.to_media_event()
    }

    #[test]
    fn test_property_changes_map_to_media_events() {
        assert_eq!(
            ev(json!({"event": "property-change", "id": OBS_TIME_POS, "name": "time-pos", "data": 12.5})),
            Some(MediaEvent::TimeChanged(12.5))
        );
        assert_eq!(
            ev(json!({"event": "property-change", "id": OBS_DURATION, "name": "duration", "data": 300.0})),
            Some(MediaEvent::DurationChanged(300.0))
        );
        assert_eq!(
            ev(json!({"event": "property-change", "id": OBS_PAUSE, "name": "pause", "data": false})),
            Some(MediaEvent::PauseChanged(false))
        );
    }

    #[test]
    fn test_null_property_data_is_ignored() {
        assert_eq!(
            ev(json!({"event": "property-change", "id": OBS_DURATION, "name": "duration"})),
            None
        );
    }

    #[test]
    fn test_end_file_reasons() {
        assert_eq!(ev(json!({"event": "end-file", "reason": "eof"})), Some(MediaEvent::Ended));
        assert_eq!(ev(json!({"event": "end-file", "reason": "stop"})), None);
        assert_eq!(
            ev(json!({"event": "end-file", "reason": "error", "file_error": "loading failed"})),
            Some(MediaEvent::Failed("loading failed".to_string()))
        );
        assert_eq!(ev(json!({"event": "file-loaded"})), None);
    }

    #[tokio::test]
    async fn test_reader_routes_replies_and_events() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, mut server_write) = tokio::io::split(server);
        let (read_half, write_half) = tokio::io::split(client);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let handle = start_io_tasks(read_half, write_half, event_tx);

        let reply = tokio::spawn(async move { handle.set_pause(true).await });

        let mut reader = BufReader::new(server_read);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let sent: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(sent["command"], json!(["set_property", "pause", true]));
        let req_id = sent["request_id"].as_u64().unwrap();

        let out = format!(
            "{{\"event\":\"property-change\",\"id\":{OBS_PAUSE},\"data\":true}}\n{{\"request_id\":{req_id},\"error\":\"success\"}}\n"
        );
        server_write.write_all(out.as_bytes()).await.unwrap();

        assert!(reply.await.unwrap().is_ok());
        let event = event_rx.recv().await.unwrap();
        assert_eq!(event.to_media_event(), Some(MediaEvent::PauseChanged(true)));
    }
}
