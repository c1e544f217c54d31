//! scrcpy session management
//!
//! Each mirroring session is one scrcpy child process. The `Child` handle is
//! moved into a dedicated `wait_for_exit` background task so the real exit
//! code is captured; session state is read back through atomics, which keeps
//! status checks synchronous and free of `try_wait` races.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Notify};
use tokio::time::timeout;

use mwarden_core::prelude::*;
use mwarden_core::{MirrorSession, SessionStatus};

/// How long to wait for scrcpy to die after a kill request.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Options applied when starting a mirroring session.
///
/// `None` on a numeric option means "let scrcpy decide".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOptions {
    pub max_size: Option<u32>,
    pub bit_rate: Option<u32>,
    pub max_fps: Option<u32>,
    pub always_on_top: bool,
    pub stay_awake: bool,
    pub turn_screen_off: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            max_size: Some(1920),
            bit_rate: Some(8_000_000), // 8 Mbps
            max_fps: Some(60),
            always_on_top: false,
            stay_awake: true,
            turn_screen_off: false,
        }
    }
}

/// Mirroring backend contract: session start/stop plus the liveness view the
/// session monitor polls.
///
/// Implemented by [`ScrcpyBackend`] for real sessions and by in-memory fakes
/// in tests.
#[trait_variant::make(MirrorBackend: Send)]
pub trait LocalMirrorBackend {
    /// Start a session for a device; returns the backend-assigned session id.
    async fn start_session(&self, device_id: &str, options: &MirrorOptions) -> Result<String>;

    /// Request termination of a session.
    async fn stop_session(&self, session_id: &str) -> Result<()>;

    /// Current status of a session. Ids the backend no longer tracks report
    /// [`SessionStatus::Stopped`].
    async fn session_status(&self, session_id: &str) -> Result<SessionStatus>;

    /// Sessions the backend currently considers live.
    async fn list_active_sessions(&self) -> Result<Vec<MirrorSession>>;
}

/// One running (or finished) scrcpy child process.
pub struct ScrcpySession {
    session_id: String,
    device_id: String,
    started_at: DateTime<Utc>,
    pid: u32,
    /// One-shot sender that tells the wait task to kill the process.
    /// Consumed on first use (or on drop).
    kill_tx: Option<oneshot::Sender<()>>,
    /// Set before the kill is dispatched, so a kill-induced exit reads as
    /// Stopped rather than Error.
    kill_requested: Arc<AtomicBool>,
    /// Set to `true` by the wait task once the child has exited.
    exited: Arc<AtomicBool>,
    /// Exit code recorded by the wait task (`None` when killed by signal).
    exit_code: Arc<Mutex<Option<i32>>>,
    /// Notified by the wait task immediately after the child exits.
    exit_notify: Arc<Notify>,
}

impl ScrcpySession {
    /// Spawn scrcpy for a device with the given options.
    pub(crate) fn spawn(
        scrcpy_path: &Path,
        device_id: &str,
        options: &MirrorOptions,
    ) -> Result<Self> {
        let args = build_args(device_id, options);
        info!("Spawning scrcpy: {} {}", scrcpy_path.display(), args.join(" "));

        let child = Command::new(scrcpy_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::ScrcpyNotFound
                } else {
                    Error::ProcessSpawn {
                        reason: e.to_string(),
                    }
                }
            })?;

        Self::wire(child, device_id)
    }

    /// Attach reader and wait tasks to an already-spawned child.
    fn wire(mut child: Child, device_id: &str) -> Result<Self> {
        let pid = child
            .id()
            .ok_or_else(|| Error::process_spawn("scrcpy exited before a pid could be read"))?;
        let session_id = format!("session_{}", pid);
        info!("scrcpy session {} started for {}", session_id, device_id);

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(Self::drain_output(stdout, session_id.clone(), "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(Self::drain_output(stderr, session_id.clone(), "stderr"));
        }

        let kill_requested = Arc::new(AtomicBool::new(false));
        let exited = Arc::new(AtomicBool::new(false));
        let exit_code = Arc::new(Mutex::new(None));
        let exit_notify = Arc::new(Notify::new());
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        tokio::spawn(Self::wait_for_exit(
            child,
            kill_rx,
            session_id.clone(),
            Arc::clone(&exited),
            Arc::clone(&exit_code),
            Arc::clone(&exit_notify),
        ));

        Ok(Self {
            session_id,
            device_id: device_id.to_string(),
            started_at: Utc::now(),
            pid,
            kill_tx: Some(kill_tx),
            kill_requested,
            exited,
            exit_code,
            exit_notify,
        })
    }

    /// Background task: owns `child`, waits for it to exit, records the code.
    ///
    /// Two ways the task can end:
    /// 1. scrcpy exits on its own (window closed, device gone, crash).
    /// 2. `kill_rx` fires: we kill the child, then wait for it.
    async fn wait_for_exit(
        mut child: Child,
        kill_rx: oneshot::Receiver<()>,
        session_id: String,
        exited: Arc<AtomicBool>,
        exit_code: Arc<Mutex<Option<i32>>>,
        exit_notify: Arc<Notify>,
    ) {
        let code: Option<i32> = tokio::select! {
            result = child.wait() => {
                match result {
                    Ok(status) => {
                        info!("scrcpy session {} exited with status: {:?}", session_id, status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting for scrcpy session {}: {}", session_id, e);
                        None
                    }
                }
            }
            _ = kill_rx => {
                info!("Kill signal received for scrcpy session {}", session_id);
                if let Err(e) = child.kill().await {
                    error!("Failed to kill scrcpy session {}: {}", session_id, e);
                }
                match child.wait().await {
                    Ok(status) => status.code(),
                    Err(e) => {
                        error!("Error waiting after kill for {}: {}", session_id, e);
                        None
                    }
                }
            }
        };

        // Record the code before flipping the flag so status() readers that
        // observe `exited` also observe the code.
        if let Ok(mut guard) = exit_code.lock() {
            *guard = code;
        }
        exited.store(true, Ordering::Release);
        exit_notify.notify_waiters();
    }

    /// Read lines from a child stream and log them at debug.
    ///
    /// scrcpy is chatty on stderr (INFO/WARN lines); keeping them in our log
    /// is enough, nobody consumes them programmatically.
    async fn drain_output<R>(stream: R, session_id: String, label: &'static str)
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(stream).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            debug!("scrcpy[{}] {}: {}", session_id, label, line);
        }
        debug!("scrcpy[{}] {} reader finished", session_id, label);
    }

    /// Request termination and wait briefly for the child to die.
    ///
    /// The wait task performs the actual kill; a timeout here only means the
    /// kill is still in flight, so it is logged, not surfaced.
    pub async fn stop(&mut self) -> Result<()> {
        if self.has_exited() {
            debug!("scrcpy session {} already exited", self.session_id);
            return Ok(());
        }

        // Mark before dispatching the kill so the exit reads as Stopped.
        self.kill_requested.store(true, Ordering::Release);
        info!("Stopping scrcpy session {}", self.session_id);

        if let Some(tx) = self.kill_tx.take() {
            // Ignore send error: the wait task may have just exited naturally.
            let _ = tx.send(());
        }

        let notified = self.exit_notify.notified();
        if self.has_exited() {
            return Ok(());
        }

        if timeout(STOP_TIMEOUT, notified).await.is_err() {
            warn!(
                "Timeout waiting for scrcpy session {} to exit; kill is still pending",
                self.session_id
            );
        }
        Ok(())
    }

    /// Backend-visible status of this session.
    pub fn status(&self) -> SessionStatus {
        if !self.exited.load(Ordering::Acquire) {
            return SessionStatus::Running;
        }
        if self.kill_requested.load(Ordering::Acquire) {
            return SessionStatus::Stopped;
        }
        let code = self.exit_code.lock().ok().and_then(|guard| *guard);
        match code {
            Some(0) => SessionStatus::Stopped,
            // Nonzero exit, or killed by something that wasn't us.
            _ => SessionStatus::Error,
        }
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        !self.has_exited()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn to_session(&self) -> MirrorSession {
        MirrorSession {
            session_id: self.session_id.clone(),
            device_id: self.device_id.clone(),
            status: self.status(),
            started_at: self.started_at,
        }
    }
}

impl Drop for ScrcpySession {
    fn drop(&mut self) {
        if !self.has_exited() {
            warn!(
                "scrcpy session {} dropped while still running",
                self.session_id
            );
            if let Some(tx) = self.kill_tx.take() {
                let _ = tx.send(());
            }
        }
    }
}

/// Translate options into scrcpy command-line arguments.
fn build_args(device_id: &str, options: &MirrorOptions) -> Vec<String> {
    let mut args = vec!["-s".to_string(), device_id.to_string()];

    if let Some(max_size) = options.max_size {
        args.push("--max-size".to_string());
        args.push(max_size.to_string());
    }
    if let Some(bit_rate) = options.bit_rate {
        args.push("--bit-rate".to_string());
        args.push(bit_rate.to_string());
    }
    if let Some(max_fps) = options.max_fps {
        args.push("--max-fps".to_string());
        args.push(max_fps.to_string());
    }
    if options.always_on_top {
        args.push("--always-on-top".to_string());
    }
    if options.stay_awake {
        args.push("--stay-awake".to_string());
    }
    if options.turn_screen_off {
        args.push("--turn-screen-off".to_string());
    }

    args
}

/// scrcpy-backed implementation of [`MirrorBackend`] over a map of live
/// sessions keyed by session id.
pub struct ScrcpyBackend {
    scrcpy_path: PathBuf,
    sessions: Mutex<HashMap<String, ScrcpySession>>,
}

impl ScrcpyBackend {
    /// Wrap an explicit scrcpy executable path.
    pub fn new(scrcpy_path: impl Into<PathBuf>) -> Self {
        Self {
            scrcpy_path: scrcpy_path.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Locate scrcpy on PATH.
    pub fn discover() -> Result<Self> {
        let scrcpy_path = which::which("scrcpy").map_err(|_| Error::ScrcpyNotFound)?;
        Ok(Self::new(scrcpy_path))
    }

    pub fn path(&self) -> &Path {
        &self.scrcpy_path
    }

    /// scrcpy version banner (first line), for startup diagnostics.
    pub async fn version(&self) -> Result<String> {
        let output = Command::new(&self.scrcpy_path)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::ScrcpyNotFound
                } else {
                    Error::session_backend(format!("failed to run scrcpy: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::session_backend(format!(
                "scrcpy --version failed: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }
}

impl MirrorBackend for ScrcpyBackend {
    async fn start_session(&self, device_id: &str, options: &MirrorOptions) -> Result<String> {
        let session = ScrcpySession::spawn(&self.scrcpy_path, device_id, options)?;
        let session_id = session.session_id().to_string();

        let mut sessions = self.sessions.lock().unwrap();
        // Finished sessions have served their status to the monitor by now;
        // drop them so the map does not grow with every crash.
        sessions.retain(|id, s| {
            let keep = s.is_running();
            if !keep {
                debug!("pruning finished scrcpy session {}", id);
            }
            keep
        });
        sessions.insert(session_id.clone(), session);
        Ok(session_id)
    }

    async fn stop_session(&self, session_id: &str) -> Result<()> {
        let removed = self.sessions.lock().unwrap().remove(session_id);
        match removed {
            Some(mut session) => session.stop().await,
            None => Err(Error::unknown_session(session_id)),
        }
    }

    async fn session_status(&self, session_id: &str) -> Result<SessionStatus> {
        let sessions = self.sessions.lock().unwrap();
        match sessions.get(session_id) {
            Some(session) => Ok(session.status()),
            None => {
                debug!("status request for untracked session {}", session_id);
                Ok(SessionStatus::Stopped)
            }
        }
    }

    async fn list_active_sessions(&self) -> Result<Vec<MirrorSession>> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .values()
            .filter(|s| s.is_running())
            .map(|s| s.to_session())
            .collect())
    }
}
