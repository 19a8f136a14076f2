//! Speech session controller.
//!
//! Owns the one engine process that is currently speaking or exporting:
//! spawns it, feeds its stdin, watches stderr and the exit status, and
//! routes stop/pause/resume to the platform's control actions.
//!
//! Idle (no session) → Speaking (session set) → Idle
//!
//! Only the most recent process is tracked. Starting a second request while
//! one is running replaces the session, and the earlier process can no
//! longer be stopped through this controller. Any child that exits cleanly
//! clears the slot, even if a newer request has replaced it since.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdin};
use tracing::{debug, info, warn};

use crate::command::{decode_ascii, CommandSpec, Utterance};
use crate::completion::{Completion, Settle};
use crate::error::{Result, SayError};
use crate::platform::{Engine, Platform};

/// How long the exit watcher waits for stderr to drain before reporting.
const STDERR_GRACE: Duration = Duration::from_millis(250);

/// Reference to the running engine process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    /// Increases with every spawn on a given controller.
    pub id: u64,
    pub pid: u32,
    /// The process leads its own group; control signals go to the group.
    pub process_group: bool,
}

type SessionSlot = Arc<Mutex<Option<ActiveSession>>>;

fn lock(slot: &SessionSlot) -> MutexGuard<'_, Option<ActiveSession>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Speaker {
    platform: Box<dyn Platform>,
    session: SessionSlot,
    next_id: AtomicU64,
}

impl Speaker {
    pub fn new(platform: Box<dyn Platform>) -> Self {
        info!("Speech engine: {}", platform.name());
        Self {
            platform,
            session: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Controller for the current OS's default engine.
    pub fn native() -> Self {
        Self::new(Engine::native().platform(None))
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    pub fn active_session(&self) -> Option<ActiveSession> {
        *lock(&self.session)
    }

    pub fn is_speaking(&self) -> bool {
        self.active_session().is_some()
    }

    /// Speak `text` aloud. Must be called within a Tokio runtime.
    pub fn speak(&self, text: &str, voice: Option<&str>, speed: Option<f64>) -> Completion {
        self.speak_utterance(&utterance(text, voice, speed))
    }

    pub fn speak_utterance(&self, utterance: &Utterance) -> Completion {
        if utterance.text.is_empty() {
            return Completion::ready(Err(SayError::MissingParameter("text")));
        }
        match self.platform.build_speak_command(utterance) {
            Ok(spec) => self.launch(spec),
            Err(e) => Completion::ready(Err(e)),
        }
    }

    /// Render `text` into `filename` instead of the speakers.
    pub fn export(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: Option<f64>,
        filename: impl AsRef<Path>,
    ) -> Completion {
        self.export_utterance(&utterance(text, voice, speed), filename.as_ref())
    }

    pub fn export_utterance(&self, utterance: &Utterance, filename: &Path) -> Completion {
        if utterance.text.is_empty() {
            return Completion::ready(Err(SayError::MissingParameter("text")));
        }
        if filename.as_os_str().is_empty() {
            return Completion::ready(Err(SayError::MissingParameter("filename")));
        }
        match self.platform.build_export_command(utterance, filename) {
            Ok(spec) => self.launch(spec),
            Err(e) => {
                debug!("Export rejected by {}: {e}", self.platform.name());
                Completion::ready(Err(e))
            }
        }
    }

    /// Kill the current process.
    pub fn stop(&self) -> Completion {
        self.control("stop", |p, s| p.run_stop_command(s))
    }

    /// Suspend the current process.
    ///
    /// The session is forgotten afterwards, exactly like `stop`, so a later
    /// `resume` or `stop` reports "no speech to kill" while the process is
    /// still alive and suspended.
    // TODO: keep a paused session so resume/stop can still reach it.
    pub fn pause(&self) -> Completion {
        self.control("pause", |p, s| p.run_pause_command(s))
    }

    /// Continue a suspended process. Clears the session like `pause`.
    pub fn resume(&self) -> Completion {
        self.control("resume", |p, s| p.run_resume_command(s))
    }

    /// Ask the engine which voices are installed.
    pub async fn installed_voices(&self) -> Result<Vec<String>> {
        let spec = self.platform.build_voices_command()?;
        let mut cmd = spec.to_command();
        cmd.stdout(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| SayError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        if let (Some(payload), Some(mut stdin)) = (spec.stdin.as_deref(), child.stdin.take()) {
            stdin.write_all(payload.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.stderr.is_empty() {
            return Err(SayError::Engine(decode_ascii(&output.stderr).trim().to_string()));
        }
        if !output.status.success() {
            return Err(SayError::AbnormalExit {
                code: output.status.code(),
                signal: exit_signal(&output.status),
            });
        }

        let voices = self
            .platform
            .parse_voices(&String::from_utf8_lossy(&output.stdout));
        debug!("{} reported {} voices", self.platform.name(), voices.len());
        Ok(voices)
    }

    fn control<F>(&self, operation: &'static str, action: F) -> Completion
    where
        F: FnOnce(&dyn Platform, &ActiveSession) -> Result<()>,
    {
        let Some(session) = self.active_session() else {
            debug!("{operation} requested with no active speech");
            return Completion::ready(Err(SayError::NoActiveSpeech));
        };

        // The lock is not held here; control actions may spawn helpers.
        if let Err(e) = action(self.platform.as_ref(), &session) {
            warn!("Failed to {operation} pid {}: {e}", session.pid);
            return Completion::ready(Err(e));
        }
        let mut slot = lock(&self.session);
        if slot.as_ref().map(|current| current.id) == Some(session.id) {
            *slot = None;
        }
        drop(slot);
        info!("Speech {operation} (pid {})", session.pid);
        Completion::ready(Ok(()))
    }

    fn launch(&self, spec: CommandSpec) -> Completion {
        let (settle, completion) = Completion::channel();
        debug!("Running {} {:?}", spec.program, spec.args);

        let mut child = match spec.to_command().spawn() {
            Ok(child) => child,
            Err(source) => {
                warn!("Failed to start {}: {source}", spec.program);
                settle.settle(Err(SayError::Spawn {
                    program: spec.program,
                    source,
                }));
                return completion;
            }
        };

        let Some(pid) = child.id() else {
            settle.settle(Err(SayError::AbnormalExit {
                code: None,
                signal: None,
            }));
            return completion;
        };
        let session = ActiveSession {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            pid,
            process_group: spec.options.process_group,
        };
        if let Some(previous) = lock(&self.session).replace(session) {
            debug!("Session {} replaced; pid {} is no longer tracked", previous.id, previous.pid);
        }
        info!("Speaking with {} (pid {pid})", self.platform.name());

        if let (Some(payload), Some(stdin)) = (spec.stdin, child.stdin.take()) {
            tokio::spawn(feed_stdin(stdin, payload));
        }
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(watch_stderr(stderr, settle.clone())));

        let slot = self.session.clone();
        tokio::spawn(async move {
            let status = child.wait().await;
            if let Some(task) = stderr_task {
                let _ = tokio::time::timeout(STDERR_GRACE, task).await;
            }
            match status {
                Ok(status) => report_exit(status, pid, &slot, &settle),
                Err(e) => {
                    settle.settle(Err(SayError::Io(e)));
                }
            }
        });

        completion
    }
}

fn utterance(text: &str, voice: Option<&str>, speed: Option<f64>) -> Utterance {
    Utterance {
        text: text.to_string(),
        voice: voice.map(str::to_string),
        speed,
    }
}

/// Write the whole payload, then close stdin so the engine sees end of input.
async fn feed_stdin(mut stdin: ChildStdin, payload: String) {
    if let Err(e) = stdin.write_all(payload.as_bytes()).await {
        debug!("Engine stdin closed early: {e}");
    }
    drop(stdin);
}

/// Any stderr output is an engine failure. The process is left running;
/// the rest of the stream is drained so the engine never blocks on it.
async fn watch_stderr(mut stderr: ChildStderr, settle: Settle) {
    let mut buf = [0u8; 1024];
    let mut reported = false;
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if !reported {
                    reported = true;
                    let message = decode_ascii(&buf[..n]).trim().to_string();
                    warn!("Engine error: {message}");
                    settle.settle(Err(SayError::Engine(message)));
                }
            }
        }
    }
}

fn report_exit(status: ExitStatus, pid: u32, slot: &SessionSlot, settle: &Settle) {
    let code = status.code();
    let signal = exit_signal(&status);
    debug!("pid {pid} exited: code={code:?} signal={signal:?}");

    if code.is_none() || signal.is_some() {
        settle.settle(Err(SayError::AbnormalExit { code, signal }));
        return;
    }
    *lock(slot) = None;
    settle.settle(Ok(()));
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
