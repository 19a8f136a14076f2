//! Per-engine command builders.
//!
//! Each engine turns an [`Utterance`] into a [`CommandSpec`] without touching
//! the system, and knows how to stop, pause and resume the process it
//! described. The [`Speaker`](crate::Speaker) holds exactly one of these,
//! picked when it is constructed.

mod espeak;
mod festival;
mod macos;
mod windows;

pub use espeak::EspeakNg;
pub use festival::Festival;
pub use macos::MacSay;
pub use windows::WindowsSapi;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::command::{scale_speed, CommandSpec, Utterance};
use crate::error::{Result, SayError};
use crate::speaker::ActiveSession;

/// Capability interface every engine implements.
pub trait Platform: Send + Sync {
    fn name(&self) -> &'static str;

    /// The engine's native value for "normal" speed.
    fn base_speed(&self) -> f64;

    /// Map a speed multiplier to the engine's native rate.
    fn convert_speed(&self, speed: f64) -> i64 {
        scale_speed(self.base_speed(), speed)
    }

    fn build_speak_command(&self, utterance: &Utterance) -> Result<CommandSpec>;

    fn build_export_command(&self, utterance: &Utterance, filename: &Path) -> Result<CommandSpec>;

    fn run_stop_command(&self, session: &ActiveSession) -> Result<()>;

    fn run_pause_command(&self, session: &ActiveSession) -> Result<()>;

    fn run_resume_command(&self, session: &ActiveSession) -> Result<()>;

    /// Command whose stdout lists the installed voices.
    fn build_voices_command(&self) -> Result<CommandSpec>;

    fn parse_voices(&self, stdout: &str) -> Vec<String>;
}

/// Supported engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Say,
    Festival,
    EspeakNg,
    Sapi,
}

impl Engine {
    /// The engine that ships with the current OS.
    pub fn native() -> Self {
        if cfg!(target_os = "macos") {
            Self::Say
        } else if cfg!(target_os = "windows") {
            Self::Sapi
        } else {
            Self::Festival
        }
    }

    /// Build the command builder, optionally replacing the default program.
    pub fn platform(self, program: Option<&str>) -> Box<dyn Platform> {
        let program = program.map(str::trim).filter(|p| !p.is_empty());
        match self {
            Self::Say => Box::new(MacSay::new(program.unwrap_or(MacSay::PROGRAM))),
            Self::Festival => Box::new(Festival::new(program.unwrap_or(Festival::PROGRAM))),
            Self::EspeakNg => Box::new(EspeakNg::new(program.unwrap_or(EspeakNg::PROGRAM))),
            Self::Sapi => Box::new(WindowsSapi::new(program.unwrap_or(WindowsSapi::PROGRAM))),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Say => write!(f, "say"),
            Self::Festival => write!(f, "festival"),
            Self::EspeakNg => write!(f, "espeak-ng"),
            Self::Sapi => write!(f, "sapi"),
        }
    }
}

impl FromStr for Engine {
    type Err = SayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "say" | "macos" | "darwin" => Ok(Self::Say),
            "festival" | "linux" => Ok(Self::Festival),
            "espeak-ng" | "espeak" => Ok(Self::EspeakNg),
            "sapi" | "windows" | "win32" => Ok(Self::Sapi),
            other => Err(SayError::Config(format!("unknown engine: {other}"))),
        }
    }
}

/// Voice names end up inside engine scripts, so only allow plain identifiers.
pub(crate) fn check_voice(voice: &str, allow_spaces: bool) -> Result<&str> {
    let ok = voice.chars().all(|c| {
        c.is_alphanumeric() || matches!(c, '_' | '-' | '.') || (allow_spaces && c == ' ')
    });
    if ok {
        Ok(voice)
    } else {
        Err(SayError::InvalidVoice(voice.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Control {
    Stop,
    Pause,
    Resume,
}

/// Signal the session's process (or its whole group). A process that has
/// already gone away is not an error.
#[cfg(unix)]
pub(crate) fn signal_session(session: &ActiveSession, control: Control) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let signal = match control {
        Control::Stop => Signal::SIGTERM,
        Control::Pause => Signal::SIGSTOP,
        Control::Resume => Signal::SIGCONT,
    };
    let Ok(raw) = i32::try_from(session.pid) else {
        return Ok(());
    };
    let pid = Pid::from_raw(raw);

    tracing::debug!("Sending {signal:?} to pid {} (group: {})", session.pid, session.process_group);
    let sent = if session.process_group {
        killpg(pid, signal)
    } else {
        kill(pid, signal)
    };
    match sent {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(SayError::Io(e.into())),
    }
}

#[cfg(not(unix))]
pub(crate) fn signal_session(_session: &ActiveSession, control: Control) -> Result<()> {
    Err(SayError::Unsupported {
        engine: "signals",
        operation: match control {
            Control::Stop => "stop",
            Control::Pause => "pause",
            Control::Resume => "resume",
        },
    })
}
