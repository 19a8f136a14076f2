//! Requests and the process descriptors built from them.

use std::path::{Path, PathBuf};

/// One thing to say: the text plus optional voice and speed multiplier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<String>,
    /// Multiplier over the engine's normal rate (1.0 = normal).
    pub speed: Option<f64>,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            speed: None,
        }
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Voice with empty names treated as "engine default".
    pub fn voice_name(&self) -> Option<&str> {
        self.voice.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// The requested speed if it is usable, `None` when the engine default applies.
    pub fn requested_speed(&self) -> Option<f64> {
        self.speed.filter(|s| s.is_finite() && *s > 0.0)
    }
}

/// Resolve a raw speed to a multiplier. Missing, zero, negative and
/// non-finite values fall back to 1.0.
pub fn resolve_speed(speed: Option<f64>) -> f64 {
    speed.filter(|s| s.is_finite() && *s > 0.0).unwrap_or(1.0)
}

/// `ceil(base × speed)`, so fractional speeds never truncate toward zero.
pub fn scale_speed(base_speed: f64, speed: f64) -> i64 {
    (base_speed * speed).ceil() as i64
}

/// Process options that vary between engines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpawnOptions {
    pub current_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Start the engine in its own process group so control signals also
    /// reach any helper processes it launches.
    pub process_group: bool,
}

/// Everything needed to launch one engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Written to the child's stdin, which is then closed.
    pub stdin: Option<String>,
    pub options: SpawnOptions,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            options: SpawnOptions::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    pub fn process_group(mut self) -> Self {
        self.options.process_group = true;
        self
    }

    /// Build the tokio command. Stdout is discarded; stdin is piped only
    /// when there is a payload.
    pub(crate) fn to_command(&self) -> tokio::process::Command {
        use std::process::Stdio;

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.options.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.options.env {
            cmd.env(key, value);
        }
        #[cfg(unix)]
        {
            if self.options.process_group {
                cmd.process_group(0);
            }
        }
        cmd.stdin(if self.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());
        cmd
    }
}

/// Lowercased extension of an export path, empty when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Decode diagnostic output as single-byte text, stripping the high bit.
pub fn decode_ascii(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b & 0x7f)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_rounds_up() {
        assert_eq!(scale_speed(100.0, 1.0), 100);
        assert_eq!(scale_speed(100.0, 0.331), 34);
        assert_eq!(scale_speed(175.0, 0.5), 88);
        assert_eq!(scale_speed(100.0, 0.001), 1);
    }

    #[test]
    fn missing_or_zero_speed_is_normal() {
        assert_eq!(resolve_speed(None), 1.0);
        assert_eq!(resolve_speed(Some(0.0)), 1.0);
        assert_eq!(resolve_speed(Some(-2.0)), 1.0);
        assert_eq!(resolve_speed(Some(f64::NAN)), 1.0);
        assert_eq!(resolve_speed(Some(1.5)), 1.5);
        assert_eq!(scale_speed(100.0, resolve_speed(Some(0.0))), 100);
    }

    #[test]
    fn blank_voice_means_default() {
        assert_eq!(Utterance::new("hi").voice("  ").voice_name(), None);
        assert_eq!(Utterance::new("hi").voice("Alex").voice_name(), Some("Alex"));
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of(Path::new("/tmp/Out.WAV")), "wav");
        assert_eq!(extension_of(Path::new("noext")), "");
    }

    #[test]
    fn ascii_decoding_strips_high_bit() {
        assert_eq!(decode_ascii(b"oops\n"), "oops\n");
        assert_eq!(decode_ascii(&[0xC1]), "A");
    }
}
