//! `espeak-ng`, the widely available Linux fallback.

use std::path::Path;

use super::{signal_session, Control, Platform};
use crate::command::{extension_of, CommandSpec, Utterance};
use crate::error::{Result, SayError};
use crate::speaker::ActiveSession;

pub struct EspeakNg {
    program: String,
}

impl EspeakNg {
    pub const PROGRAM: &'static str = "espeak-ng";

    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn base_command(&self, utterance: &Utterance) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.program);
        if let Some(voice) = utterance.voice_name() {
            spec = spec.arg("-v").arg(voice);
        }
        if let Some(speed) = utterance.requested_speed() {
            spec = spec.arg("-s").arg(self.convert_speed(speed).to_string());
        }
        spec
    }
}

impl Platform for EspeakNg {
    fn name(&self) -> &'static str {
        "espeak-ng"
    }

    fn base_speed(&self) -> f64 {
        175.0
    }

    fn build_speak_command(&self, utterance: &Utterance) -> Result<CommandSpec> {
        Ok(self
            .base_command(utterance)
            .arg("--stdin")
            .stdin(utterance.text.as_str()))
    }

    fn build_export_command(&self, utterance: &Utterance, filename: &Path) -> Result<CommandSpec> {
        let extension = extension_of(filename);
        if extension != "wav" {
            return Err(SayError::UnsupportedFormat {
                engine: self.name(),
                extension,
            });
        }
        Ok(self
            .base_command(utterance)
            .arg("-w")
            .arg(filename.to_string_lossy())
            .arg("--stdin")
            .stdin(utterance.text.as_str()))
    }

    fn run_stop_command(&self, session: &ActiveSession) -> Result<()> {
        signal_session(session, Control::Stop)
    }

    fn run_pause_command(&self, session: &ActiveSession) -> Result<()> {
        signal_session(session, Control::Pause)
    }

    fn run_resume_command(&self, session: &ActiveSession) -> Result<()> {
        signal_session(session, Control::Resume)
    }

    fn build_voices_command(&self) -> Result<CommandSpec> {
        Ok(CommandSpec::new(&self.program).arg("--voices"))
    }

    /// Table columns: `Pty Language Age/Gender VoiceName File Other Languages`.
    fn parse_voices(&self, stdout: &str) -> Vec<String> {
        stdout
            .lines()
            .skip(1)
            .filter_map(|line| line.split_whitespace().nth(3))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn espeak() -> EspeakNg {
        EspeakNg::new(EspeakNg::PROGRAM)
    }

    #[test]
    fn speak_reads_stdin() {
        let spec = espeak()
            .build_speak_command(&Utterance::new("hello").voice("en-us").speed(2.0))
            .unwrap();
        assert_eq!(spec.args, ["-v", "en-us", "-s", "350", "--stdin"]);
        assert_eq!(spec.stdin.as_deref(), Some("hello"));
    }

    #[test]
    fn export_wav_only() {
        let spec = espeak()
            .build_export_command(&Utterance::new("hello"), Path::new("out.wav"))
            .unwrap();
        assert_eq!(spec.args, ["-w", "out.wav", "--stdin"]);

        assert!(espeak()
            .build_export_command(&Utterance::new("hello"), Path::new("out.ogg"))
            .is_err());
    }

    #[test]
    fn voices_from_table() {
        let out = "Pty Language       Age/Gender VoiceName          File                 Other Languages\n \
                   5  af              --/M      Afrikaans          gmw/af\n \
                   5  en-us           --/M      English_(America)  gmw/en-US           (en 3)\n";
        assert_eq!(espeak().parse_voices(out), ["Afrikaans", "English_(America)"]);
    }
}
