//! Linux `festival` for playback and `text2wave` for export.
//!
//! Festival reads a Scheme script on stdin. It plays audio through a helper
//! (`aplay`), so it runs in its own process group and control signals go to
//! the whole group.

use std::path::Path;

use super::{check_voice, signal_session, Control, Platform};
use crate::command::{extension_of, CommandSpec, Utterance};
use crate::error::{Result, SayError};
use crate::speaker::ActiveSession;

pub struct Festival {
    program: String,
    export_program: String,
}

impl Festival {
    pub const PROGRAM: &'static str = "festival";
    pub const EXPORT_PROGRAM: &'static str = "text2wave";

    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            export_program: Self::EXPORT_PROGRAM.to_string(),
        }
    }

    pub fn with_export_program(mut self, program: impl Into<String>) -> Self {
        self.export_program = program.into();
        self
    }

    fn voice(utterance: &Utterance) -> Result<Option<&str>> {
        utterance
            .voice_name()
            .map(|v| check_voice(v, false))
            .transpose()
    }
}

/// Escape text for a Scheme string literal.
fn scheme_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

impl Platform for Festival {
    fn name(&self) -> &'static str {
        "festival"
    }

    fn base_speed(&self) -> f64 {
        100.0
    }

    fn build_speak_command(&self, utterance: &Utterance) -> Result<CommandSpec> {
        let mut script = String::new();
        if let Some(voice) = Self::voice(utterance)? {
            script.push_str(&format!("(voice_{voice}) "));
        }
        if let Some(speed) = utterance.requested_speed() {
            let rate = self.convert_speed(speed);
            script.push_str(&format!(
                "(Parameter.set 'Audio_Method 'Audio_Command) \
                 (Parameter.set 'Audio_Command \"aplay -q -c 1 -t raw -f s16 -r $(($SR*{rate}/100)) $FILE\") "
            ));
        }
        script.push_str(&format!("(SayText {})", scheme_string(&utterance.text)));

        Ok(CommandSpec::new(&self.program)
            .arg("--pipe")
            .stdin(script)
            .process_group())
    }

    fn build_export_command(&self, utterance: &Utterance, filename: &Path) -> Result<CommandSpec> {
        let extension = extension_of(filename);
        let otype = match extension.as_str() {
            "wav" => "riff",
            "aiff" | "aif" => "aiff",
            "snd" => "snd",
            _ => {
                return Err(SayError::UnsupportedFormat {
                    engine: self.name(),
                    extension,
                })
            }
        };

        let mut spec = CommandSpec::new(&self.export_program)
            .arg("-o")
            .arg(filename.to_string_lossy())
            .args(["-otype", otype]);
        if let Some(voice) = Self::voice(utterance)? {
            spec = spec.arg("-eval").arg(format!("(voice_{voice})"));
        }
        if let Some(speed) = utterance.requested_speed() {
            let stretch = 100.0 / self.convert_speed(speed) as f64;
            spec = spec
                .arg("-eval")
                .arg(format!("(Parameter.set 'Duration_Stretch {stretch:.3})"));
        }
        Ok(spec.stdin(utterance.text.as_str()).process_group())
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
        Ok(CommandSpec::new(&self.program)
            .arg("--pipe")
            .stdin("(print (voice.list))"))
    }

    /// Output is a single Scheme list: `(kal_diphone rab_diphone)`.
    fn parse_voices(&self, stdout: &str) -> Vec<String> {
        let Some(start) = stdout.find('(') else {
            return Vec::new();
        };
        let rest = &stdout[start + 1..];
        let body = rest.find(')').map_or(rest, |end| &rest[..end]);
        body.split_whitespace().map(str::to_string).collect()
    }
}
